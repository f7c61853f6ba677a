//! Command implementations.
//!
//! Every command except `login` runs inside the provider scope and reads
//! auth state through the accessor.

use crate::output::{self, OutputFormat};
use auth_context::{use_auth_context, AuthError, AuthHandle, AuthSnapshot};
use serde::Serialize;
use std::fmt;
use supabase_auth::SupabaseAuthClient;
use tracing::{debug, info};

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Auth state as printed by `status` and `watch`.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub signed_in: bool,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub is_loading: bool,
    pub is_auth_checked: bool,
}

impl From<&AuthSnapshot> for StatusReport {
    fn from(snapshot: &AuthSnapshot) -> Self {
        Self {
            signed_in: snapshot.is_authenticated(),
            user_id: snapshot.user.as_ref().map(|u| u.id.clone()),
            email: snapshot.user.as_ref().and_then(|u| u.email.clone()),
            is_loading: snapshot.is_loading,
            is_auth_checked: snapshot.is_auth_checked,
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.signed_in {
            "signed in"
        } else {
            "signed out"
        };
        writeln!(f, "{}", output::row("Status", state))?;
        if let Some(user_id) = &self.user_id {
            writeln!(f, "{}", output::row("User", user_id))?;
        }
        if let Some(email) = &self.email {
            writeln!(f, "{}", output::row("Email", email))?;
        }
        writeln!(f, "{}", output::row("Loading", &self.is_loading.to_string()))?;
        write!(
            f,
            "{}",
            output::row("Checked", &self.is_auth_checked.to_string())
        )
    }
}

/// Wait for the initial check of the ambient provider.
async fn checked_context() -> Result<(AuthHandle, std::sync::Arc<AuthSnapshot>), AuthError> {
    let auth = use_auth_context()?;
    let snapshot = auth.wait_until_checked().await?;
    Ok((auth, snapshot))
}

pub async fn status(format: &OutputFormat) -> CommandResult {
    let (_auth, snapshot) = checked_context().await?;
    output::print(&StatusReport::from(snapshot.as_ref()), format);
    Ok(())
}

/// Sign in directly against the client. The provider picks the new session
/// up on its initial check.
pub async fn login(
    client: &SupabaseAuthClient,
    email: &str,
    password: &str,
    format: &OutputFormat,
) -> CommandResult {
    let session = client.sign_in_with_password(email, password).await?;
    let display = session.user.email.as_deref().unwrap_or(&session.user.id);
    output::print_success(&format!("Signed in as {}", display), format);
    Ok(())
}

pub async fn refresh(format: &OutputFormat) -> CommandResult {
    let (auth, snapshot) = checked_context().await?;
    if !snapshot.is_authenticated() {
        return Err(AuthError::NotLoggedIn.into());
    }

    auth.refresh_user().await?;
    output::print(&StatusReport::from(auth.snapshot().as_ref()), format);
    Ok(())
}

pub async fn sign_out(format: &OutputFormat) -> CommandResult {
    let (auth, snapshot) = checked_context().await?;
    if !snapshot.is_authenticated() {
        output::print_success("Already signed out", format);
        return Ok(());
    }

    auth.sign_out().await?;
    output::print_success("Signed out", format);
    Ok(())
}

/// Print the current state, then every change until interrupted.
pub async fn watch(format: &OutputFormat) -> CommandResult {
    let auth = use_auth_context()?;
    let mut changes = auth.subscribe();
    output::print(&StatusReport::from(changes.latest().as_ref()), format);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Watch interrupted");
                break;
            }
            change = changes.changed() => match change {
                Ok(snapshot) => {
                    debug!(user_id = ?snapshot.user_id(), "Auth snapshot changed");
                    output::print(&StatusReport::from(snapshot.as_ref()), format);
                }
                Err(AuthError::Unmounted) => break,
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}
