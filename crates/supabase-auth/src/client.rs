//! GoTrue REST client.

use crate::{RefreshConfig, SessionStore, SupabaseError, SupabaseResult};
use async_trait::async_trait;
use auth_context::{AuthError, AuthResult, User};
use auth_session::{AuthChangeEvent, AuthClient, AuthStateChange, Session};
use chrono::{DateTime, Utc};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CHANGE_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

/// GoTrue token response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    expires_in: i64,
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl TokenResponse {
    fn into_session(self) -> SupabaseResult<Session> {
        let expires_at = match self
            .expires_at
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        {
            Some(at) => at,
            None => chrono::Duration::try_seconds(self.expires_in)
                .and_then(|ttl| Utc::now().checked_add_signed(ttl))
                .ok_or_else(|| {
                    SupabaseError::InvalidResponse(format!(
                        "expires_in out of range: {}",
                        self.expires_in
                    ))
                })?,
        };

        Ok(Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type,
            expires_at,
            user: self.user,
        })
    }
}

/// GoTrue error payloads come in a few shapes depending on the endpoint.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

/// Turn a non-success response into [`SupabaseError::Api`].
async fn check_response(response: Response) -> SupabaseResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let parsed: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
    let message = parsed
        .error_description
        .or(parsed.msg)
        .or(parsed.message)
        .or(parsed.error)
        .unwrap_or(body);

    warn!(status = %status, message = %message, "GoTrue request failed");
    Err(SupabaseError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Supabase auth client backed by a [`SessionStore`].
///
/// Expired sessions are refreshed on read, retrying transient failures with
/// [`RefreshConfig`] backoff. A refresh token the server rejects clears the
/// stored session.
pub struct SupabaseAuthClient {
    http_client: Client,
    supabase_url: String,
    supabase_publishable_key: String,
    store: Arc<dyn SessionStore>,
    refresh_config: RefreshConfig,
    refresh_margin: chrono::Duration,
    changes: broadcast::Sender<AuthStateChange>,
}

impl SupabaseAuthClient {
    pub fn new(
        supabase_url: &str,
        supabase_publishable_key: &str,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        Self {
            http_client,
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_publishable_key: supabase_publishable_key.to_string(),
            store,
            refresh_config: RefreshConfig::default(),
            refresh_margin: chrono::Duration::seconds(30),
            changes,
        }
    }

    pub fn with_refresh_config(mut self, refresh_config: RefreshConfig) -> Self {
        self.refresh_config = refresh_config;
        self
    }

    /// Refresh sessions that expire within `margin`, not only expired ones.
    pub fn with_refresh_margin(mut self, margin: chrono::Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    pub fn supabase_url(&self) -> &str {
        &self.supabase_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.supabase_url, path)
    }

    fn emit(&self, event: AuthChangeEvent, session: Option<Session>) {
        if self
            .changes
            .send(AuthStateChange::new(event, session))
            .is_err()
        {
            debug!(event = ?event, "No auth state listeners");
        }
    }

    /// Sign in with email and password, store the session and emit
    /// `SIGNED_IN`.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> AuthResult<Session> {
        info!("Signing in with password");

        let session = self
            .request_token("password", &PasswordGrant { email, password })
            .await
            .map_err(|e| match e {
                SupabaseError::Api {
                    status: 400,
                    message,
                } => SupabaseError::InvalidCredentials(message),
                other => other,
            })?;

        self.store.save(&session)?;
        info!(user_id = %session.user.id, "Signed in");
        self.emit(AuthChangeEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    /// Refresh the stored session now, whether or not it has expired.
    pub async fn refresh_session(&self) -> AuthResult<Session> {
        let session = self.store.load()?.ok_or(AuthError::NotLoggedIn)?;
        self.refresh_with_backoff(&session.refresh_token).await
    }

    /// Stored session without contacting the server.
    pub fn stored_session(&self) -> AuthResult<Option<Session>> {
        Ok(self.store.load()?)
    }

    async fn request_token<B: Serialize + ?Sized>(
        &self,
        grant_type: &str,
        body: &B,
    ) -> SupabaseResult<Session> {
        let url = self.endpoint(&format!("token?grant_type={}", grant_type));
        debug!(url = %url, "Requesting token");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.supabase_publishable_key)
            .json(body)
            .send()
            .await?;

        let data: TokenResponse = check_response(response).await?.json().await?;
        data.into_session()
    }

    async fn fetch_user(&self, access_token: &str) -> SupabaseResult<User> {
        let url = self.endpoint("user");
        debug!(url = %url, "Fetching user");

        let response = self
            .http_client
            .get(&url)
            .header("apikey", &self.supabase_publishable_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        Ok(check_response(response).await?.json().await?)
    }

    async fn revoke(&self, access_token: &str) -> SupabaseResult<()> {
        let response = self
            .http_client
            .post(self.endpoint("logout"))
            .header("apikey", &self.supabase_publishable_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        check_response(response).await?;
        Ok(())
    }

    /// Refresh with exponential backoff on transient errors.
    ///
    /// A rejected refresh token clears the stored session, emits
    /// `SIGNED_OUT` and fails with [`AuthError::SessionExpired`]. Exhausted
    /// retries keep the stored session.
    async fn refresh_with_backoff(&self, refresh_token: &str) -> AuthResult<Session> {
        let max_retries = self.refresh_config.attempts();

        for attempt in 0..max_retries {
            let result = self
                .request_token("refresh_token", &RefreshGrant { refresh_token })
                .await
                .map_err(AuthError::from);

            match result {
                Ok(session) => {
                    self.store.save(&session)?;
                    info!(user_id = %session.user.id, "Token refreshed successfully");
                    self.emit(AuthChangeEvent::TokenRefreshed, Some(session.clone()));
                    return Ok(session);
                }
                Err(e) if e.is_transient() => {
                    if attempt + 1 < max_retries {
                        let delay = self.refresh_config.delay_for_attempt(attempt);
                        debug!(
                            attempt = attempt + 1,
                            max_retries,
                            delay_ms = delay.as_millis() as u64,
                            "Refresh failed with transient error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Refresh failed with non-transient error");
                    self.store.clear()?;
                    self.emit(AuthChangeEvent::SignedOut, None);
                    return Err(AuthError::SessionExpired);
                }
            }
        }

        warn!(max_retries, "Refresh failed after all attempts");
        Err(AuthError::RefreshExhausted(max_retries))
    }
}

#[async_trait]
impl AuthClient for SupabaseAuthClient {
    async fn get_session(&self) -> AuthResult<Option<Session>> {
        let Some(session) = self.store.load()? else {
            return Ok(None);
        };

        if !session.expires_within(self.refresh_margin) {
            return Ok(Some(session));
        }

        info!(user_id = %session.user.id, "Session expired, attempting refresh");
        self.refresh_with_backoff(&session.refresh_token)
            .await
            .map(Some)
    }

    async fn get_user(&self) -> AuthResult<Option<User>> {
        let Some(mut session) = self.get_session().await? else {
            return Ok(None);
        };

        let user = self.fetch_user(&session.access_token).await?;
        debug!(user_id = %user.id, "User fetched");

        if session.user != user {
            session.user = user.clone();
            self.store.save(&session)?;
        }
        Ok(Some(user))
    }

    async fn sign_out(&self) -> AuthResult<()> {
        if let Some(session) = self.store.load()? {
            if let Err(e) = self.revoke(&session.access_token).await {
                warn!(error = %e, "Server sign-out failed, clearing local session anyway");
            }
        }

        self.store.clear()?;
        info!("Local session cleared");
        self.emit(AuthChangeEvent::SignedOut, None);
        Ok(())
    }

    fn on_auth_state_change(&self) -> broadcast::Receiver<AuthStateChange> {
        self.changes.subscribe()
    }
}
