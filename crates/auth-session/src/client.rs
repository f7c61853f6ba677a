//! The backend seam used by [`SessionAuthSource`](crate::SessionAuthSource).

use crate::{AuthStateChange, Session};
use async_trait::async_trait;
use auth_context::{AuthResult, User};
use tokio::sync::broadcast;

/// Auth backend operations the session source depends on.
#[async_trait]
pub trait AuthClient: Send + Sync + 'static {
    /// Current session, if any. Implementations may refresh an expired
    /// session before returning it.
    async fn get_session(&self) -> AuthResult<Option<Session>>;

    /// Fetch the current user from the backend.
    async fn get_user(&self) -> AuthResult<Option<User>>;

    /// End the current session.
    async fn sign_out(&self) -> AuthResult<()>;

    /// Subscribe to auth-state changes from this point on.
    fn on_auth_state_change(&self) -> broadcast::Receiver<AuthStateChange>;
}
