//! Authentication error types.

use thiserror::Error;

/// Message carried by [`AuthError::MissingProvider`].
pub const MISSING_PROVIDER_MESSAGE: &str =
    "use_auth_context must be used within an AuthProvider scope";

/// Authentication error type.
///
/// Shared by the context layer and every auth source, so that results of
/// sign-out and refresh travel from the source to the caller unchanged.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The accessor ran outside any provider scope (integration error)
    #[error("{}", MISSING_PROVIDER_MESSAGE)]
    MissingProvider,

    /// Invalid email or password
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Token refresh error
    #[error("Token refresh failed: {0}")]
    TokenRefresh(String),

    /// Refresh retries exhausted
    #[error("Token refresh failed after {0} attempts")]
    RefreshExhausted(u32),

    /// Session not found
    #[error("Not logged in")]
    NotLoggedIn,

    /// Session expired and refresh failed
    #[error("Session expired")]
    SessionExpired,

    /// Session was invalidated server-side (revoked, logged out elsewhere, etc.)
    #[error("Session invalid: {0}")]
    SessionInvalid(String),

    /// Invalid state transition in an auth source lifecycle
    #[error("Invalid auth state transition: {0}")]
    InvalidStateTransition(String),

    /// The source has not been mounted by a provider yet
    #[error("Auth source is not mounted")]
    NotMounted,

    /// The provider owning the source was unmounted
    #[error("Auth provider was unmounted")]
    Unmounted,

    /// Session storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Network unavailable (transient error, can retry)
    #[error("Network unavailable")]
    NetworkUnavailable,

    /// Any other failure reported by the auth backend
    #[error("Auth backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AuthError {
    /// Wrap an arbitrary backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        AuthError::Backend(Box::new(err))
    }

    /// Returns true if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::NetworkUnavailable | AuthError::Timeout)
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
