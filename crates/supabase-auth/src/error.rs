//! Supabase client errors.

use auth_context::AuthError;
use thiserror::Error;

/// Supabase client error type.
#[derive(Error, Debug)]
pub enum SupabaseError {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from GoTrue
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Success response with a payload that cannot be used
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Password grant rejected
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Session file I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Session file contents could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using SupabaseError.
pub type SupabaseResult<T> = Result<T, SupabaseError>;

impl From<SupabaseError> for AuthError {
    fn from(err: SupabaseError) -> Self {
        match err {
            SupabaseError::Http(e) if e.is_timeout() => AuthError::Timeout,
            SupabaseError::Http(e) if e.is_connect() => AuthError::NetworkUnavailable,
            SupabaseError::Api {
                status: 401 | 403,
                message,
            } => AuthError::SessionInvalid(message),
            SupabaseError::InvalidCredentials(message) => AuthError::InvalidCredentials(message),
            SupabaseError::Io(e) => AuthError::Storage(e.to_string()),
            SupabaseError::Json(e) => AuthError::Storage(e.to_string()),
            other => AuthError::backend(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_maps_to_session_invalid() {
        let err: AuthError = SupabaseError::Api {
            status: 401,
            message: "invalid JWT".to_string(),
        }
        .into();
        assert!(matches!(err, AuthError::SessionInvalid(ref m) if m == "invalid JWT"));
    }

    #[test]
    fn test_forbidden_maps_to_session_invalid() {
        let err: AuthError = SupabaseError::Api {
            status: 403,
            message: "session not found".to_string(),
        }
        .into();
        assert!(matches!(err, AuthError::SessionInvalid(_)));
    }

    #[test]
    fn test_server_error_maps_to_backend() {
        let err: AuthError = SupabaseError::Api {
            status: 500,
            message: "boom".to_string(),
        }
        .into();
        assert!(matches!(err, AuthError::Backend(_)));
        assert_eq!(err.to_string(), "Auth backend error: API error (500): boom");
    }

    #[test]
    fn test_invalid_response_maps_to_backend() {
        let err: AuthError = SupabaseError::InvalidResponse("expires_in out of range".to_string()).into();
        assert!(matches!(err, AuthError::Backend(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_invalid_credentials_maps_through() {
        let err: AuthError =
            SupabaseError::InvalidCredentials("Invalid login credentials".to_string()).into();
        assert!(matches!(err, AuthError::InvalidCredentials(_)));
    }

    #[test]
    fn test_file_errors_map_to_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: AuthError = SupabaseError::Io(io).into();
        assert!(matches!(err, AuthError::Storage(_)));

        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: AuthError = SupabaseError::Json(json).into();
        assert!(matches!(err, AuthError::Storage(_)));
    }
}
