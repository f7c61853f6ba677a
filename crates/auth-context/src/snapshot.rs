//! The auth snapshot handed to consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authenticated identity, shaped like a GoTrue user object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sign_in_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl User {
    /// A user with only an id set.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            phone: None,
            created_at: None,
            last_sign_in_at: None,
            user_metadata: serde_json::Value::Null,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Read-only view of the current auth state.
///
/// Produced by an [`AuthSource`](crate::AuthSource); consumers only read it.
/// The sign-out and refresh operations live on the
/// [`AuthHandle`](crate::AuthHandle) that carries the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSnapshot {
    /// Current identity, if signed in.
    pub user: Option<User>,
    /// An auth operation is in flight.
    pub is_loading: bool,
    /// The initial auth check has completed.
    pub is_auth_checked: bool,
}

impl AuthSnapshot {
    /// State before the initial check: no user, loading, not checked.
    pub fn initial() -> Self {
        Self {
            user: None,
            is_loading: true,
            is_auth_checked: false,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }
}

impl Default for AuthSnapshot {
    fn default() -> Self {
        Self::initial()
    }
}
