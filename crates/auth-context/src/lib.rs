//! Auth context for authctx consumers.
//!
//! This crate provides:
//! - [`AuthSnapshot`]: current user plus loading/checked flags
//! - [`AuthSource`]: the contract an auth backend implements
//! - [`AuthProvider`]: mounts one source and provides its snapshots
//! - [`AuthHandle`] / [`use_auth_context`]: read the snapshot, sign out,
//!   refresh, subscribe to changes
//!
//! The context layer only passes things through. Session handling, token
//! refresh and storage belong to the source.

mod error;
mod handle;
mod provider;
mod snapshot;
mod source;

#[cfg(test)]
mod test_support;

pub use error::{AuthError, AuthResult, MISSING_PROVIDER_MESSAGE};
pub use handle::{AuthHandle, AuthSubscription};
pub use provider::{expect_auth_context, use_auth_context, AuthProvider};
pub use snapshot::{AuthSnapshot, User};
pub use source::{AuthSource, SnapshotReceiver};
