//! The collaborator contract behind a provider.

use crate::{AuthResult, AuthSnapshot};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

/// Channel end over which a source publishes snapshots.
pub type SnapshotReceiver = watch::Receiver<Arc<AuthSnapshot>>;

/// Producer of auth snapshots and owner of the auth operations.
///
/// The provider never inspects or changes what a source returns: snapshots
/// are read from [`snapshots`](AuthSource::snapshots) as published, and the
/// results of [`sign_out`](AuthSource::sign_out) and
/// [`refresh_user`](AuthSource::refresh_user) are handed back to callers
/// as-is.
#[async_trait]
pub trait AuthSource: Send + Sync + 'static {
    /// Subscribe to snapshot updates. The receiver starts at the latest value.
    fn snapshots(&self) -> SnapshotReceiver;

    /// Clear the current session.
    async fn sign_out(&self) -> AuthResult<()>;

    /// Re-fetch the current identity.
    async fn refresh_user(&self) -> AuthResult<()>;

    /// Called once when a provider mounts this source.
    fn mount(self: Arc<Self>) {}

    /// Called once when the provider unmounts.
    fn unmount(&self) {}
}
