//! Provider and accessor.
//!
//! A provider mounts one [`AuthSource`] and hands its snapshots out in two
//! ways:
//!
//! - explicitly: [`AuthProvider::handle`] returns an [`AuthHandle`] that can
//!   be passed to whatever needs auth state;
//! - ambiently: code running inside [`AuthProvider::scope`] or
//!   [`AuthProvider::sync_scope`] reads the innermost provider with
//!   [`use_auth_context`].
//!
//! Tasks spawned from inside a scope do not inherit it; hand them a handle.

use crate::error::MISSING_PROVIDER_MESSAGE;
use crate::{AuthError, AuthHandle, AuthResult, AuthSource};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

tokio::task_local! {
    static CURRENT_AUTH: AuthHandle;
}

/// Owner of one mounted auth source.
///
/// The snapshot it provides lives exactly as long as the mount: created in
/// [`mount`](AuthProvider::mount), discarded on [`unmount`](AuthProvider::unmount)
/// or drop.
pub struct AuthProvider {
    handle: AuthHandle,
    source: Arc<dyn AuthSource>,
    mounted: watch::Sender<bool>,
}

impl AuthProvider {
    /// Mount `source` and start providing its snapshots.
    ///
    /// Sources that spawn background work expect to be mounted from within a
    /// tokio runtime.
    pub fn mount(source: Arc<dyn AuthSource>) -> Self {
        let snapshots = source.snapshots();
        let (mounted, mounted_rx) = watch::channel(true);
        let handle = AuthHandle::new(Arc::clone(&source), snapshots, mounted_rx);
        Arc::clone(&source).mount();
        debug!("Auth provider mounted");

        Self {
            handle,
            source,
            mounted,
        }
    }

    /// Handle for explicit injection into dependent code.
    pub fn handle(&self) -> AuthHandle {
        self.handle.clone()
    }

    /// Run `fut` with this provider as the ambient auth context.
    pub fn scope<F>(&self, fut: F) -> impl Future<Output = F::Output>
    where
        F: Future,
    {
        CURRENT_AUTH.scope(self.handle(), fut)
    }

    /// Run `f` with this provider as the ambient auth context.
    pub fn sync_scope<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        CURRENT_AUTH.sync_scope(self.handle(), f)
    }

    /// Stop the source. Snapshots stop updating afterwards, and pending
    /// waits on handles fail with [`AuthError::Unmounted`].
    pub fn unmount(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.mounted.send_replace(false) {
            self.source.unmount();
            debug!("Auth provider unmounted");
        }
    }
}

impl Drop for AuthProvider {
    fn drop(&mut self) {
        self.release();
    }
}

/// Handle of the innermost enclosing provider scope.
///
/// Fails with [`AuthError::MissingProvider`] outside any scope; it never
/// falls back to an empty snapshot.
pub fn use_auth_context() -> AuthResult<AuthHandle> {
    CURRENT_AUTH
        .try_with(AuthHandle::clone)
        .map_err(|_| AuthError::MissingProvider)
}

/// Like [`use_auth_context`] but panics outside a provider scope.
///
/// # Panics
///
/// Panics with the missing-provider message when no provider scope is active.
pub fn expect_auth_context() -> AuthHandle {
    match use_auth_context() {
        Ok(handle) => handle,
        Err(_) => panic!("{}", MISSING_PROVIDER_MESSAGE),
    }
}
