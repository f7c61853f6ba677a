//! Consumer-side access to a mounted provider.

use crate::source::SnapshotReceiver;
use crate::{AuthError, AuthResult, AuthSnapshot, AuthSource, User};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Handle to the auth state of one mounted provider.
///
/// Obtained from [`AuthProvider::handle`](crate::AuthProvider::handle) or
/// [`use_auth_context`](crate::use_auth_context). Cloning is cheap and every
/// clone reads the same snapshot stream.
#[derive(Clone)]
pub struct AuthHandle {
    source: Arc<dyn AuthSource>,
    snapshots: SnapshotReceiver,
    mounted: watch::Receiver<bool>,
}

impl AuthHandle {
    pub(crate) fn new(
        source: Arc<dyn AuthSource>,
        snapshots: SnapshotReceiver,
        mounted: watch::Receiver<bool>,
    ) -> Self {
        Self {
            source,
            snapshots,
            mounted,
        }
    }

    /// Whether the provider behind this handle is still mounted.
    pub fn is_mounted(&self) -> bool {
        *self.mounted.borrow()
    }

    /// Latest snapshot published by the source.
    ///
    /// Reads between two publishes return the same `Arc`.
    pub fn snapshot(&self) -> Arc<AuthSnapshot> {
        self.snapshots.borrow().clone()
    }

    /// Current user, if signed in.
    pub fn user(&self) -> Option<User> {
        self.snapshots.borrow().user.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.snapshots.borrow().is_loading
    }

    pub fn is_auth_checked(&self) -> bool {
        self.snapshots.borrow().is_auth_checked
    }

    /// Sign out through the source. The source's result is returned unchanged.
    pub async fn sign_out(&self) -> AuthResult<()> {
        self.source.sign_out().await
    }

    /// Re-fetch the user through the source. The source's result is returned
    /// unchanged.
    pub async fn refresh_user(&self) -> AuthResult<()> {
        self.source.refresh_user().await
    }

    /// Subscribe to snapshot changes from this point on.
    pub fn subscribe(&self) -> AuthSubscription {
        let mut snapshots = self.snapshots.clone();
        snapshots.mark_unchanged();
        AuthSubscription {
            snapshots,
            mounted: self.mounted.clone(),
        }
    }

    /// Wait until the initial auth check has completed.
    ///
    /// An already checked snapshot is returned even after unmount. Otherwise
    /// returns [`AuthError::Unmounted`] once the provider unmounts or the
    /// source goes away.
    pub async fn wait_until_checked(&self) -> AuthResult<Arc<AuthSnapshot>> {
        let mut snapshots = self.snapshots.clone();
        let mut mounted = self.mounted.clone();
        tokio::select! {
            biased;
            checked = snapshots.wait_for(|s| s.is_auth_checked) => {
                let snapshot = checked.map_err(|_| AuthError::Unmounted)?;
                Ok(snapshot.clone())
            }
            _ = mounted.wait_for(|m| !*m) => Err(AuthError::Unmounted),
        }
    }
}

impl fmt::Debug for AuthHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthHandle")
            .field("snapshot", &*self.snapshots.borrow())
            .finish_non_exhaustive()
    }
}

/// Stream of snapshot changes.
#[derive(Debug)]
pub struct AuthSubscription {
    snapshots: SnapshotReceiver,
    mounted: watch::Receiver<bool>,
}

impl AuthSubscription {
    /// Wait for the next published change and return the new snapshot.
    ///
    /// Intermediate values published between two calls are coalesced; the
    /// latest one is returned. Fails with [`AuthError::Unmounted`] once the
    /// provider unmounts or the source drops its sender.
    pub async fn changed(&mut self) -> AuthResult<Arc<AuthSnapshot>> {
        if !*self.mounted.borrow() {
            return Err(AuthError::Unmounted);
        }
        tokio::select! {
            changed = self.snapshots.changed() => {
                changed.map_err(|_| AuthError::Unmounted)?;
                Ok(self.snapshots.borrow_and_update().clone())
            }
            _ = self.mounted.wait_for(|m| !*m) => Err(AuthError::Unmounted),
        }
    }

    /// Latest snapshot, without waiting.
    pub fn latest(&self) -> Arc<AuthSnapshot> {
        self.snapshots.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeSource;
    use crate::AuthProvider;
    use std::time::Duration;

    fn checked_as(user_id: Option<&str>) -> AuthSnapshot {
        AuthSnapshot {
            user: user_id.map(User::new),
            is_loading: false,
            is_auth_checked: true,
        }
    }

    #[tokio::test]
    async fn test_field_shortcuts() {
        let source = FakeSource::new(AuthSnapshot::initial());
        let provider = AuthProvider::mount(source.clone());
        let handle = provider.handle();

        assert!(handle.user().is_none());
        assert!(handle.is_loading());
        assert!(!handle.is_auth_checked());

        source.publish(checked_as(Some("u1")));

        assert_eq!(handle.user().map(|u| u.id), Some("u1".to_string()));
        assert!(!handle.is_loading());
        assert!(handle.is_auth_checked());
    }

    #[tokio::test]
    async fn test_subscription_receives_latest_change() {
        let source = FakeSource::new(AuthSnapshot::initial());
        let provider = AuthProvider::mount(source.clone());
        let mut subscription = provider.handle().subscribe();

        source.publish(checked_as(None));
        let published = source.publish(checked_as(Some("u1")));

        let changed = tokio::time::timeout(Duration::from_secs(1), subscription.changed())
            .await
            .expect("change should arrive")
            .unwrap();

        assert!(Arc::ptr_eq(&changed, &published));
        assert!(Arc::ptr_eq(&subscription.latest(), &published));
    }

    #[tokio::test]
    async fn test_subscription_does_not_replay_current_value() {
        let source = FakeSource::new(checked_as(Some("u1")));
        let provider = AuthProvider::mount(source);
        let mut subscription = provider.handle().subscribe();

        let waited =
            tokio::time::timeout(Duration::from_millis(50), subscription.changed()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_subscription_ends_when_source_is_gone() {
        let source = FakeSource::new(AuthSnapshot::initial());
        let provider = AuthProvider::mount(source.clone());
        let mut subscription = provider.handle().subscribe();

        drop(provider);
        drop(source);

        assert!(matches!(
            subscription.changed().await,
            Err(AuthError::Unmounted)
        ));
    }

    #[tokio::test]
    async fn test_subscription_ends_on_unmount_while_handle_lives() {
        let source = FakeSource::new(AuthSnapshot::initial());
        let provider = AuthProvider::mount(source.clone());
        let handle = provider.handle();
        let mut subscription = handle.subscribe();

        let waiter = tokio::spawn(async move { subscription.changed().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        provider.unmount();

        let result = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("subscription should end")
            .unwrap();
        assert!(matches!(result, Err(AuthError::Unmounted)));
        assert!(matches!(
            handle.subscribe().changed().await,
            Err(AuthError::Unmounted)
        ));
    }

    #[tokio::test]
    async fn test_wait_until_checked_fails_after_unmount() {
        let source = FakeSource::new(AuthSnapshot::initial());
        let provider = AuthProvider::mount(source.clone());
        let handle = provider.handle();

        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.wait_until_checked().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        provider.unmount();

        let result = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("wait should end on unmount")
            .unwrap();
        assert!(matches!(result, Err(AuthError::Unmounted)));

        let again = tokio::time::timeout(Duration::from_secs(1), handle.wait_until_checked())
            .await
            .expect("wait should fail at once");
        assert!(matches!(again, Err(AuthError::Unmounted)));
    }

    #[tokio::test]
    async fn test_wait_until_checked_keeps_checked_snapshot_after_unmount() {
        let source = FakeSource::new(checked_as(Some("u1")));
        let provider = AuthProvider::mount(source.clone());
        let handle = provider.handle();
        provider.unmount();

        let snapshot = handle.wait_until_checked().await.unwrap();
        assert_eq!(snapshot.user_id(), Some("u1"));
    }

    #[tokio::test]
    async fn test_wait_until_checked() {
        let source = FakeSource::new(AuthSnapshot::initial());
        let provider = AuthProvider::mount(source.clone());
        let handle = provider.handle();

        let publisher = {
            let source = source.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                source.publish(checked_as(Some("u9")))
            })
        };

        let snapshot = tokio::time::timeout(Duration::from_secs(1), handle.wait_until_checked())
            .await
            .expect("check should complete")
            .unwrap();
        let published = publisher.await.unwrap();

        assert!(Arc::ptr_eq(&snapshot, &published));
        assert_eq!(snapshot.user_id(), Some("u9"));
    }

    #[tokio::test]
    async fn test_handle_debug_shows_snapshot() {
        let source = FakeSource::new(checked_as(Some("u1")));
        let provider = AuthProvider::mount(source);

        let rendered = format!("{:?}", provider.handle());
        assert!(rendered.contains("AuthHandle"));
        assert!(rendered.contains("u1"));
    }
}
