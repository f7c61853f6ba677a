//! Scriptable auth source for unit tests.

use crate::{AuthResult, AuthSnapshot, AuthSource, SnapshotReceiver};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;

pub(crate) struct FakeSource {
    tx: watch::Sender<Arc<AuthSnapshot>>,
    next_sign_out: Mutex<Option<AuthResult<()>>>,
    next_refresh: Mutex<Option<AuthResult<()>>>,
    pub sign_out_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub mounts: AtomicUsize,
    pub unmounts: AtomicUsize,
}

impl FakeSource {
    pub fn new(snapshot: AuthSnapshot) -> Arc<Self> {
        let (tx, _) = watch::channel(Arc::new(snapshot));
        Arc::new(Self {
            tx,
            next_sign_out: Mutex::new(None),
            next_refresh: Mutex::new(None),
            sign_out_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            mounts: AtomicUsize::new(0),
            unmounts: AtomicUsize::new(0),
        })
    }

    /// Publish a snapshot and return the exact `Arc` readers will see.
    pub fn publish(&self, snapshot: AuthSnapshot) -> Arc<AuthSnapshot> {
        let snapshot = Arc::new(snapshot);
        self.tx.send_replace(Arc::clone(&snapshot));
        snapshot
    }

    pub fn current(&self) -> Arc<AuthSnapshot> {
        self.tx.borrow().clone()
    }

    pub fn script_sign_out(&self, result: AuthResult<()>) {
        *self.next_sign_out.lock() = Some(result);
    }

    pub fn script_refresh(&self, result: AuthResult<()>) {
        *self.next_refresh.lock() = Some(result);
    }
}

#[async_trait]
impl AuthSource for FakeSource {
    fn snapshots(&self) -> SnapshotReceiver {
        self.tx.subscribe()
    }

    async fn sign_out(&self) -> AuthResult<()> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.next_sign_out.lock().take();
        scripted.unwrap_or(Ok(()))
    }

    async fn refresh_user(&self) -> AuthResult<()> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.next_refresh.lock().take();
        scripted.unwrap_or(Ok(()))
    }

    fn mount(self: Arc<Self>) {
        self.mounts.fetch_add(1, Ordering::SeqCst);
    }

    fn unmount(&self) {
        self.unmounts.fetch_add(1, Ordering::SeqCst);
    }
}
