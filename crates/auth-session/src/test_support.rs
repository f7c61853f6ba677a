//! Scriptable auth client for unit tests.

use crate::{AuthChangeEvent, AuthClient, AuthStateChange, Session, SignInRedirect};
use async_trait::async_trait;
use auth_context::{AuthResult, User};
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Notify};

pub(crate) fn session_for(user_id: &str) -> Session {
    Session {
        access_token: format!("access-{}", user_id),
        refresh_token: format!("refresh-{}", user_id),
        token_type: "bearer".to_string(),
        expires_at: Utc::now() + Duration::hours(1),
        user: User::new(user_id),
    }
}

/// Redirect callback that records every route it was called with.
pub(crate) fn recording_redirect() -> (SignInRedirect, Arc<Mutex<Vec<String>>>) {
    let routes = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&routes);
    let redirect: SignInRedirect = Box::new(move |route: &str| {
        recorded.lock().push(route.to_string());
    });
    (redirect, routes)
}

pub(crate) struct FakeClient {
    changes: broadcast::Sender<AuthStateChange>,
    session: Mutex<Option<AuthResult<Option<Session>>>>,
    user: Mutex<Option<AuthResult<Option<User>>>>,
    sign_out_result: Mutex<Option<AuthResult<()>>>,
    hold_session: AtomicBool,
    session_gate: Notify,
    hold_sign_out: AtomicBool,
    sign_out_gate: Notify,
    pub sign_out_calls: AtomicUsize,
    pub get_user_calls: AtomicUsize,
}

impl FakeClient {
    pub fn new() -> Arc<Self> {
        let (changes, _) = broadcast::channel(16);
        Arc::new(Self {
            changes,
            session: Mutex::new(None),
            user: Mutex::new(None),
            sign_out_result: Mutex::new(None),
            hold_session: AtomicBool::new(false),
            session_gate: Notify::new(),
            hold_sign_out: AtomicBool::new(false),
            sign_out_gate: Notify::new(),
            sign_out_calls: AtomicUsize::new(0),
            get_user_calls: AtomicUsize::new(0),
        })
    }

    pub fn with_session(session: Session) -> Arc<Self> {
        let client = Self::new();
        client.script_session(Ok(Some(session)));
        client
    }

    pub fn script_session(&self, result: AuthResult<Option<Session>>) {
        *self.session.lock() = Some(result);
    }

    pub fn script_user(&self, result: AuthResult<Option<User>>) {
        *self.user.lock() = Some(result);
    }

    pub fn script_sign_out(&self, result: AuthResult<()>) {
        *self.sign_out_result.lock() = Some(result);
    }

    /// Make `get_session` wait until [`release_session`](Self::release_session).
    pub fn hold_session(&self) {
        self.hold_session.store(true, Ordering::SeqCst);
    }

    pub fn release_session(&self) {
        self.session_gate.notify_one();
    }

    /// Make `sign_out` wait until [`release_sign_out`](Self::release_sign_out).
    pub fn hold_sign_out(&self) {
        self.hold_sign_out.store(true, Ordering::SeqCst);
    }

    pub fn release_sign_out(&self) {
        self.sign_out_gate.notify_one();
    }

    pub fn emit(&self, event: AuthChangeEvent, session: Option<Session>) {
        let _ = self.changes.send(AuthStateChange::new(event, session));
    }
}

#[async_trait]
impl AuthClient for FakeClient {
    async fn get_session(&self) -> AuthResult<Option<Session>> {
        if self.hold_session.load(Ordering::SeqCst) {
            self.session_gate.notified().await;
        }
        self.session.lock().take().unwrap_or(Ok(None))
    }

    async fn get_user(&self) -> AuthResult<Option<User>> {
        self.get_user_calls.fetch_add(1, Ordering::SeqCst);
        self.user.lock().take().unwrap_or(Ok(None))
    }

    async fn sign_out(&self) -> AuthResult<()> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if self.hold_sign_out.load(Ordering::SeqCst) {
            self.sign_out_gate.notified().await;
        }
        let result = self.sign_out_result.lock().take().unwrap_or(Ok(()));
        if result.is_ok() {
            self.emit(AuthChangeEvent::SignedOut, None);
        }
        result
    }

    fn on_auth_state_change(&self) -> broadcast::Receiver<AuthStateChange> {
        self.changes.subscribe()
    }
}
