//! [`AuthSource`] implementation backed by an [`AuthClient`].

use crate::lifecycle::{LifecycleInput, LifecycleMachine, SourceState};
use crate::{AuthChangeEvent, AuthClient, AuthStateChange};
use async_trait::async_trait;
use auth_context::{AuthError, AuthResult, AuthSnapshot, AuthSource, SnapshotReceiver, User};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Callback invoked with the sign-in route when the user has to sign in.
pub type SignInRedirect = Box<dyn Fn(&str) + Send + Sync>;

struct Inner {
    machine: LifecycleMachine,
    user: Option<User>,
    auth_checked: bool,
    /// Set when the user was replaced while the initial check was running.
    user_settled: bool,
}

impl Inner {
    fn state(&self) -> SourceState {
        SourceState::from(self.machine.state())
    }

    fn transition(&mut self, input: &LifecycleInput) -> AuthResult<SourceState> {
        let old_state = self.state();

        self.machine.consume(input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input, old_state
            ))
        })?;

        let new_state = self.state();
        debug!(
            old_state = ?old_state,
            new_state = ?new_state,
            "Session source transition"
        );
        Ok(new_state)
    }
}

/// Auth source that owns the user for one provider mount.
///
/// On mount it asks the client for the current session and follows the
/// client's auth-state changes until unmounted. The published snapshot is:
///
/// - `user`: the session's user, replaced by refresh and change events;
/// - `is_loading`: true until the initial check completes and while a
///   sign-out or refresh is in flight;
/// - `is_auth_checked`: true once the initial check has completed, whatever
///   its outcome.
///
/// A user replaced while the initial check is still running is newer than
/// the check's result and is kept.
///
/// A missing session, a failed session lookup, a sign-out, or a change event
/// without a session (other than `SIGNED_OUT`) calls the sign-in redirect.
pub struct SessionAuthSource {
    client: Arc<dyn AuthClient>,
    sign_in_route: String,
    redirect: SignInRedirect,
    snapshots: watch::Sender<Arc<AuthSnapshot>>,
    inner: Mutex<Inner>,
    in_flight: AtomicUsize,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SessionAuthSource {
    pub fn new(
        client: Arc<dyn AuthClient>,
        sign_in_route: impl Into<String>,
        redirect: SignInRedirect,
    ) -> Arc<Self> {
        let (snapshots, _) = watch::channel(Arc::new(AuthSnapshot::initial()));
        Arc::new(Self {
            client,
            sign_in_route: sign_in_route.into(),
            redirect,
            snapshots,
            inner: Mutex::new(Inner {
                machine: LifecycleMachine::new(),
                user: None,
                auth_checked: false,
                user_settled: false,
            }),
            in_flight: AtomicUsize::new(0),
            tasks: Mutex::new(Vec::new()),
        })
    }

    pub fn state(&self) -> SourceState {
        self.inner.lock().state()
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<AuthSnapshot> {
        self.snapshots.borrow().clone()
    }

    pub fn sign_in_route(&self) -> &str {
        &self.sign_in_route
    }

    fn ensure_active(&self) -> AuthResult<()> {
        match self.state() {
            SourceState::Idle => Err(AuthError::NotMounted),
            SourceState::Unmounted => Err(AuthError::Unmounted),
            SourceState::Checking | SourceState::Ready => Ok(()),
        }
    }

    /// Publish a snapshot built from the current state.
    ///
    /// Nothing is sent when the value is unchanged, so readers keep the same
    /// `Arc`. An unmounted source publishes nothing.
    fn publish(&self) {
        let inner = self.inner.lock();
        let state = inner.state();
        if state == SourceState::Unmounted {
            return;
        }

        let next = AuthSnapshot {
            user: inner.user.clone(),
            is_loading: matches!(state, SourceState::Idle | SourceState::Checking)
                || self.in_flight.load(Ordering::SeqCst) > 0,
            is_auth_checked: inner.auth_checked,
        };

        self.snapshots.send_if_modified(|current| {
            if **current == next {
                false
            } else {
                *current = Arc::new(next);
                true
            }
        });
    }

    /// Replace the user. Returns false when the source is not active.
    ///
    /// A user set during the initial check wins over the check's result.
    fn set_user(&self, user: Option<User>) -> bool {
        {
            let mut inner = self.inner.lock();
            let state = inner.state();
            if !state.is_active() {
                return false;
            }
            if state == SourceState::Checking {
                inner.user_settled = true;
            }
            inner.user = user;
        }
        self.publish();
        true
    }

    fn redirect_to_sign_in(&self) {
        info!(route = %self.sign_in_route, "Redirecting to sign-in");
        (self.redirect)(&self.sign_in_route);
    }

    fn begin_operation(&self) -> InFlight<'_> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.publish();
        InFlight { source: self }
    }

    async fn check_session(&self) {
        let user = match self.client.get_session().await {
            Ok(Some(session)) => {
                info!(user_id = %session.user.id, "Existing session found");
                Some(session.user)
            }
            Ok(None) => {
                debug!("No existing session");
                None
            }
            Err(e) => {
                error!(error = %e, "Failed to get session");
                None
            }
        };
        let redirect = {
            let mut inner = self.inner.lock();
            if let Err(e) = inner.transition(&LifecycleInput::CheckComplete) {
                debug!(error = %e, "Discarding session check result");
                return;
            }
            inner.auth_checked = true;
            if inner.user_settled {
                debug!("User changed during session check, keeping newer user");
                false
            } else {
                let signed_out = user.is_none();
                inner.user = user;
                signed_out
            }
        };
        self.publish();

        if redirect {
            self.redirect_to_sign_in();
        }
    }

    fn handle_change(&self, change: AuthStateChange) {
        let AuthStateChange { event, session } = change;
        debug!(
            event = ?event,
            has_session = session.is_some(),
            "Auth state changed"
        );

        let session_gone = session.is_none();
        if !self.set_user(session.map(|s| s.user)) {
            return;
        }

        if session_gone && event != AuthChangeEvent::SignedOut {
            self.redirect_to_sign_in();
        }
    }

    async fn run_initial_check(source: Weak<Self>) {
        if let Some(source) = source.upgrade() {
            source.check_session().await;
        }
    }

    async fn run_listener(source: Weak<Self>, mut changes: broadcast::Receiver<AuthStateChange>) {
        loop {
            match changes.recv().await {
                Ok(change) => match source.upgrade() {
                    Some(source) => source.handle_change(change),
                    None => break,
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Auth state listener lagged behind");
                }
                Err(RecvError::Closed) => {
                    debug!("Auth state channel closed");
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl AuthSource for SessionAuthSource {
    fn snapshots(&self) -> SnapshotReceiver {
        self.snapshots.subscribe()
    }

    async fn sign_out(&self) -> AuthResult<()> {
        self.ensure_active()?;
        let _operation = self.begin_operation();

        if let Err(e) = self.client.sign_out().await {
            error!(error = %e, "Sign out error");
            return Err(e);
        }

        info!("Signed out");
        if self.set_user(None) {
            self.redirect_to_sign_in();
        }
        Ok(())
    }

    async fn refresh_user(&self) -> AuthResult<()> {
        self.ensure_active()?;
        let _operation = self.begin_operation();

        match self.client.get_user().await {
            Ok(user) => {
                debug!(
                    user_id = user.as_ref().map(|u| u.id.as_str()).unwrap_or("none"),
                    "User refreshed"
                );
                self.set_user(user);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to refresh user");
                Err(e)
            }
        }
    }

    fn mount(self: Arc<Self>) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!(error = %e, "Session source must be mounted inside a tokio runtime");
                return;
            }
        };

        if let Err(e) = self.inner.lock().transition(&LifecycleInput::Mount) {
            warn!(error = %e, "Ignoring mount");
            return;
        }

        // Subscribe before the check starts so no change is missed.
        let changes = self.client.on_auth_state_change();
        let check = runtime.spawn(Self::run_initial_check(Arc::downgrade(&self)));
        let listener = runtime.spawn(Self::run_listener(Arc::downgrade(&self), changes));
        self.tasks.lock().extend([check, listener]);
    }

    fn unmount(&self) {
        if let Err(e) = self.inner.lock().transition(&LifecycleInput::Unmount) {
            debug!(error = %e, "Ignoring unmount");
        }

        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

/// Marks one sign-out or refresh as in flight until dropped.
struct InFlight<'a> {
    source: &'a SessionAuthSource,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.source.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.source.publish();
    }
}
