//! Session-backed auth source.
//!
//! [`SessionAuthSource`] implements [`auth_context::AuthSource`] on top of an
//! [`AuthClient`]: it runs the initial session check when mounted, follows
//! the client's auth-state changes, and sends the user to the sign-in route
//! whenever the session goes away unexpectedly.

mod client;
mod lifecycle;
mod source;
mod types;

#[cfg(test)]
mod test_support;

pub use client::AuthClient;
pub use lifecycle::{LifecycleInput, LifecycleMachine, LifecycleState, SourceState};
pub use source::{SessionAuthSource, SignInRedirect};
pub use types::{AuthChangeEvent, AuthStateChange, Session};
