//! Supabase GoTrue client.
//!
//! [`SupabaseAuthClient`] talks to the GoTrue REST API, keeps the session in
//! a [`SessionStore`] and reports auth-state changes; it implements
//! [`auth_session::AuthClient`].

mod client;
mod error;
mod refresh;
mod store;

pub use client::SupabaseAuthClient;
pub use error::{SupabaseError, SupabaseResult};
pub use refresh::RefreshConfig;
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
