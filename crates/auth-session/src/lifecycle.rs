//! Lifecycle state machine of a session source.
//!
//! ```text
//! Idle ──Mount──► Checking ──CheckComplete──► Ready
//!                    │                          │
//!                    └───────Unmount────────────┴──► Unmounted
//! ```
//!
//! A source is mounted once, completes its initial check once and is
//! unmounted once. Unmounted is terminal.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub lifecycle_machine(Idle)

    Idle => {
        Mount => Checking
    },
    Checking => {
        CheckComplete => Ready,
        Unmount => Unmounted
    },
    Ready => {
        Unmount => Unmounted
    }
}

pub use lifecycle_machine::Input as LifecycleInput;
pub use lifecycle_machine::State as LifecycleState;
pub use lifecycle_machine::StateMachine as LifecycleMachine;

/// Lifecycle state for logging and inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceState {
    /// Created, not yet mounted.
    Idle,
    /// Mounted, initial session check running.
    Checking,
    /// Initial check done.
    Ready,
    /// Unmounted; no further updates.
    Unmounted,
}

impl SourceState {
    /// Operations are accepted in this state.
    pub fn is_active(&self) -> bool {
        matches!(self, SourceState::Checking | SourceState::Ready)
    }
}

impl From<&LifecycleState> for SourceState {
    fn from(state: &LifecycleState) -> Self {
        match state {
            LifecycleState::Idle => SourceState::Idle,
            LifecycleState::Checking => SourceState::Checking,
            LifecycleState::Ready => SourceState::Ready,
            LifecycleState::Unmounted => SourceState::Unmounted,
        }
    }
}
