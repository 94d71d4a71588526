//! Session state machine using rust-fsm.
//!
//! Every change to the current credential goes through one of these
//! transitions, so the rest of the client never has to infer session state
//! from what happens to be in storage.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │  Uninitialized  │ (initial)
//! └────────┬────────┘
//!          │ Initialize
//!          ▼
//! ┌─────────────────┐  NoCredential / Rejected   ┌─────────────────┐
//! │     Loading     │ ─────────────────────────► │ Unauthenticated │
//! └────────┬────────┘                            └────────┬────────┘
//!          │ TokenAccepted / ServerVerified               │ TokenAccepted
//!          ▼                                              ▼
//! ┌─────────────────┐       RefreshStarted       ┌─────────────────┐
//! │  Authenticated  │ ─────────────────────────► │   Refreshing    │
//! └────────┬────────┘ ◄───────────────────────── └─────────────────┘
//!          │               RefreshSucceeded        (RefreshFailed ─► Unauthenticated)
//!          │ RedirectStarted
//!          ▼
//! ┌─────────────────┐  Resumed
//! │   Redirecting   │ ────────► Loading
//! └─────────────────┘
//! ```
//!
//! `LoggedOut` leads to `Unauthenticated` from every state past
//! `Uninitialized`.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub auth_machine(Uninitialized)

    Uninitialized => {
        Initialize => Loading
    },
    Loading => {
        // Fresh token delivered on the landing URL
        TokenAccepted => Authenticated,
        // Stored token confirmed by /auth/validate
        ServerVerified => Authenticated,
        // Stored token answered with 401
        RefreshStarted => Refreshing,
        NoCredential => Unauthenticated,
        Rejected => Unauthenticated,
        LoggedOut => Unauthenticated
    },
    Authenticated => {
        TokenAccepted => Authenticated,
        RefreshStarted => Refreshing,
        Rejected => Unauthenticated,
        LoggedOut => Unauthenticated,
        RedirectStarted => Redirecting
    },
    Unauthenticated => {
        TokenAccepted => Authenticated,
        RefreshStarted => Refreshing,
        Rejected => Unauthenticated,
        LoggedOut => Unauthenticated,
        RedirectStarted => Redirecting
    },
    Refreshing => {
        RefreshSucceeded => Authenticated,
        RefreshFailed => Unauthenticated,
        LoggedOut => Unauthenticated
    },
    Redirecting => {
        // The browser came back; hydrate as on a fresh load
        Resumed => Loading,
        LoggedOut => Unauthenticated
    }
}

pub use auth_machine::Input as AuthMachineInput;
pub use auth_machine::State as AuthMachineState;
pub use auth_machine::StateMachine as AuthMachine;

/// Public view of the session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// `initialize()` has not run yet.
    Uninitialized,
    /// Hydrating from the landing URL or the stored credential.
    Loading,
    /// A decoded, accepted credential is current.
    Authenticated,
    /// No credential.
    Unauthenticated,
    /// A refresh call is in flight.
    Refreshing,
    /// Control has been handed to the browser; waiting for it to come back.
    Redirecting,
}

impl SessionState {
    /// Returns true only for `Authenticated`.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated)
    }

    /// Returns true if the state is a transient/in-progress state.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SessionState::Loading | SessionState::Refreshing | SessionState::Redirecting
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Loading => "loading",
            SessionState::Authenticated => "authenticated",
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::Refreshing => "refreshing",
            SessionState::Redirecting => "redirecting",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&AuthMachineState> for SessionState {
    fn from(state: &AuthMachineState) -> Self {
        match state {
            AuthMachineState::Uninitialized => SessionState::Uninitialized,
            AuthMachineState::Loading => SessionState::Loading,
            AuthMachineState::Authenticated => SessionState::Authenticated,
            AuthMachineState::Unauthenticated => SessionState::Unauthenticated,
            AuthMachineState::Refreshing => SessionState::Refreshing,
            AuthMachineState::Redirecting => SessionState::Redirecting,
        }
    }
}
