//! Authentication session for the Budget Bridge client.
//!
//! This crate provides:
//! - Bearer credential decoding and the identity projected from it
//! - An explicit FSM for the session lifecycle
//! - `SessionController`: hydrate, login redirect, single-flight refresh, logout
//! - A backend cookie jar that can persist between processes
//! - The `Navigator` seam through which redirects leave the process

mod auth_fsm;
mod cookie_jar;
mod credential;
mod error;
mod navigator;
mod session;

pub use auth_fsm::auth_machine;
pub use auth_fsm::{AuthMachine, AuthMachineInput, AuthMachineState, SessionState};
pub use credential::{Credential, Identity};
pub use error::{AuthError, AuthResult};
pub use navigator::{path_and_query, take_query_param, MemoryNavigator, Navigator, Suspended};
pub use session::{SessionController, SessionSnapshot, TOKEN_PARAM};
