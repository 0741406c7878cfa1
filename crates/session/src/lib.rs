//! # Veighty Session
//!
//! Talks to a running veighty-machinery target. A [`Session`] drives one
//! generated program through the connection handshake and compares every
//! line the target prints against the declared outputs. The [`Checker`]
//! builds service checks on top of that: random program runs, storage
//! round trips and flag placement, with keys remembered in a
//! [`StateStore`] between invocations.

pub mod checker;
pub mod error;
pub mod session;
pub mod state;

pub use checker::{CheckResult, Checker};
pub use error::{SessionError, SessionResult};
pub use session::{Connect, Session, TcpConnector};
pub use state::{CheckerState, SavedPair, StateStore};
