// Test code patterns:
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Credstore Core
//!
//! Process-local authentication-state store for a PAKE-backed login service.
//! Holds three time-bounded record classes (durable registration records,
//! short-lived login handshake state, and session tokens) and notifies
//! registered listeners whenever durable state changes so a persistence
//! collaborator can mirror it to disk.
//!
//! The key exchange itself is an external collaborator reached through the
//! [`PakeServer`] trait; every payload it produces or consumes is an opaque
//! string the store only ever stores and returns.

pub mod clock;
pub mod error;
pub mod flows;
pub mod snapshot;
pub mod store;

#[cfg(test)]
mod edge_case_tests;

// Clock
pub use clock::{Clock, ManualClock, SystemClock};

// Error
pub use error::{FlowError, FlowResult, PakeError, SnapshotError};

// Flows
pub use flows::{generate_session_id, AuthFlows, PakeServer, StartedLogin};

// Snapshot
pub use snapshot::Snapshot;

// Store
pub use store::{
    AuthStateStore, LoginEntry, SessionData, Subscription, DEFAULT_SESSION_LIFETIME_DAYS,
    LOGIN_FRESHNESS_WINDOW_MS,
};
