// Test code patterns:
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Credstore Persistence
//!
//! The snapshot-file collaborator for the authentication-state store. On
//! startup it builds a store from the snapshot file (a missing or broken
//! file falls back to an empty store, never a crash); afterwards it
//! subscribes to the store's mutation notifications and mirrors every
//! durable change back to the file from a background writer task.
//!
//! A configuration flag disables the collaborator entirely, leaving the
//! store purely in-memory for the process lifetime.

pub mod config;
pub mod error;
pub mod file;

pub use config::{PersistConfig, DEFAULT_SNAPSHOT_PATH};
pub use error::{PersistError, PersistResult};
pub use file::{attach, init, load_store, write_snapshot};
