//! Textual snapshot of the durable store state.
//!
//! The snapshot carries exactly the users and logins mappings. Sessions are
//! transient, reconstructable only through a fresh login, and persisting
//! them would write long-lived session keys to disk. The encoding is
//! pretty-printed JSON with sorted keys so successive snapshots diff
//! cleanly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;
use crate::store::LoginEntry;

/// The durable portion of the store: in-flight logins and registered users.
///
/// Field order matters for the emitted file: `logins` first, then `users`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// In-flight login handshakes, keyed by user identifier.
    pub logins: BTreeMap<String, LoginEntry>,
    /// Registration records, keyed by user identifier.
    pub users: BTreeMap<String, String>,
}

impl Snapshot {
    /// Encode as pretty-printed JSON (2-space indentation).
    #[allow(clippy::expect_used)] // string-keyed maps of strings cannot fail to serialize
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("snapshot serialization is infallible")
    }

    /// Decode a snapshot produced by [`to_json`](Self::to_json).
    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(text)?)
    }
}
