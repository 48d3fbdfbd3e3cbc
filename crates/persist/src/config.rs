//! Environment-driven configuration for the snapshot file collaborator.

use std::env;
use std::path::PathBuf;

/// Snapshot location used when `AUTH_DB_PATH` is unset.
pub const DEFAULT_SNAPSHOT_PATH: &str = "./auth-db.json";

/// Where the snapshot lives and whether persistence is active at all.
#[derive(Debug, Clone)]
pub struct PersistConfig {
    /// Path of the snapshot file.
    pub snapshot_path: PathBuf,
    /// When true the store runs purely in-memory and nothing touches disk.
    pub disable_persistence: bool,
}

impl PersistConfig {
    /// Read configuration from the environment.
    ///
    /// - `AUTH_DB_PATH`: snapshot file path (default `./auth-db.json`)
    /// - `DISABLE_PERSISTENCE`: `1`/`true`/`yes` turns the collaborator off
    pub fn from_env() -> Self {
        let snapshot_path = env::var("AUTH_DB_PATH")
            .unwrap_or_else(|_| DEFAULT_SNAPSHOT_PATH.to_string())
            .into();
        let disable_persistence = env::var("DISABLE_PERSISTENCE")
            .map(|value| is_truthy(&value))
            .unwrap_or(false);

        Self {
            snapshot_path,
            disable_persistence,
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}
