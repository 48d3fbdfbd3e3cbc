//! Error types for the persistence collaborator.

use credstore_core::SnapshotError;
use thiserror::Error;

pub type PersistResult<T> = Result<T, PersistError>;

/// Failure while reading or writing the snapshot file.
///
/// These never reach the store: load failures fall back to an empty store
/// and write failures are logged by the writer task.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("snapshot file i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}
