//! Snapshot file loading and write-behind persistence.
//!
//! Startup reads the file once and rebuilds the store from it; a missing
//! file starts an empty store and a malformed one is logged and skipped.
//! After startup, a store listener nudges a background writer task over a
//! channel; the task re-serializes the durable state and overwrites the
//! file, coalescing bursts of mutations into a single write.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use credstore_core::{AuthStateStore, Clock, Snapshot, Subscription};
use tokio::sync::mpsc;

use crate::config::PersistConfig;
use crate::error::PersistResult;

/// Build a store from the snapshot file.
///
/// Absence of the file is the normal first-run case; any other failure is
/// logged as a warning. Both fall back to an empty store, because a broken
/// snapshot must never take the process down.
pub async fn load_store(path: &Path, clock: Arc<dyn Clock>) -> Arc<AuthStateStore> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => match Snapshot::from_json(&text) {
            Ok(snapshot) => {
                tracing::info!(path = %path.display(), "store initialized from snapshot file");
                Arc::new(AuthStateStore::from_snapshot(snapshot, clock))
            }
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "snapshot file is malformed, starting with an empty store"
                );
                Arc::new(AuthStateStore::with_clock(clock))
            }
        },
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::info!(
                path = %path.display(),
                "no snapshot file found, starting with an empty store"
            );
            Arc::new(AuthStateStore::with_clock(clock))
        }
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "failed to read snapshot file, starting with an empty store"
            );
            Arc::new(AuthStateStore::with_clock(clock))
        }
    }
}

/// Serialize the durable state and overwrite the snapshot file.
pub async fn write_snapshot(path: &Path, store: &AuthStateStore) -> PersistResult<()> {
    let text = store.snapshot().await.to_json();
    tokio::fs::write(path, text).await?;
    Ok(())
}

/// Mirror every durable mutation to the snapshot file.
///
/// The registered listener only sends a nudge on a channel; it never does
/// I/O and never re-enters the store from the notification call stack. The
/// writer task picks the nudge up, drains any others queued behind it, and
/// performs one write for the batch. Unsubscribing drops the channel sender
/// and the writer task winds down.
pub fn attach(store: Arc<AuthStateStore>, path: PathBuf) -> Subscription {
    let (tx, mut rx) = mpsc::unbounded_channel::<()>();

    let writer_store = Arc::clone(&store);
    tokio::spawn(async move {
        while rx.recv().await.is_some() {
            // Coalesce whatever queued up while the previous write ran.
            while rx.try_recv().is_ok() {}
            if let Err(err) = write_snapshot(&path, &writer_store).await {
                tracing::error!(
                    path = %path.display(),
                    error = %err,
                    "failed to write snapshot file"
                );
            }
        }
        tracing::debug!(path = %path.display(), "snapshot writer stopped");
    });

    store.add_listener(move || {
        let _ = tx.send(());
    })
}

/// Wire the collaborator up per configuration.
///
/// With persistence disabled this hands back a fresh in-memory store and no
/// subscription. Otherwise it loads the snapshot (or starts empty), writes
/// the file once so it reflects the state that was just loaded, and
/// attaches the write-behind listener.
pub async fn init(
    config: &PersistConfig,
    clock: Arc<dyn Clock>,
) -> (Arc<AuthStateStore>, Option<Subscription>) {
    if config.disable_persistence {
        tracing::info!("persistence disabled, store is in-memory only");
        return (Arc::new(AuthStateStore::with_clock(clock)), None);
    }

    let store = load_store(&config.snapshot_path, clock).await;

    if let Err(err) = write_snapshot(&config.snapshot_path, &store).await {
        tracing::error!(
            path = %config.snapshot_path.display(),
            error = %err,
            "failed to write initial snapshot file"
        );
    }

    let subscription = attach(Arc::clone(&store), config.snapshot_path.clone());
    (store, Some(subscription))
}
