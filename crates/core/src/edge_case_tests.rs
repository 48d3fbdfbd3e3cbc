//! Edge case tests for the authentication-state store
//!
//! Tests critical boundary conditions in:
//! - Login freshness window (exact window edges)
//! - Session expiry instants (at, before, after expiry)
//! - Listener subscription lifecycle (double unsubscribe, store drop)
//! - Snapshot reconstruction

#[cfg(test)]
mod freshness_window_tests {
    use std::sync::Arc;

    use crate::clock::ManualClock;
    use crate::store::{AuthStateStore, LOGIN_FRESHNESS_WINDOW_MS};

    fn store_at(epoch_ms: i64) -> (Arc<ManualClock>, AuthStateStore) {
        let clock = Arc::new(ManualClock::new(epoch_ms));
        let store = AuthStateStore::with_clock(clock.clone());
        (clock, store)
    }

    // Liveness is strict: age < 2000 ms. At exactly 1999 ms the entry is
    // still live; at 2000 ms it is not.
    #[tokio::test]
    async fn login_live_at_window_minus_one() {
        let (clock, store) = store_at(1_000_000);
        store.set_login("alice", "STATE1").await;

        clock.advance(LOGIN_FRESHNESS_WINDOW_MS - 1);
        assert!(store.has_login("alice").await);
        assert!(store.get_login("alice").await.is_some());
    }

    #[tokio::test]
    async fn login_stale_at_exact_window() {
        let (clock, store) = store_at(1_000_000);
        store.set_login("alice", "STATE1").await;

        clock.advance(LOGIN_FRESHNESS_WINDOW_MS);
        assert!(!store.has_login("alice").await);
        assert!(store.get_login("alice").await.is_none());
    }

    #[tokio::test]
    async fn remove_login_deletes_stale_entries_too() {
        let (clock, store) = store_at(1_000_000);
        store.set_login("alice", "STATE1").await;
        clock.advance(LOGIN_FRESHNESS_WINDOW_MS + 1);

        store.remove_login("alice").await;
        let snapshot = store.snapshot().await;
        assert!(snapshot.logins.is_empty());
    }
}

#[cfg(test)]
mod session_expiry_tests {
    use std::sync::Arc;

    use crate::clock::ManualClock;
    use crate::store::{AuthStateStore, SessionData};

    fn session() -> SessionData {
        SessionData {
            user_identifier: "alice".to_string(),
            session_key: "KEY1".to_string(),
        }
    }

    // Expiry is inclusive: a session read at exactly its expiry instant is
    // gone.
    #[tokio::test]
    async fn session_absent_at_exact_expiry_instant() {
        let clock = Arc::new(ManualClock::new(0));
        let store = AuthStateStore::with_clock(clock.clone());

        store.set_session_with_lifetime("sess-1", session(), 1).await;

        clock.set(24 * 60 * 60 * 1_000 - 1);
        assert!(store.get_session("sess-1").await.is_some());

        clock.set(24 * 60 * 60 * 1_000);
        assert!(store.get_session("sess-1").await.is_none());
    }

    #[tokio::test]
    async fn zero_lifetime_session_is_dead_on_arrival() {
        let clock = Arc::new(ManualClock::new(1_000));
        let store = AuthStateStore::with_clock(clock);

        store.set_session_with_lifetime("sess-1", session(), 0).await;
        assert!(store.get_session("sess-1").await.is_none());
    }

    #[tokio::test]
    async fn overwriting_a_session_resets_its_expiry() {
        let clock = Arc::new(ManualClock::new(0));
        let store = AuthStateStore::with_clock(clock.clone());

        store.set_session_with_lifetime("sess-1", session(), 1).await;
        clock.advance(12 * 60 * 60 * 1_000);
        store.set_session_with_lifetime("sess-1", session(), 1).await;

        // 1.5 days after the first write, but only half a day after the
        // second: still live.
        clock.advance(24 * 60 * 60 * 1_000);
        assert!(store.get_session("sess-1").await.is_some());
    }
}

#[cfg(test)]
mod listener_lifecycle_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::clock::ManualClock;
    use crate::store::AuthStateStore;

    #[tokio::test]
    async fn double_unsubscribe_is_a_no_op() {
        let store = AuthStateStore::with_clock(Arc::new(ManualClock::new(0)));
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = fired.clone();
        let subscription = store.add_listener(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        subscription.unsubscribe();
        subscription.unsubscribe();

        store.set_user("alice", "REC1").await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unsubscribing_one_listener_leaves_the_others() {
        let store = AuthStateStore::with_clock(Arc::new(ManualClock::new(0)));
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = first.clone();
        let a = store.add_listener(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = second.clone();
        let _b = store.add_listener(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        a.unsubscribe();
        store.set_user("alice", "REC1").await;

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_after_store_drop_does_not_panic() {
        let store = AuthStateStore::with_clock(Arc::new(ManualClock::new(0)));
        let subscription = store.add_listener(|| {});

        drop(store);
        subscription.unsubscribe();
    }
}

#[cfg(test)]
mod snapshot_reconstruction_tests {
    use std::sync::Arc;

    use crate::clock::ManualClock;
    use crate::snapshot::Snapshot;
    use crate::store::AuthStateStore;

    // A store rebuilt from its own serialized snapshot carries identical
    // users and logins, including login timestamps.
    #[tokio::test]
    async fn serialize_deserialize_rebuild_is_lossless() {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let store = AuthStateStore::with_clock(clock.clone());

        store.set_user("alice", "REC1").await;
        store.set_user("bob", "REC2").await;
        clock.advance(250);
        store.set_login("bob", "STATE-B").await;

        let text = store.snapshot().await.to_json();
        let restored =
            AuthStateStore::from_snapshot(Snapshot::from_json(&text).unwrap(), clock.clone());

        assert_eq!(restored.snapshot().await, store.snapshot().await);
        let snapshot = restored.snapshot().await;
        assert_eq!(
            snapshot.logins.get("bob").map(|e| e.timestamp),
            Some(1_700_000_000_250)
        );
    }

    // A login persisted moments before a restart is still honored by the
    // rebuilt store while its window lasts.
    #[tokio::test]
    async fn rebuilt_store_applies_freshness_to_restored_logins() {
        let clock = Arc::new(ManualClock::new(5_000_000));
        let store = AuthStateStore::with_clock(clock.clone());
        store.set_login("alice", "STATE1").await;

        let restored = AuthStateStore::from_snapshot(store.snapshot().await, clock.clone());
        assert!(restored.has_login("alice").await);

        clock.advance(2_000);
        assert!(!restored.has_login("alice").await);
    }
}
