//! The ephemeral authentication-state store.
//!
//! One process-local instance owns three mappings:
//!
//! - `users`: registration records, durable, never overwritten in practice
//!   (the flow layer checks first; the store itself takes any write)
//! - `logins`: in-flight login handshakes, live for a 2-second window
//! - `sessions`: session tokens, lazily expired on read
//!
//! Users and logins are the durable portion: every mutation to them fires
//! the registered listeners so a persistence collaborator can mirror the
//! state to disk. Sessions are transient and excluded from both the
//! snapshot and the notifications.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError, Weak};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::snapshot::Snapshot;

/// How long a started login handshake stays live, in milliseconds.
///
/// An entry older than this is treated as absent by readers but is not
/// removed until the next `set_login` or `remove_login` for that user.
pub const LOGIN_FRESHNESS_WINDOW_MS: i64 = 2_000;

/// Session lifetime used when the caller does not pick one.
pub const DEFAULT_SESSION_LIFETIME_DAYS: u32 = 14;

const MILLISECONDS_PER_DAY: i64 = 24 * 60 * 60 * 1_000;

/// An in-flight login handshake: the opaque server-side state plus the
/// instant it was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginEntry {
    /// Opaque handshake state produced by the key exchange.
    pub value: String,
    /// Creation time, milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// What a session lookup returns: whose session it is and the key
/// negotiated during login. The expiry timestamp stays internal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub user_identifier: String,
    pub session_key: String,
}

#[derive(Debug, Clone)]
struct SessionEntry {
    data: SessionData,
    expires_at: i64,
}

#[derive(Default)]
struct State {
    users: BTreeMap<String, String>,
    logins: BTreeMap<String, LoginEntry>,
    sessions: HashMap<String, SessionEntry>,
}

type ListenerFn = Arc<dyn Fn() + Send + Sync + 'static>;

#[derive(Default)]
struct ListenerRegistry {
    next_id: u64,
    entries: Vec<(u64, ListenerFn)>,
}

/// Handle returned by [`AuthStateStore::add_listener`].
///
/// [`unsubscribe`](Subscription::unsubscribe) removes exactly the listener
/// this handle was created for; calling it a second time is a no-op.
/// Dropping the handle without unsubscribing leaves the listener registered
/// for the lifetime of the store.
pub struct Subscription {
    id: u64,
    registry: Weak<StdMutex<ListenerRegistry>>,
}

impl Subscription {
    /// Remove the listener. Safe to call more than once, and safe to call
    /// after the store itself has been dropped.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            lock_registry(&registry).entries.retain(|(id, _)| *id != self.id);
        }
    }
}

// A panicked listener may poison the registry mutex; the listener list is
// still coherent, so keep going with the inner value.
fn lock_registry(registry: &StdMutex<ListenerRegistry>) -> MutexGuard<'_, ListenerRegistry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-local authentication-state store.
///
/// Construct one instance at startup and share it as `Arc<AuthStateStore>`.
/// Every operation is a single lock-mutate-release step on one mutex, so a
/// reader can never observe a half-applied mutation. Listeners fire after
/// the state lock is released.
pub struct AuthStateStore {
    state: Mutex<State>,
    listeners: Arc<StdMutex<ListenerRegistry>>,
    clock: Arc<dyn Clock>,
}

impl AuthStateStore {
    /// Empty store on the system clock.
    pub fn empty() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Empty store with an explicit time source.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(State::default()),
            listeners: Arc::new(StdMutex::new(ListenerRegistry::default())),
            clock,
        }
    }

    /// Rebuild a store from a decoded snapshot.
    ///
    /// Sessions and listeners never survive a restart: the rebuilt store
    /// starts with both empty.
    pub fn from_snapshot(snapshot: Snapshot, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(State {
                users: snapshot.users,
                logins: snapshot.logins,
                sessions: HashMap::new(),
            }),
            listeners: Arc::new(StdMutex::new(ListenerRegistry::default())),
            clock,
        }
    }

    /// Clone of the durable portion (users and logins) for persistence.
    pub async fn snapshot(&self) -> Snapshot {
        let state = self.state.lock().await;
        Snapshot {
            logins: state.logins.clone(),
            users: state.users.clone(),
        }
    }

    // ── Users ───────────────────────────────────────────────────────

    /// Whether a registration record exists for the identifier.
    pub async fn has_user(&self, id: &str) -> bool {
        self.state.lock().await.users.contains_key(id)
    }

    /// The stored registration record, if any. No side effects.
    pub async fn get_user(&self, id: &str) -> Option<String> {
        self.state.lock().await.users.get(id).cloned()
    }

    /// Store a registration record.
    ///
    /// The write is unconditional; callers that must not overwrite an
    /// existing record check [`has_user`](Self::has_user) first, as the
    /// registration flow does.
    pub async fn set_user(&self, id: &str, registration_record: &str) {
        {
            let mut state = self.state.lock().await;
            state
                .users
                .insert(id.to_string(), registration_record.to_string());
        }
        tracing::debug!(user = id, "registration record stored");
        self.notify_listeners();
    }

    // ── Logins ──────────────────────────────────────────────────────

    /// Whether a live login handshake exists for the identifier.
    ///
    /// An entry that has aged past the freshness window counts as absent,
    /// but stays in place until overwritten or removed.
    pub async fn has_login(&self, id: &str) -> bool {
        let state = self.state.lock().await;
        self.login_is_fresh(&state, id)
    }

    /// The stored handshake state, only while the entry is fresh.
    pub async fn get_login(&self, id: &str) -> Option<String> {
        let state = self.state.lock().await;
        if self.login_is_fresh(&state, id) {
            state.logins.get(id).map(|entry| entry.value.clone())
        } else {
            None
        }
    }

    /// Store a login handshake with a creation timestamp of now,
    /// overwriting any previous entry for the identifier.
    ///
    /// The at-most-one-live-login invariant is caller-enforced: the login
    /// flow checks [`has_login`](Self::has_login) before calling this.
    pub async fn set_login(&self, id: &str, login_state: &str) {
        let timestamp = self.clock.now_ms();
        {
            let mut state = self.state.lock().await;
            state.logins.insert(
                id.to_string(),
                LoginEntry {
                    value: login_state.to_string(),
                    timestamp,
                },
            );
        }
        tracing::debug!(user = id, "login handshake stored");
        self.notify_listeners();
    }

    /// Delete the login entry, fresh or stale. No error when absent.
    pub async fn remove_login(&self, id: &str) {
        {
            let mut state = self.state.lock().await;
            state.logins.remove(id);
        }
        tracing::debug!(user = id, "login handshake removed");
        self.notify_listeners();
    }

    fn login_is_fresh(&self, state: &State, id: &str) -> bool {
        match state.logins.get(id) {
            Some(entry) => self.clock.now_ms() - entry.timestamp < LOGIN_FRESHNESS_WINDOW_MS,
            None => false,
        }
    }

    // ── Sessions ────────────────────────────────────────────────────

    /// Resolve a session identifier.
    ///
    /// A session read at or past its expiry is deleted on the spot and
    /// reported as absent; there is no background sweep.
    pub async fn get_session(&self, id: &str) -> Option<SessionData> {
        let now = self.clock.now_ms();
        let mut state = self.state.lock().await;
        let expires_at = match state.sessions.get(id) {
            Some(entry) => entry.expires_at,
            None => return None,
        };
        if expires_at <= now {
            state.sessions.remove(id);
            tracing::debug!(session = id, "expired session removed on read");
            return None;
        }
        state.sessions.get(id).map(|entry| entry.data.clone())
    }

    /// Store a session with the default 14-day lifetime.
    pub async fn set_session(&self, id: &str, data: SessionData) {
        self.set_session_with_lifetime(id, data, DEFAULT_SESSION_LIFETIME_DAYS)
            .await;
    }

    /// Store a session expiring `lifetime_days` from now.
    ///
    /// Sessions are excluded from the durable snapshot, so this does not
    /// notify listeners.
    pub async fn set_session_with_lifetime(&self, id: &str, data: SessionData, lifetime_days: u32) {
        let expires_at = self.clock.now_ms() + i64::from(lifetime_days) * MILLISECONDS_PER_DAY;
        let mut state = self.state.lock().await;
        state
            .sessions
            .insert(id.to_string(), SessionEntry { data, expires_at });
    }

    /// Delete a session. No error when absent, no listener notification.
    pub async fn clear_session(&self, id: &str) {
        let mut state = self.state.lock().await;
        state.sessions.remove(id);
    }

    // ── Listeners ───────────────────────────────────────────────────

    /// Register a callback fired synchronously after every mutation of
    /// durable state (users and logins; never sessions).
    ///
    /// Callbacks run after the state lock is released, so they may schedule
    /// further store operations without deadlocking, but they must not
    /// block on them inline.
    pub fn add_listener<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut registry = lock_registry(&self.listeners);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.push((id, Arc::new(listener)));
        Subscription {
            id,
            registry: Arc::downgrade(&self.listeners),
        }
    }

    fn notify_listeners(&self) {
        // Copy the callbacks out so the registry lock is not held while
        // they run; a callback may unsubscribe itself or add new listeners.
        let callbacks: Vec<ListenerFn> = lock_registry(&self.listeners)
            .entries
            .iter()
            .map(|(_, f)| Arc::clone(f))
            .collect();
        for callback in callbacks {
            callback();
        }
    }
}
