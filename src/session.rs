//! Session bag and the store behind it.
//!
//! The dispatcher only talks to the narrow [`SessionStore`] trait. Sessions are
//! keyed by the `WAYPOINT_SESSION` cookie; a new session is created lazily the
//! first time a handler asks for one.

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError, TryLockError};
use std::time::{Duration, Instant, SystemTime};
use tracing::debug;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "WAYPOINT_SESSION";

/// Default idle timeout (30 minutes).
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// Upper bound on the time between two purges run by `create`.
pub const MAX_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Shared handle to one session.
pub type SessionHandle = Arc<Session>;

/// Key/value attributes for one client.
#[derive(Debug)]
pub struct Session {
    id: String,
    created_at: SystemTime,
    last_accessed: Mutex<Instant>,
    attributes: DashMap<String, Value>,
}

impl Session {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: SystemTime::now(),
            last_accessed: Mutex::new(Instant::now()),
            attributes: DashMap::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    #[must_use]
    pub fn last_accessed(&self) -> Instant {
        *self
            .last_accessed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn touch(&self) {
        *self
            .last_accessed
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.attributes.get(key).map(|v| v.value().clone())
    }

    /// Typed read of an attribute. `None` when absent or of another shape.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_value(key)
            .and_then(|v| serde_json::from_value(v).ok())
    }

    pub fn set<T: Serialize>(&self, key: impl Into<String>, value: T) -> serde_json::Result<()> {
        self.attributes.insert(key.into(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.attributes.remove(key).map(|(_, v)| v)
    }

    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.attributes.iter().map(|e| e.key().clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// Session lifecycle as seen by the request pipeline.
pub trait SessionStore: Send + Sync {
    /// Load a live session by id, refreshing its last-access time.
    fn load(&self, id: &str) -> Option<SessionHandle>;

    /// Create and store a new session.
    fn create(&self) -> SessionHandle;

    fn invalidate(&self, id: &str);
}

/// Process-local store with idle expiry.
///
/// Expired sessions are dropped on `load`, and `create` sweeps the whole store
/// at most once per `min(ttl, MAX_PURGE_INTERVAL)`.
#[derive(Debug)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, SessionHandle>,
    ttl: Duration,
    last_purge: Mutex<Instant>,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
            last_purge: Mutex::new(Instant::now()),
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop every session idle for longer than the ttl. Returns how many went.
    pub fn purge_expired(&self) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| session.last_accessed().elapsed() <= self.ttl);
        let purged = before.saturating_sub(self.sessions.len());
        if purged > 0 {
            debug!(purged, remaining = self.sessions.len(), "Expired sessions purged");
        }
        purged
    }

    /// Purge unless another caller is already at it or the last sweep is
    /// recent.
    fn purge_if_due(&self) {
        let mut last = match self.last_purge.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return,
        };
        if last.elapsed() < self.ttl.min(MAX_PURGE_INTERVAL) {
            return;
        }
        *last = Instant::now();
        drop(last);
        self.purge_expired();
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self, id: &str) -> Option<SessionHandle> {
        let session = self.sessions.get(id).map(|s| Arc::clone(s.value()))?;
        if session.last_accessed().elapsed() > self.ttl {
            self.sessions.remove(id);
            debug!(session_id = %id, "Session expired");
            return None;
        }
        session.touch();
        Some(session)
    }

    fn create(&self) -> SessionHandle {
        self.purge_if_due();
        let session = Arc::new(Session::new(ulid::Ulid::new().to_string()));
        self.sessions
            .insert(session.id().to_string(), Arc::clone(&session));
        debug!(session_id = %session.id(), "Session created");
        session
    }

    fn invalidate(&self, id: &str) {
        if self.sessions.remove(id).is_some() {
            debug!(session_id = %id, "Session invalidated");
        }
    }
}
