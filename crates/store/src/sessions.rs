//! In-memory session store with per-session locking.
//!
//! The map is behind a `std::sync::Mutex` held only for the duration of a
//! single map operation, never across an `.await`. Serializing the requests
//! of one dialogue is the job of the per-session async lock returned by
//! [`SessionStore::lock`].

use chrono::{DateTime, Utc};
use shamba_core::Session;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Held while one request reads, advances and commits a session.
pub type SessionGuard = tokio::sync::OwnedMutexGuard<()>;

/// Live sessions keyed by transport session id.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Acquire exclusive access to one session id.
    ///
    /// Requests for different ids never contend. The guard does not imply
    /// the session exists; it only orders the requests that carry this id.
    pub async fn lock(&self, session_id: &str) -> SessionGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(session_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Drop lock entries nobody holds or waits on. Returns how many went.
    pub fn prune_idle_locks(&self) -> usize {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        let before = locks.len();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - locks.len()
    }

    /// Return the session for `session_id`, bumping its activity time, or
    /// create a fresh main-menu session.
    pub fn get_or_create(&self, session_id: &str, end_user_id: &str) -> Session {
        let now = Utc::now();
        let mut sessions = self.sessions();

        if let Some(session) = sessions.get_mut(session_id) {
            if session.end_user_id != end_user_id {
                warn!(
                    session_id,
                    stored = %session.end_user_id,
                    received = %end_user_id,
                    "Session id reused by a different caller, keeping the original"
                );
            }
            session.touch(now);
            return session.clone();
        }

        debug!(session_id, end_user_id, "Creating session");
        let session = Session::new(session_id, end_user_id, now);
        sessions.insert(session_id.to_string(), session.clone());
        session
    }

    pub fn get(&self, session_id: &str) -> Option<Session> {
        self.sessions().get(session_id).cloned()
    }

    /// Replace the stored record for `session.session_id`.
    pub fn save(&self, session: Session) {
        self.sessions().insert(session.session_id.clone(), session);
    }

    /// Remove a session. Returns whether it was present; absent is fine.
    pub fn delete(&self, session_id: &str) -> bool {
        self.sessions().remove(session_id).is_some()
    }

    /// Remove a session only if it has been idle since before `cutoff`.
    ///
    /// The check and the removal happen under one map lock, so a request
    /// that touched the session after a sweeper snapshot keeps it alive.
    pub fn delete_if_idle(&self, session_id: &str, cutoff: DateTime<Utc>) -> bool {
        let mut sessions = self.sessions();
        match sessions.get(session_id) {
            Some(session) if session.last_activity_at < cutoff => {
                sessions.remove(session_id);
                true
            }
            _ => false,
        }
    }

    /// Clones of every live session.
    pub fn snapshot(&self) -> Vec<Session> {
        self.sessions().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }
}
