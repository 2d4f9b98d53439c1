//! Keyed session registry.
//!
//! Owns every live session and hands out one `Arc<Mutex<Session>>` per call.
//! The per-call mutex is the serialization point between the telephony
//! collaborator and the flow: whoever dispatches an event holds it for the
//! whole dispatch, so two events for one call can never interleave. Sessions
//! for distinct calls share nothing.
//!
//! The flow itself never destroys a session; the embedding service decides
//! when to call `remove` or sweep with `evict_idle`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

use super::state::{CallId, Session};

/// Shared handle to the registry.
pub type SharedSessionRegistry = Arc<SessionRegistry>;

/// Lazy-create registry of per-call sessions.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<CallId, Arc<Mutex<Session>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing session for `id`, or a fresh one resting at the entry step.
    /// Creation always succeeds.
    pub async fn get_or_create(
        &self,
        id: &CallId,
        caller_number: &str,
    ) -> Arc<Mutex<Session>> {
        if let Some(existing) = self.sessions.read().await.get(id) {
            return Arc::clone(existing);
        }

        let mut sessions = self.sessions.write().await;
        Arc::clone(sessions.entry(id.clone()).or_insert_with(|| {
            tracing::debug!(call_id = %id, "Created session");
            Arc::new(Mutex::new(Session::new(id.clone(), caller_number)))
        }))
    }

    /// Drop a session outright. Returns whether one existed.
    pub async fn remove(&self, id: &CallId) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    /// Sweep sessions idle for at least `max_idle_secs`. Sessions whose lock
    /// is currently held are in use and are skipped. Returns the number
    /// evicted.
    pub async fn evict_idle(&self, max_idle_secs: u64) -> usize {
        let now = Utc::now();
        let mut evicted = 0usize;

        let mut sessions = self.sessions.write().await;
        sessions.retain(|id, entry| match entry.try_lock() {
            Ok(session) => {
                if session.idle_seconds(now) >= max_idle_secs as i64 {
                    tracing::debug!(call_id = %id, "Evicted idle session");
                    evicted += 1;
                    false
                } else {
                    true
                }
            }
            Err(_) => true,
        });

        if evicted > 0 {
            tracing::info!(evicted, remaining = sessions.len(), "Session sweep");
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
