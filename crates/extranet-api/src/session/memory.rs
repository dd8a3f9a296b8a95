//! In-process session store.

use async_trait::async_trait;
use dashmap::DashMap;
use extranet_core::UserId;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{new_session_id, SessionStore};
use crate::domain::error::ServerError;

#[derive(Debug, Clone, Copy)]
struct Entry {
    user_id: UserId,
    expires_at: Instant,
}

/// Sessions kept in a concurrent map; lost on restart
#[derive(Debug, Clone)]
pub struct MemorySessionStore {
    sessions: Arc<DashMap<String, Entry>>,
    ttl: Duration,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Drops expired sessions. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| entry.expires_at > now);
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, user_id: UserId) -> Result<String, ServerError> {
        let id = new_session_id();
        self.sessions.insert(
            id.clone(),
            Entry {
                user_id,
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(id)
    }

    async fn get(&self, session_id: &str) -> Result<Option<UserId>, ServerError> {
        let now = Instant::now();
        let live = self
            .sessions
            .get(session_id)
            .map(|entry| (entry.user_id, entry.expires_at > now));

        match live {
            Some((user_id, true)) => Ok(Some(user_id)),
            Some((_, false)) => {
                self.sessions.remove(session_id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn destroy(&self, session_id: &str) -> Result<(), ServerError> {
        self.sessions.remove(session_id);
        Ok(())
    }
}
