//! Session ownership — one isolated conversation state per connected
//! client.
//!
//! The registry's id→session map is one of only two pieces of
//! cross-session shared mutable state in the system (the other is the
//! gateway's connection set). Map mutation is synchronized behind an
//! RwLock; a session handle obtained from the map needs no further
//! synchronization against other sessions. Within a session, the history
//! mutex serializes turns: a turn arriving while one is in flight queues
//! on the lock and is never interleaved.

use crate::message::History;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// One client's isolated conversation state.
pub struct Session {
    /// The client id this session belongs to.
    pub id: String,

    /// Ordered message history, mutated only by this session's own agent
    /// loop invocation.
    pub history: Mutex<History>,

    /// When this session was created.
    pub created_at: DateTime<Utc>,

    /// When this session last processed a message.
    last_active: std::sync::Mutex<DateTime<Utc>>,
}

impl Session {
    fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            history: Mutex::new(History::new()),
            created_at: now,
            last_active: std::sync::Mutex::new(now),
        }
    }

    /// Record activity on this session.
    pub fn touch(&self) {
        let mut guard = self.last_active.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Utc::now();
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        *self.last_active.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Owns one session per connected client.
///
/// Sessions are created on first contact, live for the duration of the
/// connection, and are dropped (no persistence) on disconnect.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Get the session for `id`, creating it on first contact.
    ///
    /// Idempotent per id: concurrent first-contact from the same id
    /// resolves to a single session because creation happens under the
    /// write lock.
    pub async fn get_or_create(&self, id: &str) -> Arc<Session> {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(id) {
                return session.clone();
            }
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                debug!(client_id = %id, "Creating session");
                Arc::new(Session::new(id))
            })
            .clone()
    }

    /// Remove the session for `id` (connection teardown). The session's
    /// memory is freed once in-flight work holding the Arc completes.
    pub async fn remove(&self, id: &str) {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(id).is_some() {
            debug!(client_id = %id, "Session removed");
        }
    }

    /// Clear the history of the session for `id`, if it exists.
    pub async fn clear(&self, id: &str) {
        let session = {
            let sessions = self.sessions.read().await;
            sessions.get(id).cloned()
        };
        if let Some(session) = session {
            session.history.lock().await.clear();
            debug!(client_id = %id, "Session history cleared");
        }
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let registry = SessionRegistry::new();
        let a = registry.get_or_create("client_1").await;
        let b = registry.get_or_create("client_1").await;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn concurrent_first_contact_creates_one_session() {
        let registry = Arc::new(SessionRegistry::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.get_or_create("client_race").await
            }));
        }
        let sessions: Vec<Arc<Session>> =
            futures_join_all(handles).await.into_iter().collect();
        assert_eq!(registry.len().await, 1);
        for s in &sessions[1..] {
            assert!(Arc::ptr_eq(&sessions[0], s));
        }
    }

    // Minimal join_all to avoid a dev-dependency on futures in core.
    async fn futures_join_all(
        handles: Vec<tokio::task::JoinHandle<Arc<Session>>>,
    ) -> Vec<Arc<Session>> {
        let mut out = Vec::with_capacity(handles.len());
        for h in handles {
            out.push(h.await.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn remove_frees_the_session() {
        let registry = SessionRegistry::new();
        registry.get_or_create("client_1").await;
        registry.remove("client_1").await;
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn clear_resets_history_but_keeps_session() {
        let registry = SessionRegistry::new();
        let session = registry.get_or_create("client_1").await;
        session.history.lock().await.push(Message::user("hello"));
        assert_eq!(session.history.lock().await.len(), 1);

        registry.clear("client_1").await;
        assert_eq!(session.history.lock().await.len(), 0);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let registry = SessionRegistry::new();
        let a = registry.get_or_create("client_a").await;
        let b = registry.get_or_create("client_b").await;

        a.history.lock().await.push(Message::user("only in a"));
        registry.clear("client_a").await;

        b.history.lock().await.push(Message::user("only in b"));
        assert_eq!(a.history.lock().await.len(), 0);
        assert_eq!(b.history.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn touch_advances_last_active() {
        let registry = SessionRegistry::new();
        let session = registry.get_or_create("client_1").await;
        let before = session.last_active();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        session.touch();
        assert!(session.last_active() > before);
    }
}
