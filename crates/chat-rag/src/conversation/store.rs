//! Per-session conversation log

use dashmap::DashMap;
use std::sync::Arc;

use crate::storage::ConversationBackend;
use crate::types::ConversationTurn;

/// Append-only turn log per session.
///
/// The in-memory view is what callers see. The optional backend mirrors it
/// durably and is read once per session, on first access.
pub struct ConversationStore {
    sessions: DashMap<String, Vec<ConversationTurn>>,
    backend: Option<Arc<dyn ConversationBackend>>,
}

impl ConversationStore {
    /// Store that only keeps history in memory
    pub fn in_memory() -> Self {
        Self {
            sessions: DashMap::new(),
            backend: None,
        }
    }

    pub fn with_backend(backend: Arc<dyn ConversationBackend>) -> Self {
        tracing::info!("Conversation history persisted with {}", backend.name());
        Self {
            sessions: DashMap::new(),
            backend: Some(backend),
        }
    }

    /// Stored turns for a session not yet cached in memory
    fn load(&self, session_id: &str) -> Vec<ConversationTurn> {
        match &self.backend {
            Some(backend) => backend.load(session_id).unwrap_or_else(|e| {
                tracing::warn!("Could not load history for session {}: {}", session_id, e);
                Vec::new()
            }),
            None => Vec::new(),
        }
    }

    /// Append one turn
    pub fn append(&self, turn: ConversationTurn) {
        self.append_all(vec![turn]);
    }

    /// Append a user turn followed by the assistant turn answering it
    pub fn append_exchange(&self, session_id: &str, user_text: &str, assistant_text: &str) {
        self.append_all(vec![
            ConversationTurn::user(session_id, user_text),
            ConversationTurn::assistant(session_id, assistant_text),
        ]);
    }

    fn append_all(&self, turns: Vec<ConversationTurn>) {
        let Some(session_id) = turns.first().map(|t| t.session_id.clone()) else {
            return;
        };
        self.sessions
            .entry(session_id.clone())
            .or_insert_with(|| self.load(&session_id))
            .extend(turns.iter().cloned());

        if let Some(backend) = &self.backend {
            if let Err(e) = backend.append(&turns) {
                tracing::warn!("Failed to persist turns for session {}: {}", session_id, e);
            }
        }
    }

    /// The last `limit` turns of a session, oldest first.
    ///
    /// Sessions with no turns are not cached, so reads alone never grow the map.
    pub fn history(&self, session_id: &str, limit: usize) -> Vec<ConversationTurn> {
        let tail = |turns: &[ConversationTurn]| {
            let start = turns.len().saturating_sub(limit);
            turns[start..].to_vec()
        };

        if let Some(turns) = self.sessions.get(session_id) {
            return tail(turns.value());
        }

        let turns = self.load(session_id);
        if turns.is_empty() {
            return Vec::new();
        }
        tail(self.sessions.entry(session_id.to_string()).or_insert(turns).value())
    }

    /// Forget a session. Always empties the visible history.
    pub fn clear(&self, session_id: &str) {
        let Some(backend) = &self.backend else {
            self.sessions.remove(session_id);
            return;
        };

        match backend.clear(session_id) {
            Ok(deleted) => {
                self.sessions.remove(session_id);
                tracing::info!("Cleared {} stored turns for session {}", deleted, session_id);
            }
            Err(e) => {
                // Stored turns survive, so pin an empty view over them
                self.sessions.insert(session_id.to_string(), Vec::new());
                tracing::warn!("Failed to clear stored history for session {}: {}", session_id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::storage::ConversationDb;
    use crate::types::Role;

    struct BrokenBackend;

    impl ConversationBackend for BrokenBackend {
        fn append(&self, _turns: &[ConversationTurn]) -> Result<()> {
            Err(Error::persistence("disk full"))
        }

        fn load(&self, _session_id: &str) -> Result<Vec<ConversationTurn>> {
            Err(Error::persistence("database locked"))
        }

        fn clear(&self, _session_id: &str) -> Result<usize> {
            Err(Error::persistence("database locked"))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    #[test]
    fn test_exchange_order_and_limit() {
        let store = ConversationStore::in_memory();
        store.append_exchange("s1", "first question", "first answer");
        store.append_exchange("s1", "second question", "second answer");

        let all = store.history("s1", 50);
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].role, Role::User);
        assert_eq!(all[1].role, Role::Assistant);
        assert_eq!(all[3].text, "second answer");

        let last_two = store.history("s1", 2);
        assert_eq!(last_two[0].text, "second question");
        assert!(store.history("unknown", 10).is_empty());
    }

    #[test]
    fn test_hydrates_from_backend() {
        let db = Arc::new(ConversationDb::in_memory().unwrap());
        db.append(&[
            ConversationTurn::user("s1", "remembered"),
            ConversationTurn::assistant("s1", "yes"),
        ])
        .unwrap();

        let store = ConversationStore::with_backend(db.clone());
        store.append(ConversationTurn::user("s1", "new"));

        let history = store.history("s1", 10);
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].text, "remembered");
        assert_eq!(db.count("s1").unwrap(), 3);
    }

    #[test]
    fn test_broken_backend_is_not_surfaced() {
        let store = ConversationStore::with_backend(Arc::new(BrokenBackend));
        store.append_exchange("s1", "hello", "hi");
        assert_eq!(store.history("s1", 10).len(), 2);

        store.clear("s1");
        assert!(store.history("s1", 10).is_empty());
    }

    #[test]
    fn test_reads_do_not_cache_empty_sessions() {
        let store = ConversationStore::with_backend(Arc::new(ConversationDb::in_memory().unwrap()));
        for i in 0..100 {
            assert!(store.history(&format!("visitor-{}", i), 10).is_empty());
        }
        assert!(store.sessions.is_empty());

        store.append_exchange("s1", "hello", "hi");
        assert_eq!(store.sessions.len(), 1);

        store.clear("s1");
        assert!(store.sessions.is_empty());
        assert!(store.history("s1", 10).is_empty());
    }
}
