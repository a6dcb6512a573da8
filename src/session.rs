//! Session history behind an injectable key-value interface.
//!
//! Presentation layers keep per-session conversation state; the core only
//! defines the seam so that state never lives in globals and the in-memory
//! implementation can be swapped for a persistent store.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEntry {
    pub question: String,
    pub sql: Option<String>,
    pub summary: Option<String>,
    pub asked_at: DateTime<Utc>,
}

impl SessionEntry {
    pub fn new(question: &str, sql: Option<String>, summary: Option<String>) -> Self {
        Self {
            question: question.to_string(),
            sql,
            summary,
            asked_at: Utc::now(),
        }
    }
}

pub trait SessionStore: Send + Sync {
    fn append(&self, session_id: &str, entry: SessionEntry);
    fn history(&self, session_id: &str) -> Vec<SessionEntry>;
    fn clear(&self, session_id: &str);
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, Vec<SessionEntry>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn append(&self, session_id: &str, entry: SessionEntry) {
        self.sessions
            .entry(session_id.to_string())
            .or_default()
            .push(entry);
    }

    fn history(&self, session_id: &str) -> Vec<SessionEntry> {
        self.sessions
            .get(session_id)
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    fn clear(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_history_per_session() {
        let store = InMemorySessionStore::new();
        store.append("s1", SessionEntry::new("first", None, None));
        store.append("s1", SessionEntry::new("second", Some("SELECT 1".to_string()), None));
        store.append("s2", SessionEntry::new("other", None, None));

        let history = store.history("s1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].question, "first");
        assert_eq!(history[1].sql.as_deref(), Some("SELECT 1"));
        assert_eq!(store.history("s2").len(), 1);
        assert!(store.history("unknown").is_empty());
    }

    #[test]
    fn test_clear_removes_session() {
        let store = InMemorySessionStore::new();
        store.append("s1", SessionEntry::new("q", None, None));
        store.clear("s1");
        assert!(store.history("s1").is_empty());
    }
}
