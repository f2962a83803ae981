//! Session CRUD operations

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::database::Database;
use super::messages::{ChatMessage, MessageRole, MessageStore};

/// Session store failures
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Session metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub owner_user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
}

/// Session store: owns per-user, per-session ordered message history.
///
/// Message order within a session is exactly append order; the
/// orchestrator serializes in-flight calls per session so two requests
/// can never interleave their appends.
pub struct SessionStore {
    db: Database,
}

impl SessionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a new empty session owned by `user_id`
    pub fn create_session(&self, user_id: &str, title: &str) -> Result<ChatSession, SessionError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        self.db
            .conn()
            .execute(
                "INSERT INTO sessions (id, owner_user_id, title, created_at, updated_at, message_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0)",
                params![id, user_id, title, now.to_rfc3339(), now.to_rfc3339()],
            )
            .map_err(|e| SessionError::Storage(e.into()))?;

        Ok(ChatSession {
            id,
            owner_user_id: user_id.to_string(),
            title: title.to_string(),
            created_at: now,
            updated_at: now,
            message_count: 0,
        })
    }

    /// Get a specific session
    pub fn get_session(&self, session_id: &str) -> Result<Option<ChatSession>, SessionError> {
        let conn = self.db.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, owner_user_id, title, created_at, updated_at, message_count
                 FROM sessions WHERE id = ?1",
            )
            .map_err(anyhow::Error::from)?;

        let session = stmt.query_row([session_id], Self::map_session_row);
        match session {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(SessionError::Storage(e.into())),
        }
    }

    /// Check the session exists and belongs to `user_id`
    pub fn verify_ownership(&self, session_id: &str, user_id: &str) -> Result<bool, SessionError> {
        let count: i64 = self
            .db
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM sessions WHERE id = ?1 AND owner_user_id = ?2",
                params![session_id, user_id],
                |row| row.get(0),
            )
            .map_err(anyhow::Error::from)?;
        Ok(count > 0)
    }

    /// List a user's sessions, most recently updated first
    pub fn list_sessions(&self, user_id: &str) -> Result<Vec<ChatSession>, SessionError> {
        let conn = self.db.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, owner_user_id, title, created_at, updated_at, message_count
                 FROM sessions WHERE owner_user_id = ?1
                 ORDER BY updated_at DESC",
            )
            .map_err(anyhow::Error::from)?;

        let sessions = stmt
            .query_map([user_id], Self::map_session_row)
            .map_err(anyhow::Error::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(anyhow::Error::from)?;

        Ok(sessions)
    }

    /// Append a message; atomic with the session's bookkeeping.
    /// Returns the new message id.
    pub fn append_message(
        &self,
        session_id: &str,
        role: MessageRole,
        content: &str,
        action_performed: Option<&str>,
        action_details: Option<&Value>,
    ) -> Result<i64, SessionError> {
        if self.get_session(session_id)?.is_none() {
            return Err(SessionError::NotFound(session_id.to_string()));
        }

        MessageStore::new(&self.db)
            .append(session_id, role, content, action_performed, action_details)
            .map_err(SessionError::Storage)
    }

    /// Load all messages for a session in arrival order
    pub fn list_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, SessionError> {
        if self.get_session(session_id)?.is_none() {
            return Err(SessionError::NotFound(session_id.to_string()));
        }
        MessageStore::new(&self.db)
            .load(session_id)
            .map_err(SessionError::Storage)
    }

    /// Delete a session and its messages. `NotFound` if absent.
    pub fn delete_session(&self, session_id: &str) -> Result<(), SessionError> {
        let deleted = self
            .db
            .conn()
            .execute("DELETE FROM sessions WHERE id = ?1", params![session_id])
            .map_err(anyhow::Error::from)?;

        if deleted == 0 {
            return Err(SessionError::NotFound(session_id.to_string()));
        }

        tracing::info!(session_id = %session_id, "Session deleted");
        Ok(())
    }

    fn map_session_row(row: &rusqlite::Row) -> rusqlite::Result<ChatSession> {
        let created_at: String = row.get(3)?;
        let updated_at: String = row.get(4)?;
        let message_count: i64 = row.get(5)?;

        Ok(ChatSession {
            id: row.get(0)?,
            owner_user_id: row.get(1)?,
            title: row.get(2)?,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            updated_at: DateTime::parse_from_rfc3339(&updated_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            message_count: message_count as usize,
        })
    }

    /// Generate a session title from the first message content.
    /// Truncates at word boundaries; char-based indexing for UTF-8 safety.
    pub fn generate_title_from_content(content: &str) -> String {
        let first_line = content.lines().next().unwrap_or("").trim();

        let char_count = first_line.chars().count();
        if char_count <= 50 {
            return first_line.to_string();
        }

        let first_50: String = first_line.chars().take(50).collect();
        if let Some(last_space) = first_50.rfind(char::is_whitespace) {
            let char_idx = first_50[..last_space].chars().count();
            // Only use the word boundary if it keeps a useful prefix
            if char_idx > 20 {
                let prefix: String = first_line.chars().take(char_idx).collect();
                return format!("{}...", prefix.trim_end());
            }
        }

        let truncated: String = first_line.chars().take(47).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn create_test_store() -> (SessionStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let db = Database::new(&db_path).expect("Failed to create database");
        (SessionStore::new(db), temp_dir)
    }

    #[test]
    fn append_preserves_arrival_order() {
        let (store, _temp) = create_test_store();
        let session = store.create_session("alice", "Order issue").unwrap();

        store
            .append_message(&session.id, MessageRole::User, "where is my package", None, None)
            .unwrap();
        store
            .append_message(&session.id, MessageRole::Assistant, "let me check", None, None)
            .unwrap();
        store
            .append_message(&session.id, MessageRole::User, "thanks", None, None)
            .unwrap();

        let messages = store.list_messages(&session.id).unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, "where is my package");
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert_eq!(messages[2].content, "thanks");
    }

    #[test]
    fn append_bumps_message_count_and_updated_at() {
        let (store, _temp) = create_test_store();
        let session = store.create_session("alice", "Test").unwrap();

        store
            .append_message(&session.id, MessageRole::User, "hello", None, None)
            .unwrap();

        let reloaded = store.get_session(&session.id).unwrap().unwrap();
        assert_eq!(reloaded.message_count, 1);
        assert!(reloaded.updated_at >= session.updated_at);
    }

    #[test]
    fn append_to_unknown_session_is_not_found() {
        let (store, _temp) = create_test_store();
        let result = store.append_message("nope", MessageRole::User, "hello", None, None);
        assert!(matches!(result, Err(SessionError::NotFound(_))));
    }

    #[test]
    fn sessions_list_most_recently_updated_first() {
        let (store, _temp) = create_test_store();
        let first = store.create_session("alice", "First").unwrap();
        let second = store.create_session("alice", "Second").unwrap();

        // Touch the first session so it becomes the most recent
        std::thread::sleep(std::time::Duration::from_millis(5));
        store
            .append_message(&first.id, MessageRole::User, "bump", None, None)
            .unwrap();

        let sessions = store.list_sessions("alice").unwrap();
        assert_eq!(sessions[0].id, first.id);
        assert_eq!(sessions[1].id, second.id);
    }

    #[test]
    fn sessions_are_scoped_per_user() {
        let (store, _temp) = create_test_store();
        let alice = store.create_session("alice", "Alice's").unwrap();
        store.create_session("bob", "Bob's").unwrap();

        let sessions = store.list_sessions("alice").unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, alice.id);

        assert!(store.verify_ownership(&alice.id, "alice").unwrap());
        assert!(!store.verify_ownership(&alice.id, "bob").unwrap());
    }

    #[test]
    fn delete_session_removes_messages_and_reports_not_found() {
        let (store, _temp) = create_test_store();
        let session = store.create_session("alice", "Doomed").unwrap();
        store
            .append_message(&session.id, MessageRole::User, "hello", None, None)
            .unwrap();

        store.delete_session(&session.id).unwrap();
        assert!(store.get_session(&session.id).unwrap().is_none());
        assert!(matches!(
            store.delete_session(&session.id),
            Err(SessionError::NotFound(_))
        ));
    }

    #[test]
    fn action_fields_round_trip() {
        let (store, _temp) = create_test_store();
        let session = store.create_session("alice", "Reopen").unwrap();
        let details = serde_json::json!({"ticket_id": 42, "old_status": "resolved", "new_status": "pending"});

        store
            .append_message(
                &session.id,
                MessageRole::Assistant,
                "Ticket #42 has been reopened.",
                Some("reopen_ticket"),
                Some(&details),
            )
            .unwrap();

        let messages = store.list_messages(&session.id).unwrap();
        assert_eq!(messages[0].action_performed.as_deref(), Some("reopen_ticket"));
        assert_eq!(messages[0].action_details, Some(details));
    }

    #[test]
    fn title_generation_truncates_at_word_boundaries() {
        let long = "I have a very long question about my subscription billing that goes on and on";
        let title = SessionStore::generate_title_from_content(long);
        assert!(title.ends_with("..."));
        assert!(title.chars().count() <= 53);

        let short = "Where is my package?";
        assert_eq!(SessionStore::generate_title_from_content(short), short);
    }

    #[test]
    fn title_generation_is_utf8_safe() {
        let text = "料金について質問があります".repeat(10);
        // Must not panic on multi-byte boundaries
        let _ = SessionStore::generate_title_from_content(&text);
    }
}
