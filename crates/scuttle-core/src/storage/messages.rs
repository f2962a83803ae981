//! Message persistence
//!
//! Appends and loads the per-session message history. Appends are
//! transactional: the message row and the session's bookkeeping move
//! together or not at all.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::database::Database;

/// Who authored a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// One persisted chat message. Never mutated after append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub session_id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Action kind, present iff this message mutated ticket state
    pub action_performed: Option<String>,
    /// Kind-specific before/after fields
    pub action_details: Option<Value>,
}

/// Message store scoped to a database
pub struct MessageStore<'a> {
    db: &'a Database,
}

impl<'a> MessageStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Append a message and bump the session's `updated_at` and
    /// `message_count` in one transaction. Returns the new message id.
    pub fn append(
        &self,
        session_id: &str,
        role: MessageRole,
        content: &str,
        action_performed: Option<&str>,
        action_details: Option<&Value>,
    ) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        let details_json = action_details.map(|v| v.to_string());

        let mut conn = self.db.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO messages (session_id, role, content, created_at, action_performed, action_details)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![session_id, role.as_str(), content, now, action_performed, details_json],
        )?;
        let message_id = tx.last_insert_rowid();

        tx.execute(
            "UPDATE sessions SET updated_at = ?1, message_count = message_count + 1 WHERE id = ?2",
            params![now, session_id],
        )?;

        tx.commit()?;
        Ok(message_id)
    }

    /// Load all messages for a session in arrival order
    pub fn load(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, session_id, role, content, created_at, action_performed, action_details
             FROM messages WHERE session_id = ?1 ORDER BY id",
        )?;

        let messages = stmt.query_map([session_id], |row| {
            let role: String = row.get(2)?;
            let created_at: String = row.get(4)?;
            let details: Option<String> = row.get(6)?;

            Ok(ChatMessage {
                id: row.get(0)?,
                session_id: row.get(1)?,
                role: if role == "assistant" {
                    MessageRole::Assistant
                } else {
                    MessageRole::User
                },
                content: row.get(3)?,
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
                action_performed: row.get(5)?,
                action_details: details.and_then(|d| serde_json::from_str(&d).ok()),
            })
        })?;

        messages.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Total message count for a session
    pub fn count(&self, session_id: &str) -> Result<usize> {
        let count: i64 = self.db.conn().query_row(
            "SELECT COUNT(*) FROM messages WHERE session_id = ?1",
            [session_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
