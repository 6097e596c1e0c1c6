//! Documents and conversation history kept in the [`Store`].

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::Store;
use crate::models::{Message, Role};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub content: String,
    pub metadata: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: i64,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

impl From<StoredMessage> for Message {
    fn from(m: StoredMessage) -> Self {
        Message::new(m.role, m.content)
    }
}

/// Fresh random session identifier
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn parse_metadata(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or(Value::Null)
}

impl Store {
    pub fn insert_document(&self, content: &str, metadata: &Value) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO documents (content, metadata, created_at) VALUES (?1, ?2, ?3)",
            params![content, metadata.to_string(), Utc::now().to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn count_documents(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    pub fn list_documents(&self, limit: usize) -> Result<Vec<Document>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, content, metadata FROM documents ORDER BY id LIMIT ?1")?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            let metadata: String = row.get(2)?;
            Ok(Document {
                id: row.get(0)?,
                content: row.get(1)?,
                metadata: parse_metadata(&metadata),
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("read documents")
    }

    pub fn delete_document(&self, id: i64) -> Result<bool> {
        let n = self
            .conn
            .execute("DELETE FROM documents WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }

    pub fn add_message(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
        metadata: &Value,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO conversation_history (session_id, message_type, content, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session_id,
                role.as_str(),
                content,
                metadata.to_string(),
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Messages of one session in insertion order
    pub fn messages(&self, session_id: &str) -> Result<Vec<StoredMessage>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, message_type, content, metadata, created_at
             FROM conversation_history WHERE session_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![session_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, session_id, kind, content, metadata, created_at) = row?;
            out.push(StoredMessage {
                id,
                session_id,
                role: Role::parse(&kind)?,
                content,
                metadata: parse_metadata(&metadata),
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .with_context(|| format!("bad created_at on message {id}"))?
                    .with_timezone(&Utc),
            });
        }
        Ok(out)
    }

    pub fn clear_session(&self, session_id: &str) -> Result<usize> {
        let n = self.conn.execute(
            "DELETE FROM conversation_history WHERE session_id = ?1",
            params![session_id],
        )?;
        Ok(n)
    }
}
