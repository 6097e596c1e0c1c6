//! SQLite-backed store used by the demos as both the relational database and
//! the key-value cache.
//!
//! This module provides:
//! - Database initialization with schema versioning
//! - String keys with optional expiry, plus hash (field/value) keys
//! - Concurrent access support via WAL mode
//!
//! Documents and conversation history live in [`crate::history`].

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

pub const SCHEMA_VERSION: &str = "1";

/// Upper bound for key expiry (10 years)
pub const MAX_TTL_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

/// Metadata value with optional timestamp
#[derive(Debug, Clone)]
pub struct MetadataEntry {
    pub value: String,
    pub updated_at: Option<i64>,
}

/// Get the default database file path
///
/// Checks `LLM_DEMOS_DB_PATH` first, falls back to `~/.llm-demos/demos.db`
pub fn default_db_path() -> Result<PathBuf> {
    if let Ok(custom_path) = env::var("LLM_DEMOS_DB_PATH")
        && !custom_path.trim().is_empty()
    {
        return Ok(PathBuf::from(custom_path));
    }

    let base_dirs = directories::BaseDirs::new().context("Failed to find home directory")?;
    let data_dir = base_dirs.home_dir().join(".llm-demos");

    if !data_dir.exists() {
        fs::create_dir_all(&data_dir)?;
    }

    Ok(data_dir.join("demos.db"))
}

pub struct Store {
    pub(crate) conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    /// Open database connection with WAL mode and retry logic
    ///
    /// Retries "database locked" errors with linear backoff.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create database directory {}", parent.display()))?;
        }

        let mut attempts = 0;
        let max_attempts = 3;

        loop {
            match Connection::open(path) {
                Ok(conn) => {
                    conn.pragma_update(None, "journal_mode", "WAL")?;
                    conn.pragma_update(None, "busy_timeout", 5000)?;
                    init_schema(&conn)?;
                    tracing::debug!(path = %path.display(), "opened store");
                    return Ok(Self {
                        conn,
                        path: Some(path.to_path_buf()),
                    });
                }
                Err(e) if e.to_string().contains("locked") && attempts < max_attempts => {
                    attempts += 1;
                    tracing::warn!(attempts, "database locked, retrying");
                    thread::sleep(Duration::from_millis(100 * attempts));
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("open database {}", path.display()));
                }
            }
        }
    }

    pub fn open_default() -> Result<Self> {
        Self::open(&default_db_path()?)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn ping(&self) -> Result<()> {
        self.conn
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .context("ping database")?;
        Ok(())
    }

    pub fn version(&self) -> Result<String> {
        let v: String = self
            .conn
            .query_row("SELECT sqlite_version()", [], |row| row.get(0))?;
        Ok(format!("SQLite {v}"))
    }

    /// Fetch metadata value and optional timestamp
    pub fn get_metadata(&self, key: &str) -> Result<Option<MetadataEntry>> {
        let result = self
            .conn
            .query_row(
                "SELECT value, updated_at FROM metadata WHERE key = ?1",
                params![key],
                |row| {
                    Ok(MetadataEntry {
                        value: row.get(0)?,
                        updated_at: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(result)
    }

    /// Set metadata value with current timestamp
    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        let now = Utc::now().timestamp();
        self.conn.execute(
            "INSERT INTO metadata (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    /// Store a string value with no expiry
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.put(key, value, None)
    }

    /// Store a string value that reads as absent once `ttl_seconds` have passed
    pub fn set_with_ttl(&self, key: &str, value: &str, ttl_seconds: i64) -> Result<()> {
        let ttl_seconds = ttl_seconds.clamp(0, MAX_TTL_SECONDS);
        let expires_at = Utc::now()
            .timestamp()
            .checked_add(ttl_seconds)
            .context("key expiry out of range")?;
        self.put(key, value, Some(expires_at))?;

        // Opportunistic cleanup of anything already expired
        let now = Utc::now().timestamp();
        self.conn.execute(
            "DELETE FROM kv WHERE expires_at IS NOT NULL AND expires_at < ?1",
            params![now],
        )?;
        Ok(())
    }

    fn put(&self, key: &str, value: &str, expires_at: Option<i64>) -> Result<()> {
        let now = Utc::now().timestamp();
        self.conn.execute(
            "INSERT INTO kv (key, value, updated_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                 value = excluded.value,
                 updated_at = excluded.updated_at,
                 expires_at = excluded.expires_at",
            params![key, value, now, expires_at],
        )?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Utc::now().timestamp();
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                params![key, now],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Delete a string or hash key; returns whether anything was removed
    pub fn delete(&self, key: &str) -> Result<bool> {
        let strings = self
            .conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        let fields = self
            .conn
            .execute("DELETE FROM kv_hash WHERE name = ?1", params![key])?;
        Ok(strings + fields > 0)
    }

    pub fn hset(&self, name: &str, field: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv_hash (name, field, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(name, field) DO UPDATE SET value = excluded.value",
            params![name, field, value],
        )?;
        Ok(())
    }

    pub fn hget(&self, name: &str, field: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_hash WHERE name = ?1 AND field = ?2",
                params![name, field],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Remove every string or hash key whose name starts with `prefix`
    ///
    /// Matching is case-sensitive. Returns the number of keys removed.
    pub fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        let strings = self.conn.execute(
            "DELETE FROM kv WHERE substr(key, 1, length(?1)) = ?1",
            params![prefix],
        )?;
        let hashes: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT name) FROM kv_hash WHERE substr(name, 1, length(?1)) = ?1",
            params![prefix],
            |row| row.get(0),
        )?;
        self.conn.execute(
            "DELETE FROM kv_hash WHERE substr(name, 1, length(?1)) = ?1",
            params![prefix],
        )?;
        Ok(strings + hashes as usize)
    }
}

/// Initialize database schema
///
/// Creates tables and indexes if they don't exist and records the schema version.
fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS metadata (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER
        );
        CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL,
            expires_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_kv_expires_at ON kv(expires_at);
        CREATE TABLE IF NOT EXISTS kv_hash (
            name TEXT NOT NULL,
            field TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (name, field)
        );
        CREATE TABLE IF NOT EXISTS documents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content TEXT NOT NULL,
            metadata TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS conversation_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id TEXT NOT NULL,
            message_type TEXT NOT NULL,
            content TEXT NOT NULL,
            metadata TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_history_session ON conversation_history(session_id);
        INSERT OR IGNORE INTO metadata (key, value) VALUES ('schema_version', '1');",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_db_init() {
        let temp_dir = TempDir::new().unwrap();
        let store = Store::open(&temp_dir.path().join("nested").join("test.db")).unwrap();
        let version = store.get_metadata("schema_version").unwrap().unwrap();
        assert_eq!(version.value, SCHEMA_VERSION);
        store.ping().unwrap();
        assert!(store.version().unwrap().starts_with("SQLite "));
    }

    #[test]
    fn test_reopen_keeps_data() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.db");
        Store::open(&path).unwrap().set("k", "v").unwrap();
        let store = Store::open(&path).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_set_get_delete() {
        let store = Store::in_memory().unwrap();
        store.set("test_key", "Hello from the demos!").unwrap();
        assert_eq!(
            store.get("test_key").unwrap().as_deref(),
            Some("Hello from the demos!")
        );
        assert!(store.delete("test_key").unwrap());
        assert_eq!(store.get("test_key").unwrap(), None);
        assert!(!store.delete("test_key").unwrap());
    }

    #[test]
    fn test_ttl_expiry() {
        let store = Store::in_memory().unwrap();
        store.set_with_ttl("fresh", "yes", 300).unwrap();
        store.set_with_ttl("expired", "no", 0).unwrap();
        assert_eq!(store.get("fresh").unwrap().as_deref(), Some("yes"));
        assert_eq!(store.get("expired").unwrap(), None);
    }

    #[test]
    fn test_hash_fields() {
        let store = Store::in_memory().unwrap();
        store
            .hset("llm_cache", "prompt_1", "This is a cached response")
            .unwrap();
        store.hset("llm_cache", "prompt_1", "updated").unwrap();
        assert_eq!(
            store.hget("llm_cache", "prompt_1").unwrap().as_deref(),
            Some("updated")
        );
        assert_eq!(store.hget("llm_cache", "prompt_2").unwrap(), None);
        assert!(store.delete("llm_cache").unwrap());
        assert_eq!(store.hget("llm_cache", "prompt_1").unwrap(), None);
    }

    #[test]
    fn test_delete_prefix_escapes_wildcards() {
        let store = Store::in_memory().unwrap();
        store.set("llm:a", "1").unwrap();
        store.set("llm:b", "2").unwrap();
        store.set("llmXc", "3").unwrap();
        store.set("other", "4").unwrap();
        assert_eq!(store.delete_prefix("llm:").unwrap(), 2);
        assert_eq!(store.get("llmXc").unwrap().as_deref(), Some("3"));
        assert_eq!(store.delete_prefix("ll_").unwrap(), 0);
    }

    #[test]
    fn test_delete_prefix_is_case_sensitive() {
        let store = Store::in_memory().unwrap();
        store.set("LLM_CACHE:user-owned", "keep").unwrap();
        store.set("llm_cache:x", "drop").unwrap();
        assert_eq!(store.delete_prefix("llm_cache:").unwrap(), 1);
        assert_eq!(
            store.get("LLM_CACHE:user-owned").unwrap().as_deref(),
            Some("keep")
        );
        assert_eq!(store.get("llm_cache:x").unwrap(), None);
    }

    #[test]
    fn test_delete_prefix_removes_hash_keys() {
        let store = Store::in_memory().unwrap();
        store.hset("llm_cache:h", "f1", "v").unwrap();
        store.hset("llm_cache:h", "f2", "v").unwrap();
        store.hset("LLM_CACHE:h", "f", "keep").unwrap();
        store.set("llm_cache:s", "v").unwrap();
        assert_eq!(store.delete_prefix("llm_cache:").unwrap(), 2);
        assert_eq!(store.hget("llm_cache:h", "f1").unwrap(), None);
        assert_eq!(
            store.hget("LLM_CACHE:h", "f").unwrap().as_deref(),
            Some("keep")
        );
    }

    #[test]
    fn test_huge_ttl_is_clamped() {
        let store = Store::in_memory().unwrap();
        store.set_with_ttl("forever", "yes", i64::MAX).unwrap();
        assert_eq!(store.get("forever").unwrap().as_deref(), Some("yes"));
        store.set_with_ttl("negative", "no", i64::MIN).unwrap();
        assert_eq!(store.get("negative").unwrap(), None);
    }

    #[test]
    fn test_metadata_roundtrip_has_timestamp() {
        let store = Store::in_memory().unwrap();
        store.set_metadata("last_demo", "cache").unwrap();
        let entry = store.get_metadata("last_demo").unwrap().unwrap();
        assert_eq!(entry.value, "cache");
        assert!(entry.updated_at.is_some());
    }
}
