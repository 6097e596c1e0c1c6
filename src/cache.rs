//! # Cache Module
//!
//! LLM response caches. A cache is passed to a chain run explicitly through
//! [`crate::chain::RunConfig`]; there is no process-wide cache.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::db::{MAX_TTL_SECONDS, Store};

/// Default cache TTL in seconds
pub const CACHE_TTL_SECONDS: i64 = 3600;

const KEY_PREFIX: &str = "llm_cache:";

/// Cache TTL, overridable via `LLM_DEMOS_CACHE_TTL`; clamped to `0..=MAX_TTL_SECONDS`
pub fn cache_ttl_seconds() -> i64 {
    std::env::var("LLM_DEMOS_CACHE_TTL")
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .map(clamp_ttl)
        .unwrap_or(CACHE_TTL_SECONDS)
}

fn clamp_ttl(ttl_seconds: i64) -> i64 {
    ttl_seconds.clamp(0, MAX_TTL_SECONDS)
}

pub trait LlmCache {
    fn lookup(&self, prompt: &str, llm_key: &str) -> Result<Option<String>>;

    fn update(&self, prompt: &str, llm_key: &str, text: &str) -> Result<()>;

    fn clear(&self) -> Result<()>;
}

/// Generate cache key from the rendered prompt and the model configuration
fn make_cache_key(prompt: &str, llm_key: &str) -> String {
    format!("{KEY_PREFIX}{llm_key}:{prompt}")
}

#[derive(Clone, Debug)]
struct CacheEntry {
    text: String,
    expires_at: DateTime<Utc>,
}

/// Process-local cache with expiry
#[derive(Debug)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new(cache_ttl_seconds())
    }
}

impl InMemoryCache {
    pub fn new(ttl_seconds: i64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: Duration::try_seconds(clamp_ttl(ttl_seconds)).unwrap_or_else(Duration::zero),
        }
    }

    /// Cache statistics `(total, unexpired)`
    pub fn stats(&self) -> (usize, usize) {
        if let Ok(cache) = self.entries.lock() {
            let now = Utc::now();
            let valid = cache.values().filter(|e| e.expires_at > now).count();
            (cache.len(), valid)
        } else {
            (0, 0)
        }
    }
}

impl LlmCache for InMemoryCache {
    fn lookup(&self, prompt: &str, llm_key: &str) -> Result<Option<String>> {
        let key = make_cache_key(prompt, llm_key);
        let cache = self
            .entries
            .lock()
            .map_err(|_| anyhow!("cache lock poisoned"))?;
        Ok(cache
            .get(&key)
            .filter(|e| e.expires_at > Utc::now())
            .map(|e| e.text.clone()))
    }

    fn update(&self, prompt: &str, llm_key: &str, text: &str) -> Result<()> {
        let now = Utc::now();
        let mut cache = self
            .entries
            .lock()
            .map_err(|_| anyhow!("cache lock poisoned"))?;
        // Clean up expired entries while we have the lock
        cache.retain(|_, entry| entry.expires_at > now);
        cache.insert(
            make_cache_key(prompt, llm_key),
            CacheEntry {
                text: text.to_string(),
                expires_at: now
                    .checked_add_signed(self.ttl)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC),
            },
        );
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("cache lock poisoned"))?
            .clear();
        Ok(())
    }
}

/// Cache persisted in the key-value tables of a [`Store`]
pub struct SqliteCache<'a> {
    store: &'a Store,
    ttl_seconds: i64,
}

impl<'a> SqliteCache<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self {
            store,
            ttl_seconds: cache_ttl_seconds(),
        }
    }

    pub fn with_ttl(mut self, ttl_seconds: i64) -> Self {
        self.ttl_seconds = clamp_ttl(ttl_seconds);
        self
    }
}

impl LlmCache for SqliteCache<'_> {
    fn lookup(&self, prompt: &str, llm_key: &str) -> Result<Option<String>> {
        self.store.get(&make_cache_key(prompt, llm_key))
    }

    fn update(&self, prompt: &str, llm_key: &str, text: &str) -> Result<()> {
        self.store
            .set_with_ttl(&make_cache_key(prompt, llm_key), text, self.ttl_seconds)
    }

    fn clear(&self) -> Result<()> {
        self.store.delete_prefix(KEY_PREFIX)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_hit_and_miss() {
        let cache = InMemoryCache::new(60);
        assert_eq!(cache.lookup("p", "m").unwrap(), None);
        cache.update("p", "m", "answer").unwrap();
        assert_eq!(cache.lookup("p", "m").unwrap().as_deref(), Some("answer"));
        // Same prompt, different model configuration
        assert_eq!(cache.lookup("p", "other").unwrap(), None);
        assert_eq!(cache.stats(), (1, 1));
        cache.clear().unwrap();
        assert_eq!(cache.lookup("p", "m").unwrap(), None);
    }

    #[test]
    fn test_in_memory_expiry() {
        let cache = InMemoryCache::new(0);
        cache.update("p", "m", "stale").unwrap();
        assert_eq!(cache.lookup("p", "m").unwrap(), None);
        assert_eq!(cache.stats().1, 0);
    }

    #[test]
    fn test_sqlite_cache() {
        let store = Store::in_memory().unwrap();
        store.set("unrelated", "keep").unwrap();
        store.set("LLM_CACHE:user-owned", "keep").unwrap();
        store.hset("llm_cache:hash", "field", "v").unwrap();
        let cache = SqliteCache::new(&store).with_ttl(300);
        cache.update("prompt", "openai:gpt-4o", "cached!").unwrap();
        assert_eq!(
            cache.lookup("prompt", "openai:gpt-4o").unwrap().as_deref(),
            Some("cached!")
        );
        cache.clear().unwrap();
        assert_eq!(cache.lookup("prompt", "openai:gpt-4o").unwrap(), None);
        assert_eq!(store.get("unrelated").unwrap().as_deref(), Some("keep"));
        assert_eq!(
            store.get("LLM_CACHE:user-owned").unwrap().as_deref(),
            Some("keep")
        );
        assert_eq!(store.hget("llm_cache:hash", "field").unwrap(), None);
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let cache = InMemoryCache::new(i64::MAX);
        cache.update("p", "m", "kept").unwrap();
        assert_eq!(cache.lookup("p", "m").unwrap().as_deref(), Some("kept"));

        let store = Store::in_memory().unwrap();
        let cache = SqliteCache::new(&store).with_ttl(i64::MAX);
        cache.update("p", "m", "kept").unwrap();
        assert_eq!(cache.lookup("p", "m").unwrap().as_deref(), Some("kept"));
    }

    #[test]
    #[serial_test::serial]
    fn test_ttl_env_override() {
        // SAFETY: Test runs serially, no concurrent env access
        unsafe { std::env::set_var("LLM_DEMOS_CACHE_TTL", "42") };
        assert_eq!(cache_ttl_seconds(), 42);
        unsafe { std::env::set_var("LLM_DEMOS_CACHE_TTL", i64::MAX.to_string()) };
        assert_eq!(cache_ttl_seconds(), MAX_TTL_SECONDS);
        unsafe { std::env::set_var("LLM_DEMOS_CACHE_TTL", "-5") };
        assert_eq!(cache_ttl_seconds(), 0);
        unsafe { std::env::set_var("LLM_DEMOS_CACHE_TTL", "not-a-number") };
        assert_eq!(cache_ttl_seconds(), CACHE_TTL_SECONDS);
        unsafe { std::env::remove_var("LLM_DEMOS_CACHE_TTL") };
    }
}
