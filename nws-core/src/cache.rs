//! In-memory cache for decoded API responses.
//!
//! Every entry carries an absolute expiry, checked on each `get`, so
//! `clean_expired` is purely maintenance for long-lived clients and is
//! never required for correctness.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: DateTime<Utc>,
}

/// Thread-safe map from request key to cached JSON document.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key` for `ttl_seconds`.
    ///
    /// A non-positive TTL is not an error; it stores an entry that is
    /// already expired, which `get` treats as absent.
    pub fn set(&self, key: &str, value: Value, ttl_seconds: i64) {
        self.set_until(key, value, Utc::now() + Duration::seconds(ttl_seconds));
    }

    fn set_until(&self, key: &str, value: Value, expires_at: DateTime<Utc>) {
        let mut entries = self.lock();
        entries.insert(key.to_string(), CacheEntry { value, expires_at });
    }

    /// Return the cached document for `key` if present and not expired.
    ///
    /// An expired entry found here is dropped on the way out.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if Utc::now() < entry.expires_at => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Remove all entries unconditionally.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Remove only entries whose expiry has passed.
    pub fn clean_expired(&self) {
        let now = Utc::now();
        self.lock().retain(|_, entry| now < entry.expires_at);
    }

    /// Number of physically stored entries, expired or not.
    pub fn entry_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        // A poisoned lock means a panic elsewhere; the map itself is
        // still usable, and `get` must not panic.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
