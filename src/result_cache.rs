//! Optional result caching for read operations.
//!
//! A read that is given a cache key first looks the key up in the session's
//! [`ResultCache`]. On a hit the cached rows are returned without touching
//! the connection; on a miss the rows are read and stored with the call's
//! expiration. Values are stored type-erased and recovered by downcasting,
//! so a key reused for a different row type is treated as a miss.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// A type-erased cached value.
pub type CachedValue = Arc<dyn Any + Send + Sync>;

/// Get/set/expire store for read results.
pub trait ResultCache: Send + Sync {
    /// Returns the live value stored under `key`.
    fn get(&self, key: &str) -> Option<CachedValue>;

    /// Stores `value` under `key` for `expiration`.
    fn set(&self, key: &str, value: CachedValue, expiration: Duration);

    /// Removes `key`.
    fn remove(&self, key: &str);

    /// Removes every entry.
    fn clear(&self);
}

#[derive(Clone)]
struct Entry {
    value: CachedValue,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-process [`ResultCache`] with per-entry expiration.
///
/// Expired entries are dropped lazily when read, and in bulk by
/// [`purge_expired`](Self::purge_expired).
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drops every expired entry and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }
}

impl ResultCache for MemoryCache {
    fn get(&self, key: &str) -> Option<CachedValue> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => return Some(Arc::clone(&entry.value)),
                Some(_) => {}
                None => return None,
            }
        }
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
            tracing::trace!(key, "result cache entry expired");
        }
        None
    }

    fn set(&self, key: &str, value: CachedValue, expiration: Duration) {
        let expires_at = Instant::now() + expiration;
        self.entries
            .write()
            .insert(key.to_string(), Entry { value, expires_at });
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }

    fn clear(&self) {
        self.entries.write().clear();
    }
}

/// Reads a typed value from `cache`. A value of another type is a miss.
pub fn get_typed<T: Any + Send + Sync>(cache: &dyn ResultCache, key: &str) -> Option<Arc<T>> {
    cache.get(key).and_then(|value| value.downcast::<T>().ok())
}
