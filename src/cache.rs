//! Tag-scoped, TTL'd in-process cache for list reads.
//!
//! Every entry for a resource shares one invalidation tag; a mutation
//! flushes the whole tag instead of enumerating keys. Lookups are plain
//! get-or-compute: concurrent misses on the same key may each recompute
//! independently, which is accepted in exchange for zero coordination.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Invalidation tag shared by every cached task listing.
pub const TASK_LIST_TAG: &str = "tasks";

/// Cached list entries live for ten minutes unless flushed first.
pub const LIST_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

struct CachedEntry {
    stored_at: Instant,
    value: Value,
}

pub struct ListCache {
    ttl: Duration,
    tags: RwLock<HashMap<&'static str, HashMap<String, CachedEntry>>>,
}

impl ListCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            tags: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, tag: &'static str, key: &str) -> Option<Value> {
        let tags = self.tags.read().expect("list cache lock poisoned");
        let entry = tags.get(tag)?.get(key)?;

        if entry.stored_at.elapsed() >= self.ttl {
            return None;
        }

        Some(entry.value.clone())
    }

    pub fn insert(&self, tag: &'static str, key: String, value: Value) {
        let mut tags = self.tags.write().expect("list cache lock poisoned");
        tags.entry(tag).or_default().insert(
            key,
            CachedEntry {
                stored_at: Instant::now(),
                value,
            },
        );
    }

    /// Drop every entry under the tag. Mutations call this after a
    /// successful persist.
    pub fn flush(&self, tag: &'static str) {
        let mut tags = self.tags.write().expect("list cache lock poisoned");
        if tags.remove(tag).is_some() {
            tracing::debug!(tag, "list cache flushed");
        }
    }
}

impl Default for ListCache {
    fn default() -> Self {
        Self::new(LIST_CACHE_TTL)
    }
}
