// SPDX-License-Identifier: MIT OR Apache-2.0
//! The fetch cache (spec §4.7, C7): memoizes `(alias, path) -> Value`
//! for the lifetime of one compile run.

use nomos_core::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Build the cache key for `alias`/`path`, exactly `alias + ":" + join(path, "/")`.
#[must_use]
pub fn cache_key(alias: &str, path: &[String]) -> String {
    format!("{alias}:{}", path.join("/"))
}

/// Thread-safe memoization of fetched, fully-resolved values.
///
/// Single-flight deduplication is intentionally not implemented: per
/// spec §4.7 two concurrent misses on the same key may both Fetch.
/// Callers must not rely on at-most-once Fetch semantics per key.
#[derive(Default)]
pub struct FetchCache {
    entries: RwLock<HashMap<String, Value>>,
}

impl FetchCache {
    /// An empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cached value.
    pub async fn get(&self, alias: &str, path: &[String]) -> Option<Value> {
        let key = cache_key(alias, path);
        self.entries.read().await.get(&key).cloned()
    }

    /// Store a fully-resolved value.
    pub async fn set(&self, alias: &str, path: &[String], value: Value) {
        let key = cache_key(alias, path);
        self.entries.write().await.insert(key, value);
    }

    /// Number of cached entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// `true` if the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
