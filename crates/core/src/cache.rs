//! Read-through, TTL-keyed result cache.
//!
//! Entries live in a [`KeyValueStore`] under the [`CACHE_NAMESPACE`] prefix,
//! one JSON document per key. An entry is written once and replaced
//! wholesale; expired entries are removed lazily when read, or in bulk by
//! [`ResultCache::clear_expired`].
//!
//! Store failures never reach the caller. They are logged and the cache
//! answers as if the key were missing, so a broken store only costs extra
//! upstream fetches.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use panelkit_core::cache::{CacheKind, ResultCache};
//! use panelkit_core::store::MemoryStore;
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let cache = ResultCache::new(Arc::new(MemoryStore::new()));
//! let params = json!({"source": "mangahaven", "page": 1});
//!
//! let value: Option<Vec<String>> = cache
//!     .wrap(&CacheKind::HotComics, &params, || async { Ok::<_, ()>(Some(vec!["a".to_string()])) })
//!     .await
//!     .unwrap();
//! assert_eq!(value, Some(vec!["a".to_string()]));
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{Duration, OffsetDateTime};

use crate::store::KeyValueStore;

/// Prefix of every key the cache owns.
pub const CACHE_NAMESPACE: &str = "panelkit:cache:";

/// Result type being cached; selects the time-to-live.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKind {
    HotComics,
    LatestComics,
    CategoryComics,
    Search,
    ComicDetail,
    Chapters,
    ChapterImages,
    Categories,
    /// Anything else; gets the short default TTL.
    Custom(String),
}

impl CacheKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::HotComics => "hot_comics",
            Self::LatestComics => "latest_comics",
            Self::CategoryComics => "category_comics",
            Self::Search => "search",
            Self::ComicDetail => "comic_detail",
            Self::Chapters => "chapters",
            Self::ChapterImages => "chapter_images",
            Self::Categories => "categories",
            Self::Custom(name) => name,
        }
    }

    /// Time-to-live for this kind.
    pub fn ttl(&self) -> Duration {
        match self {
            Self::HotComics | Self::LatestComics | Self::CategoryComics | Self::Search => Duration::minutes(5),
            Self::ComicDetail => Duration::minutes(30),
            Self::Chapters => Duration::minutes(15),
            Self::ChapterImages => Duration::hours(1),
            Self::Categories => Duration::hours(24),
            Self::Custom(_) => Duration::minutes(1),
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    pub fn new(start: OffsetDateTime) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        self.now.lock().map(|now| *now).unwrap_or_else(|_| OffsetDateTime::now_utc())
    }
}

fn unix_millis(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}

/// Stored form of one cached value. Timestamps are Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub key: String,
    pub value: T,
    pub created_at: i64,
    pub expire_at: i64,
}

/// Just the fields needed to judge freshness without knowing `T`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryHeader {
    expire_at: i64,
}

/// Totals from a full scan of the namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub total: usize,
    pub active: usize,
    pub expired: usize,
    pub size_bytes: usize,
    #[serde(rename = "sizeKB")]
    pub size_kb: f64,
    #[serde(rename = "sizeMB")]
    pub size_mb: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// TTL cache over a [`KeyValueStore`].
pub struct ResultCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl ResultCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Deterministic key for a kind and its parameters.
    ///
    /// `params` is serialized as-is, so callers must build it with a stable
    /// key order. `serde_json` objects without `preserve_order` are sorted,
    /// which satisfies this.
    pub fn build_key(kind: &CacheKind, params: &Value) -> String {
        format!("{}{}:{}", CACHE_NAMESPACE, kind.as_str(), params)
    }

    fn now_millis(&self) -> i64 {
        unix_millis(self.clock.now())
    }

    /// Cached value, or `None` on a miss, an expired entry or a store failure.
    pub async fn get<T: DeserializeOwned>(&self, kind: &CacheKind, params: &Value) -> Option<T> {
        let key = Self::build_key(kind, params);

        let raw = match self.store.get(&key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "discarding unreadable cache entry");
                self.remove_key(&key).await;
                return None;
            }
        };

        if self.now_millis() >= entry.expire_at {
            tracing::debug!(key = %key, "cache entry expired");
            self.remove_key(&key).await;
            return None;
        }

        tracing::debug!(key = %key, "cache hit");
        Some(entry.value)
    }

    /// Stores `value` for the kind's TTL. Returns whether it was written.
    pub async fn set<T: Serialize>(&self, kind: &CacheKind, params: &Value, value: &T) -> bool {
        let key = Self::build_key(kind, params);
        let now = self.clock.now();
        let entry = CacheEntry {
            key: key.clone(),
            value,
            created_at: unix_millis(now),
            expire_at: unix_millis(now + kind.ttl()),
        };

        let json = match serde_json::to_string(&entry) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache value not serializable, skipping");
                return false;
            }
        };

        match self.store.set(&key, json).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache write failed");
                false
            }
        }
    }

    pub async fn remove(&self, kind: &CacheKind, params: &Value) {
        self.remove_key(&Self::build_key(kind, params)).await;
    }

    async fn remove_key(&self, key: &str) {
        if let Err(e) = self.store.remove(key).await {
            tracing::warn!(key, error = %e, "cache delete failed");
        }
    }

    async fn namespaced_keys(&self) -> Vec<String> {
        match self.store.keys().await {
            Ok(keys) => keys.into_iter().filter(|k| k.starts_with(CACHE_NAMESPACE)).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "cache key scan failed");
                Vec::new()
            }
        }
    }

    /// Deletes every cache key. Returns how many were removed.
    pub async fn clear_all(&self) -> usize {
        let keys = self.namespaced_keys().await;
        if keys.is_empty() {
            return 0;
        }

        match self.store.remove_many(&keys).await {
            Ok(()) => {
                tracing::info!(count = keys.len(), "cache cleared");
                keys.len()
            }
            Err(e) => {
                tracing::warn!(error = %e, "cache clear failed");
                0
            }
        }
    }

    /// Deletes stale and unreadable entries. Returns how many were removed.
    pub async fn clear_expired(&self) -> usize {
        let now = self.now_millis();
        let mut stale = Vec::new();

        for key in self.namespaced_keys().await {
            if let Ok(Some(raw)) = self.store.get(&key).await
                && !Self::is_fresh(&raw, now)
            {
                stale.push(key);
            }
        }

        if stale.is_empty() {
            return 0;
        }

        match self.store.remove_many(&stale).await {
            Ok(()) => {
                tracing::info!(count = stale.len(), "expired cache entries removed");
                stale.len()
            }
            Err(e) => {
                tracing::warn!(error = %e, "expired cache cleanup failed");
                0
            }
        }
    }

    fn is_fresh(raw: &str, now: i64) -> bool {
        serde_json::from_str::<EntryHeader>(raw).is_ok_and(|header| now < header.expire_at)
    }

    /// Full scan of the namespace.
    pub async fn stats(&self) -> CacheStats {
        let now = self.now_millis();
        let mut stats = CacheStats::default();

        for key in self.namespaced_keys().await {
            let Ok(Some(raw)) = self.store.get(&key).await else {
                continue;
            };

            stats.total += 1;
            stats.size_bytes += raw.len();
            if Self::is_fresh(&raw, now) {
                stats.active += 1;
            } else {
                stats.expired += 1;
            }
        }

        stats.size_kb = round2(stats.size_bytes as f64 / 1024.0);
        stats.size_mb = round2(stats.size_bytes as f64 / (1024.0 * 1024.0));
        stats
    }

    /// Returns the cached value if fresh; otherwise runs `fetch`, stores a
    /// `Some` result and returns it.
    ///
    /// Errors from `fetch` are returned untouched and nothing is stored.
    /// Concurrent misses on one key each run their own `fetch`.
    pub async fn wrap<T, E, F, Fut>(&self, kind: &CacheKind, params: &Value, fetch: F) -> Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        if let Some(hit) = self.get(kind, params).await {
            return Ok(Some(hit));
        }

        let value = fetch().await?;
        if let Some(value) = &value {
            self.set(kind, params, value).await;
        }
        Ok(value)
    }
}
