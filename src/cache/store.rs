//! Front cache storage.
//!
//! [`CacheBackend`] is the pluggable string store; [`MemoryBackend`] is the
//! bounded in-process implementation. [`FrontCache`] layers typed JSON
//! payloads, metrics and fail-open error handling on top of any backend.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::fronts::MAX_CACHE_TTL_SECS;

use super::config::CacheConfig;
use super::keys::CacheKey;
use super::lock::rw_write;

const SOURCE: &str = "cache::store";

/// Longest lifetime an entry can have, whatever TTL the caller asks for.
pub const MAX_ENTRY_TTL: Duration = Duration::from_secs(MAX_CACHE_TTL_SECS);

pub const METRIC_CACHE_HIT: &str = "frontpage_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "frontpage_cache_miss_total";
pub const METRIC_CACHE_ERROR: &str = "frontpage_cache_error_total";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("failed to encode cache payload")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode cache payload")]
    Decode(#[source] serde_json::Error),
}

#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Returns whether an entry was removed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Returns the number of entries removed.
    async fn delete_by_prefix(&self, prefix: &str) -> Result<usize, CacheError>;

    async fn clear(&self) -> Result<(), CacheError>;
}

struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process backend with LRU eviction and per-entry expiry.
pub struct MemoryBackend {
    entries: RwLock<LruCache<String, Entry>>,
}

impl MemoryBackend {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.capacity_non_zero())),
        }
    }

    pub fn len(&self) -> usize {
        rw_write(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        let expired = match entries.get(key) {
            None => return Ok(None),
            Some(entry) if entry.expires_at > Instant::now() => {
                return Ok(Some(entry.value.clone()));
            }
            Some(_) => true,
        };
        if expired {
            entries.pop(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let entry = Entry {
            value,
            expires_at: now.checked_add(ttl.min(MAX_ENTRY_TTL)).unwrap_or(now),
        };
        rw_write(&self.entries, SOURCE, "set").put(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(rw_write(&self.entries, SOURCE, "delete").pop(key).is_some())
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
        let mut entries = rw_write(&self.entries, SOURCE, "delete_by_prefix");
        let doomed: Vec<String> = entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            entries.pop(key);
        }
        Ok(doomed.len())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        rw_write(&self.entries, SOURCE, "clear").clear();
        Ok(())
    }
}

/// Typed, fail-open view over a [`CacheBackend`].
///
/// Backend and payload errors are logged and counted, then treated as a miss
/// (reads) or ignored (writes). Nothing here ever fails a caller.
pub struct FrontCache {
    config: CacheConfig,
    backend: Arc<dyn CacheBackend>,
}

impl FrontCache {
    pub fn new(config: CacheConfig, backend: Arc<dyn CacheBackend>) -> Self {
        Self { config, backend }
    }

    pub fn in_memory(config: CacheConfig) -> Self {
        let backend = Arc::new(MemoryBackend::new(&config));
        Self::new(config, backend)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let kind = key.kind().as_str();
        if !self.config.enabled {
            counter!(METRIC_CACHE_MISS, "kind" => kind).increment(1);
            return None;
        }

        let rendered = key.to_string();
        let raw = match self.backend.get(&rendered).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                counter!(METRIC_CACHE_MISS, "kind" => kind).increment(1);
                debug!(cache_key = %rendered, "Front cache miss");
                return None;
            }
            Err(err) => {
                self.record_error(&rendered, "get", &err);
                counter!(METRIC_CACHE_MISS, "kind" => kind).increment(1);
                return None;
            }
        };

        match serde_json::from_str(&raw).map_err(CacheError::Decode) {
            Ok(value) => {
                counter!(METRIC_CACHE_HIT, "kind" => kind).increment(1);
                debug!(cache_key = %rendered, "Front cache hit");
                Some(value)
            }
            Err(err) => {
                self.record_error(&rendered, "decode", &err);
                counter!(METRIC_CACHE_MISS, "kind" => kind).increment(1);
                if let Err(err) = self.backend.delete(&rendered).await {
                    self.record_error(&rendered, "delete", &err);
                }
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        if !self.config.enabled {
            return;
        }

        let rendered = key.to_string();
        let payload = match serde_json::to_string(value).map_err(CacheError::Encode) {
            Ok(payload) => payload,
            Err(err) => {
                self.record_error(&rendered, "encode", &err);
                return;
            }
        };

        if let Err(err) = self.backend.set(&rendered, payload, ttl).await {
            self.record_error(&rendered, "set", &err);
        }
    }

    pub async fn delete(&self, key: &CacheKey) -> bool {
        let rendered = key.to_string();
        match self.backend.delete(&rendered).await {
            Ok(removed) => removed,
            Err(err) => {
                self.record_error(&rendered, "delete", &err);
                false
            }
        }
    }

    pub async fn delete_by_prefix(&self, prefix: &str) -> usize {
        match self.backend.delete_by_prefix(prefix).await {
            Ok(removed) => {
                debug!(prefix, removed, "Front cache entries removed by prefix");
                removed
            }
            Err(err) => {
                self.record_error(prefix, "delete_by_prefix", &err);
                0
            }
        }
    }

    pub async fn clear(&self) {
        if let Err(err) = self.backend.clear().await {
            self.record_error("*", "clear", &err);
        }
    }

    fn record_error(&self, cache_key: &str, op: &'static str, err: &CacheError) {
        counter!(METRIC_CACHE_ERROR, "op" => op).increment(1);
        warn!(
            cache_key,
            op,
            error = %err,
            "Front cache backend failed; continuing without cache"
        );
    }
}
