//! Front cache configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_TTL_SECONDS: u64 = 300;
const DEFAULT_CAPACITY: usize = 256;
const DEFAULT_CONSUME_BATCH_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// When false every lookup misses and nothing is stored.
    pub enabled: bool,
    /// Region lifetime for fronts that do not configure their own.
    pub default_ttl_seconds: u64,
    /// Maximum entries held by the in-memory backend.
    pub capacity: usize,
    /// Maximum invalidation events merged into one plan.
    pub consume_batch_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl_seconds: DEFAULT_TTL_SECONDS,
            capacity: DEFAULT_CAPACITY,
            consume_batch_limit: DEFAULT_CONSUME_BATCH_LIMIT,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            default_ttl_seconds: settings.default_ttl_seconds,
            capacity: settings.capacity,
            ..Self::default()
        }
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds.max(1))
    }

    /// Capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.capacity).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn consume_batch_limit(&self) -> usize {
        self.consume_batch_limit.max(1)
    }
}
