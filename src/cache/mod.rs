//! Front cache and invalidation.
//!
//! Regions are cached per front under `front:<id>:<kind>:<fingerprint>`, where
//! the fingerprint hashes the front's configuration; a config change therefore
//! moves a front onto fresh keys without an explicit version bump.
//!
//! Invalidation is event driven: writers publish through [`CacheTrigger`],
//! [`InvalidationConsumer`] merges the batch into an [`InvalidationPlan`] and
//! clears the affected fronts before the write returns.
//!
//! ```toml
//! [cache]
//! enabled = true
//! default_ttl_seconds = 300
//! capacity = 256
//! ```

mod config;
mod consumer;
mod events;
pub mod keys;
pub(crate) mod lock;
mod planner;
mod store;
mod trigger;

pub use config::CacheConfig;
pub use consumer::{
    InvalidationConsumer, METRIC_INVALIDATION_CONSUME_MS, METRIC_INVALIDATION_TOTAL,
};
pub use events::{Epoch, EventKind, EventQueue, InvalidationEvent};
pub use keys::{CacheKey, DataKind, fingerprint, front_prefix};
pub use planner::{ContentChange, InvalidationPlan};
pub use store::{
    CacheBackend, CacheError, FrontCache, METRIC_CACHE_ERROR, METRIC_CACHE_HIT,
    METRIC_CACHE_MISS, MemoryBackend,
};
pub use trigger::CacheTrigger;
