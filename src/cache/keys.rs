//! Cache keys and configuration fingerprints.
//!
//! Keys have the shape `front:<front id>:<data kind>:<fingerprint>`. Front ids
//! are kebab-case, so the per-front prefix `front:<front id>:` never matches a
//! sibling front whose id merely starts with the same characters.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::warn;

const KEY_NAMESPACE: &str = "front";

/// What a cache entry holds for its front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    Regions,
}

impl DataKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DataKind::Regions => "regions",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    front_id: String,
    kind: DataKind,
    fingerprint: String,
}

impl CacheKey {
    pub fn new(front_id: impl Into<String>, kind: DataKind, fingerprint: impl Into<String>) -> Self {
        Self {
            front_id: front_id.into(),
            kind,
            fingerprint: fingerprint.into(),
        }
    }

    pub fn regions(front_id: impl Into<String>, fingerprint: impl Into<String>) -> Self {
        Self::new(front_id, DataKind::Regions, fingerprint)
    }

    pub fn front_id(&self) -> &str {
        &self.front_id
    }

    pub fn kind(&self) -> DataKind {
        self.kind
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}:{}",
            front_prefix(&self.front_id),
            self.kind.as_str(),
            self.fingerprint
        )
    }
}

/// Prefix shared by every entry belonging to `front_id`.
pub fn front_prefix(front_id: &str) -> String {
    format!("{KEY_NAMESPACE}:{front_id}:")
}

/// Lowercase hex SHA-256 of the canonical JSON encoding of `value`.
pub fn fingerprint<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let canonical = canonicalize(serde_json::to_value(value)?);
    let encoded = serde_json::to_vec(&canonical)?;
    let mut hasher = Sha256::new();
    hasher.update(&encoded);
    Ok(hex::encode(hasher.finalize()))
}

/// Fingerprint that never fails: falls back to hashing the debug rendering.
pub fn fingerprint_or_debug<T: Serialize + fmt::Debug>(value: &T) -> String {
    fingerprint(value).unwrap_or_else(|err| {
        warn!(error = %err, "Falling back to debug fingerprint");
        let mut hasher = Sha256::new();
        hasher.update(format!("{value:?}").as_bytes());
        hex::encode(hasher.finalize())
    })
}

/// Rebuild every object with keys in sorted order, regardless of how the
/// underlying map type orders insertion.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|left, right| left.0.cmp(&right.0));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(key, value)| (key, canonicalize(value)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}
