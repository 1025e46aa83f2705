//! Front configuration as stored in the settings store.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::query::QuerySpec;
use super::slug::validate_identifier;

pub const DEFAULT_TAXONOMY: &str = "category";

/// Upper bound for any front cache TTL: one year.
pub const MAX_CACHE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Per-front attachment of a registered placement slot.
///
/// Absent fields fall back to the slot's registered definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

/// Configuration for a single front. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontConfig {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Term slug a section front is scoped to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    #[serde(default = "default_taxonomy")]
    pub taxonomy: String,
    #[serde(default, rename = "regions")]
    pub region_specs: BTreeMap<String, QuerySpec>,
    #[serde(default, rename = "placements")]
    pub placement_refs: BTreeMap<String, PlacementRef>,
    /// Region cache lifetime in seconds; the cache default applies when unset.
    #[serde(default, rename = "cache_ttl", skip_serializing_if = "Option::is_none")]
    pub cache_ttl_secs: Option<u64>,
}

fn default_taxonomy() -> String {
    DEFAULT_TAXONOMY.to_string()
}

impl FrontConfig {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            term: None,
            taxonomy: default_taxonomy(),
            region_specs: BTreeMap::new(),
            placement_refs: BTreeMap::new(),
            cache_ttl_secs: None,
        }
    }

    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        self.term = Some(term.into());
        self
    }

    pub fn with_taxonomy(mut self, taxonomy: impl Into<String>) -> Self {
        self.taxonomy = taxonomy.into();
        self
    }

    pub fn with_region_spec(mut self, region: impl Into<String>, spec: QuerySpec) -> Self {
        self.region_specs.insert(region.into(), spec);
        self
    }

    pub fn with_placement(mut self, slot_id: impl Into<String>, placement: PlacementRef) -> Self {
        self.placement_refs.insert(slot_id.into(), placement);
        self
    }

    pub fn with_cache_ttl(mut self, seconds: u64) -> Self {
        self.cache_ttl_secs = Some(seconds);
        self
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_secs.map(Duration::from_secs)
    }

    /// Query for `region`: the configured override when present, otherwise `default`.
    pub fn region_spec_or(&self, region: &str, default: QuerySpec) -> QuerySpec {
        self.region_specs.get(region).cloned().unwrap_or(default)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        validate_identifier("front.id", &self.id)?;
        if self.kind.trim().is_empty() {
            return Err(DomainError::validation("front.type", "must not be empty"));
        }
        for region in self.region_specs.keys() {
            validate_identifier("front.regions", region)?;
        }
        for (slot_id, placement) in &self.placement_refs {
            validate_identifier("front.placements", slot_id)?;
            if let Some(region) = placement.region.as_deref() {
                validate_identifier("front.placements.region", region)?;
            }
        }
        match self.cache_ttl_secs {
            Some(0) => Err(DomainError::validation(
                "front.cache_ttl",
                "must be greater than zero",
            )),
            Some(secs) if secs > MAX_CACHE_TTL_SECS => Err(DomainError::validation(
                "front.cache_ttl",
                format!("must be at most {MAX_CACHE_TTL_SECS} seconds"),
            )),
            _ => Ok(()),
        }
    }
}
