//! Records exchanged with the content repository.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub const FLAG_FEATURED: &str = "featured";
pub const FLAG_BREAKING: &str = "breaking";
pub const FLAG_EXCLUSIVE: &str = "exclusive";
pub const FLAG_SPONSORED: &str = "sponsored";

/// A `(taxonomy, slug)` association carried by a content record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TermRef {
    pub taxonomy: String,
    pub slug: String,
}

impl TermRef {
    pub fn new(taxonomy: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            taxonomy: taxonomy.into(),
            slug: slug.into(),
        }
    }
}

/// Raw content entry as returned by a repository query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentRecord {
    pub id: String,
    pub kind: String,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub body: String,
    pub url: Option<String>,
    pub author: Option<String>,
    pub media_ref: Option<String>,
    pub published_at: OffsetDateTime,
    pub terms: Vec<TermRef>,
    pub flags: BTreeSet<String>,
}

impl ContentRecord {
    pub fn has_flag(&self, name: &str) -> bool {
        self.flags.contains(name)
    }

    pub fn has_term(&self, taxonomy: &str, slug: &str) -> bool {
        self.terms
            .iter()
            .any(|term| term.taxonomy == taxonomy && term.slug == slug)
    }
}

/// Taxonomy term (category, tag, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Term {
    pub id: String,
    pub taxonomy: String,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<String>,
    /// Explicit editorial ordering among siblings.
    pub order: i64,
    /// Number of published records attached to the term.
    pub count: u64,
}
