//! Content query criteria.
//!
//! [`QuerySpec`] is a pure value: it participates in front fingerprints and is
//! stored alongside every built region, so all of its maps and lists keep a
//! deterministic order.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use super::entities::{ContentRecord, Term};

pub const DEFAULT_CONTENT_KIND: &str = "post";
pub const DEFAULT_QUERY_LIMIT: u32 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOrder {
    #[default]
    NewestFirst,
    OldestFirst,
    Title,
}

impl QueryOrder {
    pub fn compare(self, left: &ContentRecord, right: &ContentRecord) -> Ordering {
        match self {
            QueryOrder::NewestFirst => right
                .published_at
                .cmp(&left.published_at)
                .then_with(|| left.id.cmp(&right.id)),
            QueryOrder::OldestFirst => left
                .published_at
                .cmp(&right.published_at)
                .then_with(|| left.id.cmp(&right.id)),
            QueryOrder::Title => left
                .title
                .to_lowercase()
                .cmp(&right.title.to_lowercase())
                .then_with(|| left.id.cmp(&right.id)),
        }
    }
}

/// A single predicate a record must satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryFilter {
    Term {
        taxonomy: String,
        slug: String,
    },
    Flag {
        name: String,
        #[serde(default = "default_flag_value")]
        value: bool,
    },
    /// Published window relative to the query instant, in whole days.
    Published {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        since_days: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        until_days: Option<u32>,
    },
}

fn default_flag_value() -> bool {
    true
}

impl QueryFilter {
    pub fn term(taxonomy: impl Into<String>, slug: impl Into<String>) -> Self {
        Self::Term {
            taxonomy: taxonomy.into(),
            slug: slug.into(),
        }
    }

    pub fn flag(name: impl Into<String>) -> Self {
        Self::Flag {
            name: name.into(),
            value: true,
        }
    }

    pub fn matches(&self, record: &ContentRecord, now: OffsetDateTime) -> bool {
        match self {
            QueryFilter::Term { taxonomy, slug } => record.has_term(taxonomy, slug),
            QueryFilter::Flag { name, value } => record.has_flag(name) == *value,
            QueryFilter::Published {
                since_days,
                until_days,
            } => {
                // A bound older than the earliest representable date admits
                // everything as a lower limit and nothing as an upper one.
                let after_lower = since_days.is_none_or(|days| {
                    days_before(now, days).is_none_or(|bound| record.published_at >= bound)
                });
                let before_upper = until_days.is_none_or(|days| {
                    days_before(now, days).is_some_and(|bound| record.published_at <= bound)
                });
                after_lower && before_upper
            }
        }
    }
}

fn days_before(now: OffsetDateTime, days: u32) -> Option<OffsetDateTime> {
    now.checked_sub(Duration::days(i64::from(days)))
}

/// Criteria for one region's content query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuerySpec {
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub order: QueryOrder,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<QueryFilter>,
}

fn default_kind() -> String {
    DEFAULT_CONTENT_KIND.to_string()
}

fn default_limit() -> u32 {
    DEFAULT_QUERY_LIMIT
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            limit: DEFAULT_QUERY_LIMIT,
            order: QueryOrder::default(),
            filters: Vec::new(),
        }
    }
}

impl QuerySpec {
    /// Newest-first query for `limit` records of the default kind.
    pub fn latest(limit: u32) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, filter: QueryFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_order(mut self, order: QueryOrder) -> Self {
        self.order = order;
        self
    }

    /// Add a term scope unless the same scope is already present.
    pub fn scoped_to(mut self, taxonomy: &str, slug: &str) -> Self {
        let scope = QueryFilter::term(taxonomy, slug);
        if !self.filters.contains(&scope) {
            self.filters.push(scope);
        }
        self
    }

    pub fn matches(&self, record: &ContentRecord, now: OffsetDateTime) -> bool {
        record.kind == self.kind && self.filters.iter().all(|filter| filter.matches(record, now))
    }
}

/// Sort key accepted by `child_terms`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermOrder {
    #[default]
    Order,
    Name,
    Count,
}

impl TermOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            TermOrder::Order => "order",
            TermOrder::Name => "name",
            TermOrder::Count => "count",
        }
    }

    pub fn compare(self, left: &Term, right: &Term) -> Ordering {
        match self {
            TermOrder::Order => left.order.cmp(&right.order),
            TermOrder::Name => left.name.to_lowercase().cmp(&right.name.to_lowercase()),
            TermOrder::Count => right.count.cmp(&left.count),
        }
        .then_with(|| left.slug.cmp(&right.slug))
    }
}
