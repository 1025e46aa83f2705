//! Invalidation plan generation.
//!
//! Merges a batch of events into the set of changes fronts must be checked
//! against. A settings write supersedes everything else in the batch.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use crate::domain::entities::TermRef;

use super::events::{EventKind, InvalidationEvent};

/// A content-side change a front may depend on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentChange {
    /// Records changed. An empty `terms` set means the affected terms are
    /// unknown, so every front must treat the change as relevant.
    Records { terms: BTreeSet<TermRef> },
    Term(TermRef),
}

impl ContentChange {
    /// Whether the change carries no term information at all.
    pub fn is_unscoped(&self) -> bool {
        matches!(self, ContentChange::Records { terms } if terms.is_empty())
    }

    /// Whether the change touches `(taxonomy, slug)` directly.
    pub fn touches_term(&self, taxonomy: &str, slug: &str) -> bool {
        match self {
            ContentChange::Records { terms } => terms
                .iter()
                .any(|term| term.taxonomy == taxonomy && term.slug == slug),
            ContentChange::Term(term) => term.taxonomy == taxonomy && term.slug == slug,
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct InvalidationPlan {
    /// Clear every front and drop resolved instances so config is re-read.
    pub reload_settings: bool,
    pub changes: Vec<ContentChange>,
    /// Content ids mentioned by the batch, for observability.
    pub content_ids: BTreeSet<String>,
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InvalidationPlan {{ reload_settings: {}, changes: {}, content_ids: {} }}",
            self.reload_settings,
            self.changes.len(),
            self.content_ids.len(),
        )
    }
}

impl InvalidationPlan {
    pub fn from_events(events: Vec<InvalidationEvent>) -> Self {
        let mut plan = Self::default();
        let mut seen_epochs = HashSet::new();

        // Terms touched per record, merged across every event for that record
        // so a record that moved between sections invalidates both.
        let mut record_terms: BTreeMap<String, (bool, BTreeSet<TermRef>)> = BTreeMap::new();
        let mut changed_terms: BTreeSet<TermRef> = BTreeSet::new();

        for event in events.into_iter().filter(|e| seen_epochs.insert(e.epoch)) {
            match event.kind {
                EventKind::SettingsUpdated => plan.reload_settings = true,
                EventKind::ContentUpserted { content_id, terms }
                | EventKind::ContentDeleted { content_id, terms } => {
                    let entry = record_terms.entry(content_id).or_default();
                    if terms.is_empty() {
                        entry.0 = true;
                    }
                    entry.1.extend(terms);
                }
                EventKind::TermChanged { taxonomy, slug } => {
                    changed_terms.insert(TermRef::new(taxonomy, slug));
                }
            }
        }

        plan.content_ids = record_terms.keys().cloned().collect();
        if plan.reload_settings {
            return plan;
        }

        let unscoped = record_terms.values().any(|(unscoped, _)| *unscoped);
        if unscoped {
            plan.changes.push(ContentChange::Records {
                terms: BTreeSet::new(),
            });
        } else if !record_terms.is_empty() {
            let terms = record_terms
                .into_values()
                .flat_map(|(_, terms)| terms)
                .collect();
            plan.changes.push(ContentChange::Records { terms });
        }
        plan.changes
            .extend(changed_terms.into_iter().map(ContentChange::Term));

        plan
    }

    pub fn is_empty(&self) -> bool {
        !self.reload_settings && self.changes.is_empty()
    }
}
