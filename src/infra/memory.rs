//! Process-local content repository.
//!
//! Backs the CLI and the integration tests. Term counts are derived from the
//! stored records at read time, so they never drift from the content.

use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{ContentRepository, QueryResult, RepoError};
use crate::cache::lock::{rw_read, rw_write};
use crate::domain::entities::{ContentRecord, Term};
use crate::domain::query::{QuerySpec, TermOrder};

const SOURCE: &str = "infra::memory";

#[derive(Default)]
pub struct InMemoryContentRepository {
    records: RwLock<BTreeMap<String, ContentRecord>>,
    terms: RwLock<BTreeMap<String, Term>>,
    unavailable: AtomicBool,
    pinned_now: Option<OffsetDateTime>,
}

impl InMemoryContentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate relative publication windows against `now` instead of the wall clock.
    pub fn pinned_at(mut self, now: OffsetDateTime) -> Self {
        self.pinned_now = Some(now);
        self
    }

    pub fn with_records(self, records: impl IntoIterator<Item = ContentRecord>) -> Self {
        for record in records {
            self.upsert_record(record);
        }
        self
    }

    pub fn with_terms(self, terms: impl IntoIterator<Item = Term>) -> Self {
        for term in terms {
            self.upsert_term(term);
        }
        self
    }

    /// Insert or replace a record, returning the previous version.
    pub fn upsert_record(&self, record: ContentRecord) -> Option<ContentRecord> {
        rw_write(&self.records, SOURCE, "upsert_record").insert(record.id.clone(), record)
    }

    pub fn remove_record(&self, id: &str) -> Option<ContentRecord> {
        rw_write(&self.records, SOURCE, "remove_record").remove(id)
    }

    pub fn upsert_term(&self, term: Term) -> Option<Term> {
        rw_write(&self.terms, SOURCE, "upsert_term").insert(term.id.clone(), term)
    }

    pub fn record(&self, id: &str) -> Option<ContentRecord> {
        rw_read(&self.records, SOURCE, "record").get(id).cloned()
    }

    pub fn record_count(&self) -> usize {
        rw_read(&self.records, SOURCE, "record_count").len()
    }

    /// Simulate an outage: every read fails with [`RepoError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), RepoError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepoError::Unavailable(
                "in-memory repository switched off".to_string(),
            ));
        }
        Ok(())
    }

    fn now(&self) -> OffsetDateTime {
        self.pinned_now.unwrap_or_else(OffsetDateTime::now_utc)
    }

    fn with_live_count(&self, mut term: Term) -> Term {
        let records = rw_read(&self.records, SOURCE, "term_count");
        term.count = records
            .values()
            .filter(|record| record.has_term(&term.taxonomy, &term.slug))
            .count() as u64;
        term
    }
}

#[async_trait]
impl ContentRepository for InMemoryContentRepository {
    async fn query(&self, spec: &QuerySpec) -> Result<QueryResult, RepoError> {
        self.ensure_available()?;
        let now = self.now();

        let mut records: Vec<ContentRecord> = rw_read(&self.records, SOURCE, "query")
            .values()
            .filter(|record| spec.matches(record, now))
            .cloned()
            .collect();
        records.sort_by(|left, right| spec.order.compare(left, right));

        let found = records.len() as u64;
        records.truncate(spec.limit as usize);
        Ok(QueryResult { records, found })
    }

    async fn resolve_term(&self, taxonomy: &str, slug: &str) -> Result<Option<Term>, RepoError> {
        self.ensure_available()?;
        let term = rw_read(&self.terms, SOURCE, "resolve_term")
            .values()
            .find(|term| term.taxonomy == taxonomy && term.slug == slug)
            .cloned();
        Ok(term.map(|term| self.with_live_count(term)))
    }

    async fn child_terms(
        &self,
        parent_term_id: &str,
        order: TermOrder,
    ) -> Result<Vec<Term>, RepoError> {
        self.ensure_available()?;
        let children: Vec<Term> = rw_read(&self.terms, SOURCE, "child_terms")
            .values()
            .filter(|term| term.parent_id.as_deref() == Some(parent_term_id))
            .cloned()
            .collect();

        let mut children: Vec<Term> = children
            .into_iter()
            .map(|term| self.with_live_count(term))
            .collect();
        children.sort_by(|left, right| order.compare(left, right));
        Ok(children)
    }
}
