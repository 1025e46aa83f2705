#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use frontpage::application::conditions::ConditionEvaluator;
use frontpage::application::front::FrontServices;
use frontpage::application::manager::FrontManager;
use frontpage::application::placements::PlacementRegistry;
use frontpage::application::repos::{ContentRepository, QueryResult, RepoError};
use frontpage::cache::{CacheConfig, CacheTrigger, EventQueue, FrontCache, InvalidationConsumer};
use frontpage::domain::entities::{ContentRecord, Term, TermRef};
use frontpage::domain::query::{QuerySpec, TermOrder};
use frontpage::infra::memory::InMemoryContentRepository;
use frontpage::infra::settings::InMemorySettingsStore;
use time::OffsetDateTime;
use time::macros::datetime;

pub const NOW: OffsetDateTime = datetime!(2026-03-10 12:00 UTC);

/// Counts content queries so tests can tell cache hits from rebuilds.
pub struct CountingRepository {
    pub inner: Arc<InMemoryContentRepository>,
    queries: AtomicUsize,
}

impl CountingRepository {
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentRepository for CountingRepository {
    async fn query(&self, spec: &QuerySpec) -> Result<QueryResult, RepoError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query(spec).await
    }

    async fn resolve_term(&self, taxonomy: &str, slug: &str) -> Result<Option<Term>, RepoError> {
        self.inner.resolve_term(taxonomy, slug).await
    }

    async fn child_terms(
        &self,
        parent_term_id: &str,
        order: TermOrder,
    ) -> Result<Vec<Term>, RepoError> {
        self.inner.child_terms(parent_term_id, order).await
    }
}

pub struct Harness {
    pub repository: Arc<CountingRepository>,
    pub store: Arc<InMemorySettingsStore>,
    pub manager: Arc<FrontManager>,
    pub trigger: CacheTrigger,
    pub queue: Arc<EventQueue>,
    pub cache: Arc<FrontCache>,
}

pub fn harness(fronts_toml: &str, records: Vec<ContentRecord>) -> Harness {
    harness_with_cache(fronts_toml, records, CacheConfig::default())
}

pub fn harness_with_cache(
    fronts_toml: &str,
    records: Vec<ContentRecord>,
    cache_config: CacheConfig,
) -> Harness {
    let repository = counting_repository(records);
    let store = Arc::new(InMemorySettingsStore::from_toml_str(fronts_toml).expect("fronts toml"));
    let cache = Arc::new(FrontCache::in_memory(cache_config.clone()));
    let services = front_services(repository.clone(), cache.clone());

    let manager = Arc::new(FrontManager::new(store.clone(), services));
    manager.watch_settings();

    let queue = Arc::new(EventQueue::new());
    let consumer = Arc::new(InvalidationConsumer::new(
        cache_config,
        queue.clone(),
        manager.clone(),
    ));
    let trigger = CacheTrigger::new(queue.clone(), consumer);

    Harness {
        repository,
        store,
        manager,
        trigger,
        queue,
        cache,
    }
}

pub fn counting_repository(records: Vec<ContentRecord>) -> Arc<CountingRepository> {
    let inner = Arc::new(
        InMemoryContentRepository::new()
            .pinned_at(NOW)
            .with_terms(terms())
            .with_records(records),
    );
    Arc::new(CountingRepository {
        inner,
        queries: AtomicUsize::new(0),
    })
}

pub fn front_services(
    repository: Arc<CountingRepository>,
    cache: Arc<FrontCache>,
) -> Arc<FrontServices> {
    let evaluator = Arc::new(ConditionEvaluator::default());
    let placements = Arc::new(PlacementRegistry::with_builtin_slots(evaluator));
    Arc::new(FrontServices::new(repository, cache, placements))
}

pub fn terms() -> Vec<Term> {
    vec![
        term("1", "news", None, 0),
        term("2", "world", Some("1"), 1),
        term("3", "sport", Some("1"), 2),
        term("4", "europe", Some("2"), 1),
        term("5", "asia", Some("2"), 2),
        term("6", "africa", Some("2"), 3),
    ]
}

fn term(id: &str, slug: &str, parent: Option<&str>, order: i64) -> Term {
    Term {
        id: id.to_string(),
        taxonomy: "category".to_string(),
        slug: slug.to_string(),
        name: format!("{}{}", slug[..1].to_uppercase(), &slug[1..]),
        description: None,
        parent_id: parent.map(str::to_string),
        order,
        count: 0,
    }
}

pub fn record(id: &str, day: u8, sections: &[&str], flags: &[&str]) -> ContentRecord {
    let published_at = datetime!(2026-03-01 08:00 UTC) + time::Duration::days(i64::from(day));
    ContentRecord {
        id: id.to_string(),
        kind: "post".to_string(),
        slug: format!("story-{id}"),
        title: format!("Story {id}"),
        excerpt: format!("Excerpt for {id}"),
        body: String::new(),
        url: None,
        author: Some("Desk".to_string()),
        media_ref: None,
        published_at,
        terms: sections
            .iter()
            .map(|section| TermRef::new("category", *section))
            .collect(),
        flags: flags.iter().map(|flag| flag.to_string()).collect::<BTreeSet<_>>(),
    }
}

pub const FRONTS: &str = r#"
    [fronts.home]
    type = "home"

    [fronts.home.placements.hero-top]

    [fronts.home.placements.rail-inline]
    priority = 5

    [fronts.world]
    type = "section"
    term = "world"

    [fronts.sport]
    type = "section"
    term = "sport"
"#;
