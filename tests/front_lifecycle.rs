//! End-to-end front behaviour: composition, caching and invalidation.

mod support;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use async_trait::async_trait;
use frontpage::application::conditions::{DeviceClass, RequestContext, TIME_MORNING};
use frontpage::application::front::{BuildContext, FrontStrategy, query_regions};
use frontpage::application::manager::FrontManager;
use frontpage::application::placements::SlotDefinition;
use frontpage::application::repos::{ConfigListener, RepoError, SettingsStore};
use frontpage::cache::{CacheConfig, ContentChange, EventKind, FrontCache};
use frontpage::domain::fronts::{FrontConfig, MAX_CACHE_TTL_SECS, PlacementRef};
use frontpage::domain::items::{Region, RegionMap};
use frontpage::domain::query::QuerySpec;
use frontpage::infra::settings::InMemorySettingsStore;
use time::macros::datetime;

use support::{
    FRONTS, counting_repository, front_services, harness, harness_with_cache, record,
};

fn newsroom() -> Vec<frontpage::domain::entities::ContentRecord> {
    vec![
        record("a", 1, &["world", "europe"], &["featured"]),
        record("b", 2, &["world"], &[]),
        record("c", 3, &["sport"], &[]),
        record("d", 4, &["europe"], &[]),
        record("e", 5, &["asia"], &[]),
    ]
}

fn ids(regions: &RegionMap, name: &str) -> Vec<String> {
    regions[name].items.iter().map(|item| item.id.clone()).collect()
}

#[tokio::test]
async fn home_front_composes_default_regions() {
    let h = harness(FRONTS, newsroom());
    let home = h.manager.get_front("home").await.expect("home configured");
    assert_eq!(home.kind(), "home");

    let regions = home.get_regions().await;
    assert_eq!(regions.len(), 3);
    assert_eq!(ids(&regions, "hero"), vec!["a"]);
    assert_eq!(ids(&regions, "rails"), vec!["e", "d", "c", "b", "a"]);
    assert_eq!(ids(&regions, "sidebar"), vec!["e", "d", "c", "b"]);
    assert_eq!(regions["sidebar"].found_count, 5);
    assert_eq!(regions["hero"].found_count, 1);
}

#[tokio::test]
async fn section_front_scopes_regions_and_lists_populated_subsections() {
    let h = harness(FRONTS, newsroom());
    let world = h.manager.get_front("world").await.expect("world configured");

    let regions = world.get_regions().await;
    assert_eq!(ids(&regions, "hero"), vec!["a"]);
    assert_eq!(ids(&regions, "rails"), vec!["b", "a"]);

    let subsections = &regions["subsections"];
    let titles: Vec<&str> = subsections
        .items
        .iter()
        .map(|item| item.title.as_str())
        .collect();
    assert_eq!(titles, vec!["Europe", "Asia"]);
    assert_eq!(subsections.found_count, 2);
    assert_eq!(subsections.items[0].url, "/category/europe");
}

#[tokio::test]
async fn repeated_reads_are_served_from_cache() {
    let h = harness(FRONTS, newsroom());
    let home = h.manager.get_front("home").await.expect("home configured");

    let first = home.get_regions().await;
    let after_first = h.repository.queries();
    let second = home.get_regions().await;

    assert_eq!(first, second);
    assert_eq!(after_first, 3);
    assert_eq!(h.repository.queries(), after_first);
}

#[tokio::test]
async fn untriggered_write_stays_hidden_until_caches_are_cleared() {
    let h = harness("[fronts.home]\ntype = \"home\"\ncache_ttl = 300\n", Vec::new());
    let home = h.manager.get_front("home").await.expect("home configured");

    let empty = home.get_regions().await;
    assert!(empty["hero"].items.is_empty());
    assert!(empty["rails"].items.is_empty());

    h.repository
        .inner
        .upsert_record(record("a", 1, &["world"], &["featured"]));
    assert_eq!(home.get_regions().await, empty);

    h.manager.clear_all_caches().await;
    let home = h.manager.get_front("home").await.expect("home configured");
    assert_eq!(ids(&home.get_regions().await, "hero"), vec!["a"]);
}

#[tokio::test]
async fn disabled_cache_rebuilds_every_time() {
    let config = CacheConfig {
        enabled: false,
        ..CacheConfig::default()
    };
    let h = harness_with_cache(FRONTS, newsroom(), config);
    let home = h.manager.get_front("home").await.expect("home configured");

    let first = home.get_regions().await;
    let second = home.get_regions().await;
    assert_eq!(first, second);
    assert_eq!(h.repository.queries(), 6);
}

#[tokio::test]
async fn content_write_clears_only_affected_fronts() {
    let h = harness(FRONTS, newsroom());
    for id in ["home", "world", "sport"] {
        h.manager
            .get_front(id)
            .await
            .expect("front configured")
            .get_regions()
            .await;
    }
    let warmed = h.repository.queries();
    assert_eq!(warmed, 9);

    let fresh = record("f", 6, &["world"], &[]);
    h.repository.inner.upsert_record(fresh.clone());
    h.trigger.content_upserted(&fresh.id, fresh.terms.clone()).await;

    let sport = h.manager.get_front("sport").await.expect("sport configured");
    sport.get_regions().await;
    assert_eq!(h.repository.queries(), warmed, "sport served from cache");

    let home = h.manager.get_front("home").await.expect("home configured");
    let regions = home.get_regions().await;
    assert_eq!(ids(&regions, "rails")[0], "f");
    assert_eq!(h.repository.queries(), warmed + 3);

    let world = h.manager.get_front("world").await.expect("world configured");
    let regions = world.get_regions().await;
    assert_eq!(ids(&regions, "rails"), vec!["f", "b", "a"]);
}

#[tokio::test]
async fn settings_write_moves_front_to_new_fingerprint() {
    let h = harness(FRONTS, newsroom());
    let before = h.manager.get_front("home").await.expect("home configured");
    before.get_regions().await;
    let old_key = before.cache_key();
    assert!(h.cache.get::<RegionMap>(&old_key).await.is_some());

    h.store
        .upsert_front(FrontConfig::new("home", "home").with_cache_ttl(60))
        .await;

    assert!(h.cache.get::<RegionMap>(&old_key).await.is_none());
    let after = h.manager.get_front("home").await.expect("home configured");
    assert_ne!(before.fingerprint(), after.fingerprint());
    assert_eq!(after.cache_ttl(), std::time::Duration::from_secs(60));
}

#[tokio::test]
async fn unresolved_section_term_serves_no_regions() {
    let h = harness(FRONTS, newsroom());
    h.store
        .upsert_front(FrontConfig::new("ghost", "section").with_term("missing"))
        .await;

    let ghost = h.manager.get_front("ghost").await.expect("ghost configured");
    assert!(ghost.get_regions().await.is_empty());
    let projection = ghost.to_projection().await;
    assert_eq!(projection.kind, "section");
    assert!(projection.regions.is_empty());
}

#[tokio::test]
async fn unknown_and_invalid_fronts_do_not_resolve() {
    let h = harness(FRONTS, newsroom());
    assert!(h.manager.get_front("missing").await.is_none());

    h.store
        .upsert_front(FrontConfig::new("gallery", "carousel"))
        .await;
    assert!(h.manager.get_front("gallery").await.is_none());

    h.store
        .upsert_front(FrontConfig::new("brief", "home").with_cache_ttl(0))
        .await;
    assert!(h.manager.get_front("brief").await.is_none());

    h.store
        .upsert_front(FrontConfig::new("archive", "home").with_cache_ttl(MAX_CACHE_TTL_SECS + 1))
        .await;
    assert!(h.manager.get_front("archive").await.is_none());

    let listed: Vec<String> = h
        .manager
        .get_all_fronts()
        .await
        .iter()
        .map(|front| front.id().to_string())
        .collect();
    assert_eq!(listed, vec!["home", "sport", "world"]);
    assert!(h.manager.get_front("archive").await.is_none());
}

#[tokio::test]
async fn repository_outage_degrades_to_empty_regions() {
    let h = harness(FRONTS, newsroom());
    h.repository.inner.set_unavailable(true);

    let home = h.manager.get_front("home").await.expect("home configured");
    let regions = home.get_regions().await;
    assert_eq!(regions.len(), 3);
    assert!(regions.values().all(|region| region.is_empty()));
    assert_eq!(regions["rails"].found_count, 0);

    let world = h.manager.get_front("world").await.expect("world configured");
    assert!(world.get_regions().await.is_empty());
}

#[tokio::test]
async fn render_region_overlays_attached_placements() {
    let h = harness(FRONTS, newsroom());
    let home = h.manager.get_front("home").await.expect("home configured");
    let ctx = RequestContext::new(DeviceClass::Desktop);

    let hero = home.render_region("hero", &ctx).await;
    assert!(hero.contains("Story a"));
    assert!(hero.contains(r#"data-slot-id="hero-top""#));
    assert!(!hero.contains(r#"data-slot-id="rail-inline""#));

    let rails = home.render_region("rails", &ctx).await;
    assert!(rails.contains(r#"data-slot-id="rail-inline""#));

    assert_eq!(home.render_region("opinion", &ctx).await, "");
}

#[tokio::test]
async fn conditional_slot_follows_time_of_day() {
    let h = harness(FRONTS, newsroom());
    h.manager
        .services()
        .placements
        .register(
            SlotDefinition::new("morning-promo", "hero", 20)
                .with_description("Morning briefing signup")
                .with_condition(TIME_MORNING),
        )
        .expect("valid slot");
    h.store
        .upsert_front(
            FrontConfig::new("home", "home").with_placement("morning-promo", PlacementRef::default()),
        )
        .await;

    let home = h.manager.get_front("home").await.expect("home configured");
    let morning = RequestContext::new(DeviceClass::Mobile).at(datetime!(2026-03-10 08:00 UTC));
    let evening = RequestContext::new(DeviceClass::Mobile).at(datetime!(2026-03-10 20:00 UTC));

    assert!(
        home.render_region("hero", &morning)
            .await
            .contains("Morning briefing signup")
    );
    assert!(
        !home
            .render_region("hero", &evening)
            .await
            .contains("Morning briefing signup")
    );
}

#[tokio::test]
async fn projection_lists_placements_in_render_order() {
    let h = harness(FRONTS, newsroom());
    let home = h.manager.get_front("home").await.expect("home configured");

    let projection = home.to_projection().await;
    let slots: Vec<&str> = projection
        .placements
        .iter()
        .map(|placement| placement.id.as_str())
        .collect();
    assert_eq!(slots, vec!["rail-inline", "hero-top"]);
    assert_eq!(projection.placements_for("rails").count(), 1);
    assert_eq!(projection.regions["hero"].items[0].id, "a");
}

#[tokio::test]
async fn oversized_default_ttl_still_caches() {
    let config = CacheConfig {
        default_ttl_seconds: u64::MAX,
        ..CacheConfig::default()
    };
    let h = harness_with_cache(FRONTS, newsroom(), config);
    let home = h.manager.get_front("home").await.expect("home configured");

    let first = home.get_regions().await;
    let after_first = h.repository.queries();
    assert_eq!(home.get_regions().await, first);
    assert_eq!(h.repository.queries(), after_first);
}

#[tokio::test]
async fn consuming_write_drains_every_batch_queued_before_it() {
    let config = CacheConfig {
        consume_batch_limit: 1,
        ..CacheConfig::default()
    };
    let h = harness_with_cache(FRONTS, newsroom(), config);
    let home = h.manager.get_front("home").await.expect("home configured");
    home.get_regions().await;

    h.trigger
        .trigger(
            EventKind::TermChanged {
                taxonomy: "category".to_string(),
                slug: "asia".to_string(),
            },
            false,
        )
        .await;
    assert_eq!(h.queue.len(), 1);

    let fresh = record("f", 6, &["world"], &[]);
    h.repository.inner.upsert_record(fresh.clone());
    h.trigger.content_upserted(&fresh.id, fresh.terms.clone()).await;

    assert!(h.queue.is_empty());
    let home = h.manager.get_front("home").await.expect("home configured");
    assert_eq!(ids(&home.get_regions().await, "rails")[0], "f");
}

#[tokio::test]
async fn post_processor_shapes_regions_before_they_are_cached() {
    let h = harness(FRONTS, newsroom());
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    h.manager.services().extensions.add_post_processor(Arc::new(
        move |_config: &FrontConfig, regions: &mut RegionMap| {
            seen.fetch_add(1, Ordering::SeqCst);
            if let Some(rails) = regions.get_mut("rails") {
                rails.items.truncate(2);
            }
        },
    ));

    let home = h.manager.get_front("home").await.expect("home configured");
    let first = home.get_regions().await;
    assert_eq!(ids(&first, "rails"), vec!["e", "d"]);

    let cached = h
        .cache
        .get::<RegionMap>(&home.cache_key())
        .await
        .expect("regions cached");
    assert_eq!(ids(&cached, "rails"), vec!["e", "d"]);

    assert_eq!(home.get_regions().await, first);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn region_renderer_overrides_one_region_on_one_front() {
    let h = harness(FRONTS, newsroom());
    h.manager.services().extensions.register_region_renderer(
        "home",
        "hero",
        Arc::new(
            |config: &FrontConfig, region: &Region, _ctx: &RequestContext| {
                format!(
                    r#"<section data-front="{}">{} lead</section>"#,
                    config.id,
                    region.items.len()
                )
            },
        ),
    );
    let ctx = RequestContext::new(DeviceClass::Desktop);

    let home = h.manager.get_front("home").await.expect("home configured");
    assert_eq!(
        home.render_region("hero", &ctx).await,
        r#"<section data-front="home">1 lead</section>"#
    );
    assert!(home.render_region("rails", &ctx).await.contains("region--rails"));

    let world = h.manager.get_front("world").await.expect("world configured");
    let world_hero = world.render_region("hero", &ctx).await;
    assert!(world_hero.contains("Story a"));
    assert!(!world_hero.contains("data-front"));
}

struct DigestFront;

#[async_trait]
impl FrontStrategy for DigestFront {
    fn kind(&self) -> &str {
        "digest"
    }

    async fn build_regions(&self, config: &FrontConfig, ctx: &BuildContext<'_>) -> RegionMap {
        let spec = config.region_spec_or("digest", QuerySpec::latest(2));
        query_regions(ctx, vec![("digest".to_string(), spec)]).await
    }

    fn is_affected_by(&self, _config: &FrontConfig, _change: &ContentChange) -> bool {
        false
    }
}

#[tokio::test]
async fn registered_kind_resolves_custom_fronts() {
    let h = harness(FRONTS, newsroom());
    h.manager.register_kind(
        "digest",
        Arc::new(|| -> Arc<dyn FrontStrategy> { Arc::new(DigestFront) }),
    );
    assert!(h.manager.registered_kinds().contains(&"digest".to_string()));

    h.store
        .upsert_front(FrontConfig::new("daily", "digest"))
        .await;
    let daily = h.manager.get_front("daily").await.expect("daily configured");
    assert_eq!(daily.kind(), "digest");

    let regions = daily.get_regions().await;
    assert_eq!(regions.keys().collect::<Vec<_>>(), vec!["digest"]);
    assert_eq!(ids(&regions, "digest"), vec!["e", "d"]);
    assert_eq!(regions["digest"].found_count, 5);
}

/// Settings store that, on its first front lookup, hands back the current
/// config and then rewrites `home` and clears the manager before returning.
struct ClearingStore {
    inner: Arc<InMemorySettingsStore>,
    manager: OnceLock<Weak<FrontManager>>,
    armed: AtomicBool,
}

#[async_trait]
impl SettingsStore for ClearingStore {
    async fn fronts_config(&self) -> Result<BTreeMap<String, FrontConfig>, RepoError> {
        self.inner.fronts_config().await
    }

    async fn front_config(&self, id: &str) -> Result<Option<FrontConfig>, RepoError> {
        let config = self.inner.front_config(id).await;
        if self.armed.swap(false, Ordering::SeqCst) {
            self.inner
                .upsert_front(FrontConfig::new("home", "home").with_cache_ttl(60))
                .await;
            if let Some(manager) = self.manager.get().and_then(Weak::upgrade) {
                manager.clear_all_caches().await;
            }
        }
        config
    }

    fn on_config_changed(&self, listener: ConfigListener) {
        self.inner.on_config_changed(listener);
    }
}

#[tokio::test]
async fn front_resolved_across_a_clear_is_not_retained() {
    let store = Arc::new(ClearingStore {
        inner: Arc::new(InMemorySettingsStore::from_toml_str(FRONTS).expect("fronts toml")),
        manager: OnceLock::new(),
        armed: AtomicBool::new(true),
    });
    let cache = Arc::new(FrontCache::in_memory(CacheConfig::default()));
    let services = front_services(counting_repository(newsroom()), cache);
    let manager = Arc::new(FrontManager::new(store.clone(), services));
    store
        .manager
        .set(Arc::downgrade(&manager))
        .expect("manager set once");

    let stale = manager.get_front("home").await.expect("home configured");
    assert_eq!(stale.cache_ttl(), std::time::Duration::from_secs(300));

    let fresh = manager.get_front("home").await.expect("home configured");
    assert_eq!(fresh.cache_ttl(), std::time::Duration::from_secs(60));
    assert!(!Arc::ptr_eq(&stale, &fresh));
}
