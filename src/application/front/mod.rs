//! Fronts: cache-wrapped region composition over pluggable strategies.
//!
//! A [`Front`] owns one [`FrontConfig`] and delegates region building to a
//! [`FrontStrategy`] chosen by the config's `type`. Everything else (caching,
//! post-processing, placement resolution, markup) is shared.

pub mod home;
pub mod section;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono_tz::Tz;
use frontpage_types::FrontProjection;
use futures::future::join_all;
use metrics::histogram;
use tracing::{debug, instrument, warn};

use crate::application::conditions::RequestContext;
use crate::application::placements::{PlacementRegistry, SlotDefinition};
use crate::application::repos::ContentRepository;
use crate::cache::keys::{CacheKey, fingerprint_or_debug, front_prefix};
use crate::cache::lock::{rw_read, rw_write};
use crate::cache::{ContentChange, FrontCache};
use crate::domain::fronts::FrontConfig;
use crate::domain::items::{Region, RegionMap, project_record};
use crate::domain::query::QuerySpec;
use crate::presentation::views;

pub use home::HomeFront;
pub use section::SectionFront;

const SOURCE: &str = "application::front";

pub const METRIC_REGION_BUILD_MS: &str = "frontpage_region_build_ms";

pub const REGION_HERO: &str = "hero";
pub const REGION_RAILS: &str = "rails";
pub const REGION_SIDEBAR: &str = "sidebar";
pub const REGION_SUBSECTIONS: &str = "subsections";

/// What a strategy may use while building regions.
pub struct BuildContext<'a> {
    pub front_id: &'a str,
    pub repository: &'a dyn ContentRepository,
    pub timezone: Tz,
}

/// Per-type region composition.
#[async_trait]
pub trait FrontStrategy: Send + Sync {
    fn kind(&self) -> &str;

    /// Build every region of the front. Must not fail: unavailable data
    /// degrades to empty regions (or an empty map).
    async fn build_regions(&self, config: &FrontConfig, ctx: &BuildContext<'_>) -> RegionMap;

    /// Whether `change` can alter what this front shows.
    fn is_affected_by(&self, _config: &FrontConfig, _change: &ContentChange) -> bool {
        true
    }
}

/// Mutates freshly built regions before they are cached.
pub trait RegionPostProcessor: Send + Sync {
    fn process(&self, config: &FrontConfig, regions: &mut RegionMap);
}

impl<F> RegionPostProcessor for F
where
    F: Fn(&FrontConfig, &mut RegionMap) + Send + Sync,
{
    fn process(&self, config: &FrontConfig, regions: &mut RegionMap) {
        self(config, regions)
    }
}

/// Replaces the default markup of one region on one front.
pub trait RegionRenderer: Send + Sync {
    fn render(&self, config: &FrontConfig, region: &Region, ctx: &RequestContext) -> String;
}

impl<F> RegionRenderer for F
where
    F: Fn(&FrontConfig, &Region, &RequestContext) -> String + Send + Sync,
{
    fn render(&self, config: &FrontConfig, region: &Region, ctx: &RequestContext) -> String {
        self(config, region, ctx)
    }
}

/// Extension points consulted by every front.
#[derive(Default)]
pub struct FrontExtensions {
    post_processors: RwLock<Vec<Arc<dyn RegionPostProcessor>>>,
    region_renderers: RwLock<HashMap<(String, String), Arc<dyn RegionRenderer>>>,
}

impl FrontExtensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Post-processors run in registration order.
    pub fn add_post_processor(&self, processor: Arc<dyn RegionPostProcessor>) {
        rw_write(&self.post_processors, SOURCE, "add_post_processor").push(processor);
    }

    pub fn register_region_renderer(
        &self,
        front_id: impl Into<String>,
        region: impl Into<String>,
        renderer: Arc<dyn RegionRenderer>,
    ) {
        rw_write(&self.region_renderers, SOURCE, "register_region_renderer")
            .insert((front_id.into(), region.into()), renderer);
    }

    fn post_processors(&self) -> Vec<Arc<dyn RegionPostProcessor>> {
        rw_read(&self.post_processors, SOURCE, "post_processors").clone()
    }

    fn region_renderer(&self, front_id: &str, region: &str) -> Option<Arc<dyn RegionRenderer>> {
        rw_read(&self.region_renderers, SOURCE, "region_renderer")
            .get(&(front_id.to_string(), region.to_string()))
            .cloned()
    }
}

/// Shared collaborators handed to every front.
pub struct FrontServices {
    pub repository: Arc<dyn ContentRepository>,
    pub cache: Arc<FrontCache>,
    pub placements: Arc<PlacementRegistry>,
    pub extensions: Arc<FrontExtensions>,
    /// Zone used for item date labels; matches the condition evaluator's.
    pub timezone: Tz,
}

impl FrontServices {
    pub fn new(
        repository: Arc<dyn ContentRepository>,
        cache: Arc<FrontCache>,
        placements: Arc<PlacementRegistry>,
    ) -> Self {
        let timezone = placements.evaluator().timezone();
        Self {
            repository,
            cache,
            placements,
            extensions: Arc::new(FrontExtensions::new()),
            timezone,
        }
    }

    pub fn with_extensions(mut self, extensions: Arc<FrontExtensions>) -> Self {
        self.extensions = extensions;
        self
    }
}

pub struct Front {
    config: FrontConfig,
    fingerprint: String,
    strategy: Arc<dyn FrontStrategy>,
    services: Arc<FrontServices>,
}

impl Front {
    pub fn new(
        config: FrontConfig,
        strategy: Arc<dyn FrontStrategy>,
        services: Arc<FrontServices>,
    ) -> Self {
        let fingerprint = fingerprint_or_debug(&config);
        Self {
            config,
            fingerprint,
            strategy,
            services,
        }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn kind(&self) -> &str {
        &self.config.kind
    }

    pub fn config(&self) -> &FrontConfig {
        &self.config
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::regions(self.config.id.clone(), self.fingerprint.clone())
    }

    pub fn cache_ttl(&self) -> Duration {
        self.config
            .cache_ttl()
            .unwrap_or_else(|| self.services.cache.config().default_ttl())
    }

    /// Regions from cache, or freshly built, post-processed and cached.
    #[instrument(skip(self), fields(front_id = %self.config.id))]
    pub async fn get_regions(&self) -> RegionMap {
        let key = self.cache_key();
        if let Some(regions) = self.services.cache.get::<RegionMap>(&key).await {
            return regions;
        }

        let started_at = Instant::now();
        let mut regions = self.build_regions().await;
        for processor in self.services.extensions.post_processors() {
            processor.process(&self.config, &mut regions);
        }
        histogram!(METRIC_REGION_BUILD_MS, "type" => self.config.kind.clone())
            .record(started_at.elapsed().as_secs_f64() * 1000.0);

        self.services
            .cache
            .set(&key, &regions, self.cache_ttl())
            .await;
        debug!(
            cache_key = %key,
            regions = regions.len(),
            "Front regions built"
        );
        regions
    }

    /// Build regions straight from the repository, bypassing the cache and
    /// post-processors.
    pub async fn build_regions(&self) -> RegionMap {
        let ctx = BuildContext {
            front_id: &self.config.id,
            repository: self.services.repository.as_ref(),
            timezone: self.services.timezone,
        };
        self.strategy.build_regions(&self.config, &ctx).await
    }

    /// Slots this front attaches, with per-front overrides applied.
    pub fn get_placements(&self) -> Vec<SlotDefinition> {
        self.services
            .placements
            .resolve(&self.config.id, &self.config.placement_refs)
    }

    /// Markup for one region. Unknown regions render as an empty string.
    pub async fn render_region(&self, name: &str, ctx: &RequestContext) -> String {
        let regions = self.get_regions().await;
        let Some(region) = regions.get(name) else {
            debug!(front_id = %self.config.id, region = name, "Region not present on front");
            return String::new();
        };

        if let Some(renderer) = self
            .services
            .extensions
            .region_renderer(&self.config.id, name)
        {
            return renderer.render(&self.config, region, ctx);
        }

        let placements: Vec<String> = self
            .get_placements()
            .iter()
            .filter(|slot| slot.region == name)
            .filter_map(|slot| self.services.placements.render_definition(slot, ctx))
            .collect();

        views::render_region(&self.config.id, region, &placements).unwrap_or_else(|err| {
            warn!(
                front_id = %self.config.id,
                region = name,
                origin = err.origin(),
                error = %err,
                "Region markup failed to render"
            );
            String::new()
        })
    }

    pub async fn to_projection(&self) -> FrontProjection {
        let regions = self.get_regions().await;
        FrontProjection {
            id: self.config.id.clone(),
            kind: self.config.kind.clone(),
            regions: regions
                .iter()
                .map(|(name, region)| (name.clone(), region.into()))
                .collect(),
            placements: self.get_placements().iter().map(Into::into).collect(),
        }
    }

    /// Remove every cached entry for this front, whatever its fingerprint.
    pub async fn clear_cache(&self) -> usize {
        self.services
            .cache
            .delete_by_prefix(&front_prefix(&self.config.id))
            .await
    }

    pub fn is_affected_by(&self, change: &ContentChange) -> bool {
        self.strategy.is_affected_by(&self.config, change)
    }
}

/// Run one region query, degrading failures to an empty region.
pub async fn query_region(ctx: &BuildContext<'_>, name: &str, spec: QuerySpec) -> Region {
    match ctx.repository.query(&spec).await {
        Ok(result) => Region {
            name: name.to_string(),
            items: result
                .records
                .iter()
                .map(|record| project_record(record, ctx.timezone))
                .collect(),
            query: spec,
            found_count: result.found,
        },
        Err(err) => {
            warn!(
                front_id = ctx.front_id,
                region = name,
                error = %err,
                "Content query failed; serving empty region"
            );
            Region::empty(name, spec)
        }
    }
}

/// Run independent region queries concurrently.
pub async fn query_regions(ctx: &BuildContext<'_>, specs: Vec<(String, QuerySpec)>) -> RegionMap {
    let regions = join_all(
        specs
            .into_iter()
            .map(|(name, spec)| async move { query_region(ctx, &name, spec).await }),
    )
    .await;
    regions
        .into_iter()
        .map(|region| (region.name.clone(), region))
        .collect()
}

/// Default region queries merged with the config: configured specs replace
/// defaults of the same name, and extra configured regions are appended.
pub fn merged_region_specs(
    config: &FrontConfig,
    defaults: Vec<(&'static str, QuerySpec)>,
) -> Vec<(String, QuerySpec)> {
    let mut specs: Vec<(String, QuerySpec)> = defaults
        .into_iter()
        .map(|(name, spec)| (name.to_string(), config.region_spec_or(name, spec)))
        .collect();
    for (name, spec) in &config.region_specs {
        if !specs.iter().any(|(existing, _)| existing == name) {
            specs.push((name.clone(), spec.clone()));
        }
    }
    specs
}
