//! Resolves front ids to live [`Front`] instances.
//!
//! The manager is explicit process state: construct it once at start-up and
//! share it behind an `Arc`. Front types are an open set, dispatched through
//! a registry of strategy factories keyed by the config's `type` tag.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use futures::FutureExt;
use tracing::{debug, info, instrument, warn};

use crate::application::front::home::HOME_KIND;
use crate::application::front::section::SECTION_KIND;
use crate::application::front::{Front, FrontServices, FrontStrategy, HomeFront, SectionFront};
use crate::application::repos::SettingsStore;
use crate::cache::keys::front_prefix;
use crate::cache::lock::{rw_read, rw_write};

const SOURCE: &str = "application::manager";

/// Produces the strategy for a front of one type.
pub type StrategyFactory = Arc<dyn Fn() -> Arc<dyn FrontStrategy> + Send + Sync>;

pub struct FrontManager {
    settings: Arc<dyn SettingsStore>,
    services: Arc<FrontServices>,
    factories: RwLock<HashMap<String, StrategyFactory>>,
    instances: RwLock<HashMap<String, Arc<Front>>>,
    /// Bumped under the `instances` write lock on every clear.
    generation: AtomicU64,
}

impl FrontManager {
    /// Manager with the `home` and `section` types registered.
    pub fn new(settings: Arc<dyn SettingsStore>, services: Arc<FrontServices>) -> Self {
        let manager = Self {
            settings,
            services,
            factories: RwLock::new(HashMap::new()),
            instances: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
        };
        manager.register_kind(
            HOME_KIND,
            Arc::new(|| -> Arc<dyn FrontStrategy> { Arc::new(HomeFront) }),
        );
        manager.register_kind(
            SECTION_KIND,
            Arc::new(|| -> Arc<dyn FrontStrategy> { Arc::new(SectionFront) }),
        );
        manager
    }

    pub fn services(&self) -> &Arc<FrontServices> {
        &self.services
    }

    /// Register (or replace) the strategy used for fronts of type `kind`.
    /// Already resolved instances keep their strategy until they are dropped.
    pub fn register_kind(&self, kind: impl Into<String>, factory: StrategyFactory) {
        let kind = kind.into();
        debug!(front_type = %kind, "Front type registered");
        rw_write(&self.factories, SOURCE, "register_kind").insert(kind, factory);
    }

    pub fn registered_kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = rw_read(&self.factories, SOURCE, "registered_kinds")
            .keys()
            .cloned()
            .collect();
        kinds.sort();
        kinds
    }

    /// Resolve `id` to a front, constructing and caching it on first use.
    /// Missing config, invalid config and unknown types all yield `None`.
    ///
    /// A front built from configuration read before a concurrent clear is
    /// returned to its caller but not kept, so later lookups re-read
    /// settings.
    #[instrument(skip(self))]
    pub async fn get_front(&self, id: &str) -> Option<Arc<Front>> {
        let generation = self.generation.load(Ordering::SeqCst);
        if let Some(front) = rw_read(&self.instances, SOURCE, "get_front.lookup").get(id) {
            return Some(front.clone());
        }

        let mut config = match self.settings.front_config(id).await {
            Ok(Some(config)) => config,
            Ok(None) => {
                debug!(front_id = id, "Front is not configured");
                return None;
            }
            Err(err) => {
                warn!(front_id = id, error = %err, "Failed to read front configuration");
                return None;
            }
        };
        config.id = id.to_string();

        if let Err(err) = config.validate() {
            warn!(front_id = id, error = %err, "Front configuration is invalid");
            return None;
        }

        let factory = rw_read(&self.factories, SOURCE, "get_front.factory")
            .get(&config.kind)
            .cloned();
        let Some(factory) = factory else {
            warn!(front_id = id, front_type = %config.kind, "Unknown front type");
            return None;
        };

        let front = Arc::new(Front::new(config, factory(), self.services.clone()));
        let mut instances = rw_write(&self.instances, SOURCE, "get_front.insert");
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(front_id = id, "Caches cleared while resolving; front not retained");
            return Some(front);
        }
        Some(instances.entry(id.to_string()).or_insert(front).clone())
    }

    /// Every configured front that resolves, ordered by id.
    pub async fn get_all_fronts(&self) -> Vec<Arc<Front>> {
        let ids = match self.settings.fronts_config().await {
            Ok(configs) => configs.into_keys().collect::<Vec<_>>(),
            Err(err) => {
                warn!(error = %err, "Failed to list front configuration");
                return Vec::new();
            }
        };

        let mut fronts = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(front) = self.get_front(&id).await {
                fronts.push(front);
            }
        }
        fronts
    }

    /// Clear the cache of every known front and drop all resolved instances,
    /// so the next access re-reads configuration. Returns the number of
    /// fronts whose cache was cleared.
    #[instrument(skip(self))]
    pub async fn clear_all_caches(&self) -> usize {
        let mut ids: BTreeSet<String> = rw_read(&self.instances, SOURCE, "clear_all_caches")
            .keys()
            .cloned()
            .collect();
        match self.settings.fronts_config().await {
            Ok(configs) => ids.extend(configs.into_keys()),
            Err(err) => warn!(error = %err, "Failed to list front configuration while clearing"),
        }

        let mut removed = 0;
        for id in &ids {
            removed += self.services.cache.delete_by_prefix(&front_prefix(id)).await;
        }
        self.forget_instances(None);
        info!(fronts = ids.len(), removed, "All front caches cleared");
        ids.len()
    }

    /// Clear one front's cache and drop its resolved instance.
    #[instrument(skip(self))]
    pub async fn clear_front_cache(&self, id: &str) {
        let removed = self.services.cache.delete_by_prefix(&front_prefix(id)).await;
        self.forget_instances(Some(id));
        info!(front_id = id, removed, "Front cache cleared");
    }

    /// Drop one resolved instance, or all of them, invalidating any
    /// resolution still in flight.
    fn forget_instances(&self, id: Option<&str>) {
        let mut instances = rw_write(&self.instances, SOURCE, "forget_instances");
        self.generation.fetch_add(1, Ordering::SeqCst);
        match id {
            Some(id) => {
                instances.remove(id);
            }
            None => instances.clear(),
        }
    }

    /// Clear all caches whenever the settings store reports a write. The
    /// listener holds a weak reference, so it never keeps the manager alive.
    pub fn watch_settings(self: &Arc<Self>) {
        let manager = Arc::downgrade(self);
        self.settings.on_config_changed(Arc::new(move || {
            let manager = manager.clone();
            async move {
                if let Some(manager) = manager.upgrade() {
                    let _ = manager.clear_all_caches().await;
                }
            }
            .boxed()
        }));
    }
}
