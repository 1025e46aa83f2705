//! Settings store backed by process memory, optionally seeded from TOML.
//!
//! ```toml
//! [fronts.home]
//! type = "home"
//!
//! [fronts.world]
//! type = "section"
//! term = "world"
//! cache_ttl = 60
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::application::repos::{ConfigListener, RepoError, SettingsStore};
use crate::cache::lock::{rw_read, rw_write};
use crate::domain::fronts::FrontConfig;

use super::error::InfraError;

const SOURCE: &str = "infra::settings";

#[derive(Debug, Default, Deserialize)]
struct FrontsDocument {
    #[serde(default)]
    fronts: BTreeMap<String, FrontConfig>,
}

/// Holds the `fronts` setting and notifies listeners after every write.
/// A write resolves only once every listener has finished.
#[derive(Default)]
pub struct InMemorySettingsStore {
    fronts: RwLock<BTreeMap<String, FrontConfig>>,
    listeners: RwLock<Vec<ConfigListener>>,
}

impl InMemorySettingsStore {
    pub fn new(fronts: BTreeMap<String, FrontConfig>) -> Self {
        Self {
            fronts: RwLock::new(with_ids(fronts)),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        let document: FrontsDocument = toml::from_str(raw)?;
        Ok(Self::new(document.fronts))
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, InfraError> {
        let raw = std::fs::read_to_string(path)?;
        let store = Self::from_toml_str(&raw)
            .map_err(|err| InfraError::fixture(path.display().to_string(), err.to_string()))?;
        info!(
            path = %path.display(),
            fronts = rw_read(&store.fronts, SOURCE, "from_toml_file").len(),
            "Front settings loaded"
        );
        Ok(store)
    }

    /// Replace the whole `fronts` setting.
    pub async fn replace_fronts(&self, fronts: BTreeMap<String, FrontConfig>) {
        *rw_write(&self.fronts, SOURCE, "replace_fronts") = with_ids(fronts);
        self.notify().await;
    }

    pub async fn upsert_front(&self, config: FrontConfig) {
        let id = config.id.clone();
        rw_write(&self.fronts, SOURCE, "upsert_front").insert(id, config);
        self.notify().await;
    }

    pub async fn remove_front(&self, id: &str) -> Option<FrontConfig> {
        let removed = rw_write(&self.fronts, SOURCE, "remove_front").remove(id);
        self.notify().await;
        removed
    }

    async fn notify(&self) {
        let listeners = rw_read(&self.listeners, SOURCE, "notify").clone();
        debug!(listeners = listeners.len(), "Notifying settings listeners");
        for listener in listeners {
            listener().await;
        }
    }
}

fn with_ids(fronts: BTreeMap<String, FrontConfig>) -> BTreeMap<String, FrontConfig> {
    fronts
        .into_iter()
        .map(|(id, mut config)| {
            config.id = id.clone();
            (id, config)
        })
        .collect()
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn fronts_config(&self) -> Result<BTreeMap<String, FrontConfig>, RepoError> {
        Ok(rw_read(&self.fronts, SOURCE, "fronts_config").clone())
    }

    async fn front_config(&self, id: &str) -> Result<Option<FrontConfig>, RepoError> {
        Ok(rw_read(&self.fronts, SOURCE, "front_config").get(id).cloned())
    }

    fn on_config_changed(&self, listener: ConfigListener) {
        rw_write(&self.listeners, SOURCE, "on_config_changed").push(listener);
    }
}
