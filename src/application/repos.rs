//! Collaborator traits the front engine consumes.
//!
//! The content repository and the settings store live outside this crate; the
//! engine only ever talks to them through these seams.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use thiserror::Error;

use crate::domain::entities::{ContentRecord, Term};
use crate::domain::fronts::FrontConfig;
use crate::domain::query::{QuerySpec, TermOrder};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Records matched by a query, plus the total number of matches before the
/// page limit was applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub records: Vec<ContentRecord>,
    pub found: u64,
}

#[async_trait]
pub trait ContentRepository: Send + Sync {
    async fn query(&self, spec: &QuerySpec) -> Result<QueryResult, RepoError>;

    async fn resolve_term(&self, taxonomy: &str, slug: &str) -> Result<Option<Term>, RepoError>;

    async fn child_terms(
        &self,
        parent_term_id: &str,
        order: TermOrder,
    ) -> Result<Vec<Term>, RepoError>;
}

/// Callback fired after every settings write. The write is only considered
/// complete once the returned future resolves.
pub type ConfigListener = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn fronts_config(&self) -> Result<BTreeMap<String, FrontConfig>, RepoError>;

    async fn front_config(&self, id: &str) -> Result<Option<FrontConfig>, RepoError> {
        Ok(self.fronts_config().await?.remove(id))
    }

    fn on_config_changed(&self, listener: ConfigListener);
}
