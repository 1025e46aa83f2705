//! Executes invalidation plans against the front manager.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{debug, info, instrument};

use crate::application::manager::FrontManager;

use super::config::CacheConfig;
use super::events::EventQueue;
use super::planner::InvalidationPlan;

pub const METRIC_INVALIDATION_TOTAL: &str = "frontpage_invalidation_total";
pub const METRIC_INVALIDATION_CONSUME_MS: &str = "frontpage_invalidation_consume_ms";

pub struct InvalidationConsumer {
    config: CacheConfig,
    queue: Arc<EventQueue>,
    manager: Arc<FrontManager>,
}

impl InvalidationConsumer {
    pub fn new(config: CacheConfig, queue: Arc<EventQueue>, manager: Arc<FrontManager>) -> Self {
        Self {
            config,
            queue,
            manager,
        }
    }

    /// Drain pending events and apply the merged plan.
    ///
    /// Returns true if any events were processed.
    #[instrument(skip(self))]
    pub async fn consume(&self) -> bool {
        let started_at = Instant::now();
        let events = self.queue.drain(self.config.consume_batch_limit());
        if events.is_empty() {
            return false;
        }

        let event_count = events.len();
        let plan = InvalidationPlan::from_events(events);
        info!(event_count, plan = %plan, "Invalidation starting");

        let cleared = self.execute(&plan).await;

        info!(event_count, cleared, "Invalidation complete");
        histogram!(METRIC_INVALIDATION_CONSUME_MS)
            .record(started_at.elapsed().as_secs_f64() * 1000.0);
        true
    }

    /// Apply `plan`, returning how many fronts were cleared.
    pub async fn execute(&self, plan: &InvalidationPlan) -> usize {
        if plan.reload_settings {
            let cleared = self.manager.clear_all_caches().await;
            counter!(METRIC_INVALIDATION_TOTAL, "scope" => "all").increment(1);
            return cleared;
        }

        let mut cleared = 0;
        for front in self.manager.get_all_fronts().await {
            if plan.changes.iter().any(|change| front.is_affected_by(change)) {
                self.manager.clear_front_cache(front.id()).await;
                counter!(METRIC_INVALIDATION_TOTAL, "scope" => "front").increment(1);
                cleared += 1;
            } else {
                debug!(front_id = front.id(), "Front unaffected by invalidation plan");
            }
        }
        cleared
    }
}
