//! Publishing side of front invalidation.

use std::sync::Arc;

use crate::domain::entities::TermRef;

use super::consumer::InvalidationConsumer;
use super::events::{EventKind, EventQueue};

/// Entry point for writers: publish an event, then consume the queue before
/// returning, so a write is only complete once affected fronts are cleared.
///
/// ```ignore
/// repository.upsert_record(record.clone());
/// trigger.content_upserted(&record.id, record.terms.clone()).await;
/// ```
pub struct CacheTrigger {
    queue: Arc<EventQueue>,
    consumer: Arc<InvalidationConsumer>,
}

impl CacheTrigger {
    pub fn new(queue: Arc<EventQueue>, consumer: Arc<InvalidationConsumer>) -> Self {
        Self { queue, consumer }
    }

    /// Publish `kind`; when `consume_now` is set, keep consuming batches
    /// until this event and everything queued before it are applied.
    /// Otherwise the event waits for the next consumption.
    pub async fn trigger(&self, kind: EventKind, consume_now: bool) {
        let epoch = self.queue.publish(kind);
        if !consume_now {
            return;
        }
        while self.queue.holds_through(epoch) {
            if !self.consumer.consume().await {
                break;
            }
        }
    }

    pub async fn content_upserted(&self, content_id: &str, terms: Vec<TermRef>) {
        self.trigger(
            EventKind::ContentUpserted {
                content_id: content_id.to_string(),
                terms,
            },
            true,
        )
        .await;
    }

    pub async fn content_deleted(&self, content_id: &str, terms: Vec<TermRef>) {
        self.trigger(
            EventKind::ContentDeleted {
                content_id: content_id.to_string(),
                terms,
            },
            true,
        )
        .await;
    }

    pub async fn term_changed(&self, taxonomy: &str, slug: &str) {
        self.trigger(
            EventKind::TermChanged {
                taxonomy: taxonomy.to_string(),
                slug: slug.to_string(),
            },
            true,
        )
        .await;
    }

    pub async fn settings_updated(&self) {
        self.trigger(EventKind::SettingsUpdated, true).await;
    }
}
