//! Invalidation events.
//!
//! Writers to the content repository or settings store publish an event; the
//! consumer drains the queue, merges the batch into a plan and clears the
//! affected fronts.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use time::OffsetDateTime;
use tracing::info;

use crate::domain::entities::TermRef;

use super::lock::mutex_lock;

const SOURCE: &str = "cache::events";

/// Monotonic sequence number; unique per queue and used as the event identity.
pub type Epoch = u64;

#[derive(Debug, Clone)]
pub struct InvalidationEvent {
    pub epoch: Epoch,
    pub kind: EventKind,
    pub timestamp: OffsetDateTime,
}

impl InvalidationEvent {
    pub fn new(kind: EventKind, epoch: Epoch) -> Self {
        Self {
            epoch,
            kind,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A record was created or updated. `terms` lists every term the record
    /// belongs to (before and after the change when they differ).
    ContentUpserted {
        content_id: String,
        terms: Vec<TermRef>,
    },
    ContentDeleted {
        content_id: String,
        terms: Vec<TermRef>,
    },
    /// A taxonomy term was created, renamed, re-parented or removed.
    TermChanged { taxonomy: String, slug: String },
    /// Front configuration was written.
    SettingsUpdated,
}

impl EventKind {
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::ContentUpserted { .. } => "content_upserted",
            EventKind::ContentDeleted { .. } => "content_deleted",
            EventKind::TermChanged { .. } => "term_changed",
            EventKind::SettingsUpdated => "settings_updated",
        }
    }
}

pub struct EventQueue {
    queue: Mutex<VecDeque<InvalidationEvent>>,
    epoch_counter: AtomicU64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            epoch_counter: AtomicU64::new(0),
        }
    }

    pub fn next_epoch(&self) -> Epoch {
        self.epoch_counter.fetch_add(1, Ordering::SeqCst)
    }

    pub fn publish(&self, kind: EventKind) -> Epoch {
        let epoch = self.next_epoch();
        info!(
            event_epoch = epoch,
            event_kind = kind.label(),
            "Invalidation event enqueued"
        );
        mutex_lock(&self.queue, SOURCE, "publish").push_back(InvalidationEvent::new(kind, epoch));
        epoch
    }

    /// Drain up to `limit` events in FIFO order.
    pub fn drain(&self, limit: usize) -> Vec<InvalidationEvent> {
        let mut queue = mutex_lock(&self.queue, SOURCE, "drain");
        let count = limit.min(queue.len());
        queue.drain(..count).collect()
    }

    /// Whether any event published at or before `epoch` is still queued.
    pub fn holds_through(&self, epoch: Epoch) -> bool {
        mutex_lock(&self.queue, SOURCE, "holds_through")
            .front()
            .is_some_and(|oldest| oldest.epoch <= epoch)
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.queue, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_assigns_increasing_epochs() {
        let queue = EventQueue::new();
        let first = queue.publish(EventKind::SettingsUpdated);
        let second = queue.publish(EventKind::TermChanged {
            taxonomy: "category".to_string(),
            slug: "world".to_string(),
        });
        assert!(first < second);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn drain_respects_limit_and_order() {
        let queue = EventQueue::new();
        for id in ["a", "b", "c"] {
            queue.publish(EventKind::ContentDeleted {
                content_id: id.to_string(),
                terms: Vec::new(),
            });
        }

        let batch = queue.drain(2);
        assert_eq!(batch.len(), 2);
        assert!(matches!(
            &batch[0].kind,
            EventKind::ContentDeleted { content_id, .. } if content_id == "a"
        ));
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.drain(10).len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn holds_through_tracks_the_oldest_pending_epoch() {
        let queue = EventQueue::new();
        let first = queue.publish(EventKind::SettingsUpdated);
        let second = queue.publish(EventKind::SettingsUpdated);
        assert!(queue.holds_through(first));

        queue.drain(1);
        assert!(!queue.holds_through(first));
        assert!(queue.holds_through(second));

        queue.drain(1);
        assert!(!queue.holds_through(second));
    }
}
