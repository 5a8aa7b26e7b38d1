// In memory implementation of the EventStore port.
//
// Purpose
// - Support command handler and projector tests and local development without a database.
//
// Responsibilities
// - Keep the log in insertion order and answer reads in logical (timestamp, version) order.
// - Publish event ids on a broadcast channel standing in for the commit notification topic.

use crate::shared::infrastructure::event_store::{
    EventFeed, EventStore, EventStoreError, StoredEvent, matches_filter,
};
use crate::shared::infrastructure::observability::{Metrics, NoopMetrics, names};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{RwLock, broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const NOTIFICATION_CAPACITY: usize = 1024;

pub struct InMemoryEventStore {
    events: Arc<RwLock<Vec<StoredEvent>>>,
    notifier: broadcast::Sender<Uuid>,
    shutdown: CancellationToken,
    metrics: Arc<dyn Metrics>,
    feed_buffer: usize,
    is_offline: bool,
    notifications_offline: bool,
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::with_metrics(Arc::new(NoopMetrics))
    }

    pub fn with_metrics(metrics: Arc<dyn Metrics>) -> Self {
        let (notifier, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            notifier,
            shutdown: CancellationToken::new(),
            metrics,
            feed_buffer: 256,
            is_offline: false,
            notifications_offline: false,
        }
    }

    pub fn toggle_offline(&mut self) {
        self.is_offline = !self.is_offline;
    }

    /// Appends keep succeeding while notifications are off; subscribers just
    /// never hear about them.
    pub fn toggle_notifications(&mut self) {
        self.notifications_offline = !self.notifications_offline;
    }

    fn ensure_online(&self, operation: &'static str) -> Result<(), EventStoreError> {
        if self.is_offline {
            self.metrics.increment_counter(
                names::EVENT_STORE_ERRORS_TOTAL,
                &[("operation", operation.to_string())],
            );
            return Err(EventStoreError::Backend("Event store offline".into()));
        }
        Ok(())
    }

    fn publish(&self, event: &StoredEvent) {
        if self.notifications_offline {
            self.metrics
                .increment_counter(names::NOTIFICATIONS_FAILED_TOTAL, &[]);
            tracing::warn!(
                event_id = %event.id,
                event_type = %event.event_type,
                "failed to notify listeners: notification topic offline"
            );
            return;
        }
        // An error only means nobody is subscribed right now.
        let _ = self.notifier.send(event.id);
    }

    fn record_loaded(&self, events: &[StoredEvent]) {
        for event in events {
            self.metrics.increment_counter(
                names::EVENTS_LOADED_TOTAL,
                &[("event_type", event.event_type.clone())],
            );
        }
    }
}

fn sorted(mut events: Vec<StoredEvent>) -> Vec<StoredEvent> {
    events.sort_by_key(StoredEvent::ordering_key);
    events
}

#[async_trait::async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, event: StoredEvent) -> Result<(), EventStoreError> {
        self.append_all(vec![event]).await
    }

    async fn append_all(&self, events: Vec<StoredEvent>) -> Result<(), EventStoreError> {
        self.ensure_online("append")?;
        {
            let mut log = self.events.write().await;
            let mut seen: HashSet<Uuid> = log.iter().map(|e| e.id).collect();
            if let Some(duplicate) = events.iter().find(|e| !seen.insert(e.id)) {
                self.metrics.increment_counter(
                    names::EVENT_STORE_ERRORS_TOTAL,
                    &[("operation", "append".to_string())],
                );
                return Err(EventStoreError::DuplicateEvent(duplicate.id));
            }
            log.extend(events.iter().cloned());
        }
        for event in &events {
            self.metrics.increment_counter(
                names::EVENTS_STORED_TOTAL,
                &[("event_type", event.event_type.clone())],
            );
            self.publish(event);
        }
        Ok(())
    }

    async fn get_by_aggregate_id(
        &self,
        aggregate_id: &str,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        self.ensure_online("get_by_aggregate_id")?;
        let events = sorted(
            self.events
                .read()
                .await
                .iter()
                .filter(|e| e.aggregate_id == aggregate_id)
                .cloned()
                .collect(),
        );
        self.record_loaded(&events);
        Ok(events)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<StoredEvent>, EventStoreError> {
        self.ensure_online("get_by_id")?;
        Ok(self.events.read().await.iter().find(|e| e.id == id).cloned())
    }

    async fn get_all(
        &self,
        event_type: Option<&str>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        self.ensure_online("get_all")?;
        let events: Vec<StoredEvent> = sorted(
            self.events
                .read()
                .await
                .iter()
                .filter(|e| event_type.is_none_or(|t| e.event_type == t))
                .cloned()
                .collect(),
        )
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect();
        self.record_loaded(&events);
        Ok(events)
    }

    async fn subscribe(
        &self,
        event_types: Vec<String>,
        cancel: CancellationToken,
    ) -> Result<EventFeed, EventStoreError> {
        if self.is_offline {
            return Err(EventStoreError::Subscribe("Event store offline".into()));
        }

        let mut notifications = self.notifier.subscribe();
        let (tx, rx) = mpsc::channel(self.feed_buffer);
        let events = self.events.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            loop {
                let id = tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = shutdown.cancelled() => break,
                    received = notifications.recv() => match received {
                        Ok(id) => id,
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(
                                skipped,
                                "subscriber fell behind the notification topic; the next rebuild catches up"
                            );
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    },
                };

                let event = events.read().await.iter().find(|e| e.id == id).cloned();
                let Some(event) = event else {
                    tracing::warn!(event_id = %id, "notified event is not readable, skipping");
                    continue;
                };
                if !matches_filter(&event_types, &event.event_type) {
                    continue;
                }

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    sent = tx.send(event) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("in-memory subscription closed");
        });

        Ok(rx)
    }

    async fn close(&self) {
        self.shutdown.cancel();
    }
}
