// Append-only event log port.
//
// Purpose
// - Persist domain events as immutable envelopes and read them back in logical time order.
// - Wake live subscribers through a best-effort commit notification carrying only the event id.
//
// Boundaries
// - The log is the source of truth. A missed notification delays a subscriber, it never loses data:
//   a full read through `get_all` sees every appended event.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub mod in_memory;
pub mod postgres;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub id: Uuid,
    pub event_type: String,
    pub aggregate_id: String,
    pub data: Json,
    pub timestamp: DateTime<Utc>,
    pub metadata: Option<Json>,
    pub version: i32,
}

impl StoredEvent {
    pub fn new(
        event_type: impl Into<String>,
        aggregate_id: impl Into<String>,
        data: Json,
        timestamp: DateTime<Utc>,
        version: i32,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            event_type: event_type.into(),
            aggregate_id: aggregate_id.into(),
            data,
            timestamp,
            metadata: None,
            version,
        }
    }

    pub fn with_metadata(mut self, metadata: Json) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Logical ordering key. `version` breaks ties between events of one
    /// aggregate that share a timestamp.
    pub fn ordering_key(&self) -> (DateTime<Utc>, i32) {
        (self.timestamp, self.version)
    }
}

#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("event {0} already exists")]
    DuplicateEvent(Uuid),

    #[error("failed to subscribe: {0}")]
    Subscribe(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Receiving half of a live subscription. Closed when the subscription is
/// cancelled or its listener task ends.
pub type EventFeed = mpsc::Receiver<StoredEvent>;

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persist one event, then publish its id on the notification topic.
    /// Publish failures are logged and swallowed.
    async fn append(&self, event: StoredEvent) -> Result<(), EventStoreError>;

    /// Persist a batch atomically: either every event is stored or none is.
    /// Notifications follow in batch order once the batch is durable.
    async fn append_all(&self, events: Vec<StoredEvent>) -> Result<(), EventStoreError>;

    /// All events of one aggregate in ascending logical order. Unknown
    /// aggregates yield an empty list.
    async fn get_by_aggregate_id(&self, aggregate_id: &str)
    -> Result<Vec<StoredEvent>, EventStoreError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<StoredEvent>, EventStoreError>;

    /// Ascending scan over the whole log, optionally restricted to one type.
    async fn get_all(
        &self,
        event_type: Option<&str>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Open a live feed of newly committed events whose type is in
    /// `event_types` (empty means every type). Cancelling `cancel` closes the
    /// feed and releases the listener.
    async fn subscribe(
        &self,
        event_types: Vec<String>,
        cancel: CancellationToken,
    ) -> Result<EventFeed, EventStoreError>;

    async fn close(&self);
}

#[derive(Debug, Clone)]
pub struct SubscriptionConfig {
    pub channel: String,
    pub feed_buffer: usize,
    pub min_reconnect_interval: Duration,
    pub max_reconnect_interval: Duration,
    pub fetch_timeout: Duration,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            channel: "events".to_string(),
            feed_buffer: 256,
            min_reconnect_interval: Duration::from_secs(10),
            max_reconnect_interval: Duration::from_secs(60),
            fetch_timeout: Duration::from_secs(5),
        }
    }
}

/// Doubles the reconnect delay, capped at `max`.
pub fn next_reconnect_delay(current: Duration, max: Duration) -> Duration {
    current.saturating_mul(2).min(max)
}

pub(crate) fn matches_filter(event_types: &[String], event_type: &str) -> bool {
    event_types.is_empty() || event_types.iter().any(|t| t == event_type)
}
