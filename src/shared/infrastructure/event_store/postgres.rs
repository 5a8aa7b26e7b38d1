//! PostgreSQL implementation of the EventStore port.
//!
//! Events live in the `events` table. After every durable write the store calls
//! `pg_notify(channel, event_id)`. Each subscriber listens on its own connection,
//! opened from the pool's connect options but never borrowed from the pool, then
//! re-fetches every notified event by id and forwards it to its feed.

use crate::shared::infrastructure::event_store::{
    EventFeed, EventStore, EventStoreError, StoredEvent, SubscriptionConfig, matches_filter,
    next_reconnect_delay,
};
use crate::shared::infrastructure::observability::{Metrics, names};
use chrono::{DateTime, Utc};
use serde_json::Value as Json;
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgConnectOptions, PgListener, PgPoolOptions};
use sqlx::{PgExecutor, PgPool};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const SELECT_EVENTS: &str =
    "SELECT id, type AS event_type, aggregate_id, data, timestamp, metadata, version FROM events";

impl From<sqlx::Error> for EventStoreError {
    fn from(error: sqlx::Error) -> Self {
        EventStoreError::Backend(error.to_string())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    event_type: String,
    aggregate_id: String,
    data: Json,
    timestamp: DateTime<Utc>,
    metadata: Option<Json>,
    version: i32,
}

impl From<EventRow> for StoredEvent {
    fn from(row: EventRow) -> Self {
        StoredEvent {
            id: row.id,
            event_type: row.event_type,
            aggregate_id: row.aggregate_id,
            data: row.data,
            timestamp: row.timestamp,
            metadata: row.metadata,
            version: row.version,
        }
    }
}

pub struct PostgresEventStore {
    pool: PgPool,
    config: SubscriptionConfig,
    metrics: Arc<dyn Metrics>,
    shutdown: CancellationToken,
}

impl PostgresEventStore {
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        config: SubscriptionConfig,
        metrics: Arc<dyn Metrics>,
    ) -> Result<Self, EventStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;
        Ok(Self::from_pool(pool, config, metrics))
    }

    pub fn from_pool(pool: PgPool, config: SubscriptionConfig, metrics: Arc<dyn Metrics>) -> Self {
        Self {
            pool,
            config,
            metrics,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the event table and the read-model tables if they are missing.
    pub async fn migrate(&self) -> Result<(), EventStoreError> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| EventStoreError::Backend(e.to_string()))
    }

    fn record_error(&self, operation: &'static str) {
        self.metrics.increment_counter(
            names::EVENT_STORE_ERRORS_TOTAL,
            &[("operation", operation.to_string())],
        );
    }

    fn record_loaded(&self, events: &[StoredEvent]) {
        for event in events {
            self.metrics.increment_counter(
                names::EVENTS_LOADED_TOTAL,
                &[("event_type", event.event_type.clone())],
            );
        }
    }

    async fn notify(&self, event: &StoredEvent) {
        let published = sqlx::query("SELECT pg_notify($1, $2)")
            .bind(&self.config.channel)
            .bind(event.id.to_string())
            .execute(&self.pool)
            .await;
        if let Err(error) = published {
            self.metrics
                .increment_counter(names::NOTIFICATIONS_FAILED_TOTAL, &[]);
            tracing::warn!(
                event_id = %event.id,
                event_type = %event.event_type,
                error = %error,
                "failed to notify listeners"
            );
        }
    }
}

async fn insert_event<'e>(
    executor: impl PgExecutor<'e>,
    event: &StoredEvent,
) -> Result<(), EventStoreError> {
    sqlx::query(
        r#"
        INSERT INTO events (id, type, aggregate_id, data, timestamp, metadata, version)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(event.id)
    .bind(&event.event_type)
    .bind(&event.aggregate_id)
    .bind(&event.data)
    .bind(event.timestamp)
    .bind(&event.metadata)
    .bind(event.version)
    .execute(executor)
    .await
    .map_err(|error| {
        if matches!(&error, sqlx::Error::Database(db) if db.is_unique_violation()) {
            EventStoreError::DuplicateEvent(event.id)
        } else {
            error.into()
        }
    })?;
    Ok(())
}

async fn fetch_by_id(pool: &PgPool, id: Uuid) -> Result<Option<StoredEvent>, sqlx::Error> {
    let row = sqlx::query_as::<_, EventRow>(&format!("{SELECT_EVENTS} WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(StoredEvent::from))
}

/// Opens a single-connection pool for the listener so it never holds a permit
/// of the read/write pool.
async fn connect_listener(
    options: &PgConnectOptions,
    channel: &str,
) -> Result<PgListener, sqlx::Error> {
    let dedicated = PgPoolOptions::new()
        .max_connections(1)
        .max_lifetime(None)
        .idle_timeout(None)
        .connect_with(options.clone())
        .await?;
    let mut listener = PgListener::connect_with(&dedicated).await?;
    listener.listen(channel).await?;
    Ok(listener)
}

#[async_trait::async_trait]
impl EventStore for PostgresEventStore {
    async fn append(&self, event: StoredEvent) -> Result<(), EventStoreError> {
        if let Err(error) = insert_event(&self.pool, &event).await {
            self.record_error("append");
            return Err(error);
        }
        self.metrics.increment_counter(
            names::EVENTS_STORED_TOTAL,
            &[("event_type", event.event_type.clone())],
        );
        self.notify(&event).await;
        Ok(())
    }

    async fn append_all(&self, events: Vec<StoredEvent>) -> Result<(), EventStoreError> {
        let mut tx = self.pool.begin().await.inspect_err(|_| self.record_error("append"))?;
        for event in &events {
            if let Err(error) = insert_event(&mut *tx, event).await {
                self.record_error("append");
                return Err(error);
            }
        }
        tx.commit().await.inspect_err(|_| self.record_error("append"))?;

        for event in &events {
            self.metrics.increment_counter(
                names::EVENTS_STORED_TOTAL,
                &[("event_type", event.event_type.clone())],
            );
            self.notify(event).await;
        }
        Ok(())
    }

    async fn get_by_aggregate_id(
        &self,
        aggregate_id: &str,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "{SELECT_EVENTS} WHERE aggregate_id = $1 ORDER BY timestamp ASC, version ASC"
        ))
        .bind(aggregate_id)
        .fetch_all(&self.pool)
        .await
        .inspect_err(|_| self.record_error("get_by_aggregate_id"))?;

        let events: Vec<StoredEvent> = rows.into_iter().map(StoredEvent::from).collect();
        self.record_loaded(&events);
        Ok(events)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<StoredEvent>, EventStoreError> {
        fetch_by_id(&self.pool, id)
            .await
            .inspect_err(|_| self.record_error("get_by_id"))
            .map_err(EventStoreError::from)
    }

    async fn get_all(
        &self,
        event_type: Option<&str>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let rows = match event_type {
            Some(event_type) => {
                sqlx::query_as::<_, EventRow>(&format!(
                    "{SELECT_EVENTS} WHERE type = $1 ORDER BY timestamp ASC, version ASC LIMIT $2 OFFSET $3"
                ))
                .bind(event_type)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, EventRow>(&format!(
                    "{SELECT_EVENTS} ORDER BY timestamp ASC, version ASC LIMIT $1 OFFSET $2"
                ))
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
        }
        .inspect_err(|_| self.record_error("get_all"))?;

        let events: Vec<StoredEvent> = rows.into_iter().map(StoredEvent::from).collect();
        self.record_loaded(&events);
        Ok(events)
    }

    async fn subscribe(
        &self,
        event_types: Vec<String>,
        cancel: CancellationToken,
    ) -> Result<EventFeed, EventStoreError> {
        if self.shutdown.is_cancelled() {
            return Err(EventStoreError::Subscribe("event store is closed".into()));
        }
        let options = self.pool.connect_options();
        let listener = connect_listener(&options, &self.config.channel)
            .await
            .map_err(|e| EventStoreError::Subscribe(e.to_string()))?;
        let (tx, rx) = mpsc::channel(self.config.feed_buffer);

        let worker = ListenerWorker {
            pool: self.pool.clone(),
            options,
            config: self.config.clone(),
            metrics: self.metrics.clone(),
            event_types,
            shutdown: self.shutdown.child_token(),
        };
        tokio::spawn(worker.run(listener, tx, cancel));

        tracing::info!(channel = %self.config.channel, "subscribed to commit notifications");
        Ok(rx)
    }

    /// Stops every listener, which closes their feeds, then drains the pool.
    async fn close(&self) {
        self.shutdown.cancel();
        self.pool.close().await;
    }
}

struct ListenerWorker {
    pool: PgPool,
    options: Arc<PgConnectOptions>,
    config: SubscriptionConfig,
    metrics: Arc<dyn Metrics>,
    event_types: Vec<String>,
    shutdown: CancellationToken,
}

impl ListenerWorker {
    async fn run(
        self,
        mut listener: PgListener,
        tx: mpsc::Sender<StoredEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            // `try_recv` reports a dropped connection as `Ok(None)` instead of
            // silently reconnecting, so every loss goes through the backoff.
            let received = tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.shutdown.cancelled() => break,
                received = listener.try_recv() => received,
            };

            let lost = match received {
                Ok(Some(notification)) => {
                    if !self.forward(notification.payload(), &tx, &cancel).await {
                        break;
                    }
                    continue;
                }
                Ok(None) => "connection closed".to_string(),
                Err(error) => error.to_string(),
            };

            self.metrics.increment_counter(
                names::EVENT_STORE_ERRORS_TOTAL,
                &[("operation", "listen".to_string())],
            );
            tracing::warn!(
                channel = %self.config.channel,
                error = %lost,
                "notification listener lost its connection"
            );
            match self.reconnect(&cancel).await {
                Some(fresh) => listener = fresh,
                None => break,
            }
        }
        tracing::debug!(channel = %self.config.channel, "notification listener stopped");
    }

    async fn reconnect(&self, cancel: &CancellationToken) -> Option<PgListener> {
        let mut delay = self.config.min_reconnect_interval;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return None,
                _ = self.shutdown.cancelled() => return None,
                _ = tokio::time::sleep(delay) => {}
            }
            match connect_listener(&self.options, &self.config.channel).await {
                Ok(listener) => {
                    tracing::info!(
                        channel = %self.config.channel,
                        "notification listener reconnected; events committed meanwhile wait for the next rebuild"
                    );
                    return Some(listener);
                }
                Err(error) => {
                    delay = next_reconnect_delay(delay, self.config.max_reconnect_interval);
                    tracing::warn!(
                        error = %error,
                        retry_in_secs = delay.as_secs(),
                        "failed to reconnect notification listener"
                    );
                }
            }
        }
    }

    /// Returns false once the feed can no longer be served.
    async fn forward(
        &self,
        payload: &str,
        tx: &mpsc::Sender<StoredEvent>,
        cancel: &CancellationToken,
    ) -> bool {
        let Ok(id) = Uuid::parse_str(payload) else {
            tracing::warn!(payload, "ignoring notification without an event id");
            return true;
        };

        let fetched = tokio::time::timeout(self.config.fetch_timeout, fetch_by_id(&self.pool, id)).await;
        let event = match fetched {
            Ok(Ok(Some(event))) => event,
            Ok(Ok(None)) => {
                tracing::warn!(event_id = %id, "notified event is not readable yet, skipping");
                return true;
            }
            Ok(Err(error)) => {
                tracing::warn!(event_id = %id, error = %error, "failed to fetch notified event");
                return true;
            }
            Err(_) => {
                tracing::warn!(event_id = %id, "timed out fetching notified event");
                return true;
            }
        };

        if !matches_filter(&self.event_types, &event.event_type) {
            return true;
        }

        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = self.shutdown.cancelled() => false,
            sent = tx.send(event) => sent.is_ok(),
        }
    }
}
