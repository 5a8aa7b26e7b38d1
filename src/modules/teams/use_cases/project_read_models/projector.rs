// Projector keeps the team read models in step with the event log.
//
// Purpose
// - Rebuild: replay the whole log in logical order through `apply_one`.
// - Live: apply every newly committed event through the same `apply_one`.
//
// Boundaries
// - A failing event is logged and skipped in both modes. Only a failure to read
//   the log or to subscribe stops the projector from starting.

use crate::modules::teams::core::events::TeamEvent;
use crate::modules::teams::use_cases::project_read_models::apply::{Mutation, apply};
use crate::modules::teams::use_cases::project_read_models::repository::TeamProjectionRepository;
use crate::shared::infrastructure::event_store::{EventFeed, EventStore, EventStoreError, StoredEvent};
use crate::shared::infrastructure::observability::{Metrics, names};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: u64 = 500;

/// Failure to project a single event.
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("failed to decode event {event_id}: {source}")]
    Decode {
        event_id: Uuid,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to apply event {event_id}: {source}")]
    Apply {
        event_id: Uuid,
        #[source]
        source: anyhow::Error,
    },
}

/// Failure that keeps the projector from starting.
#[derive(Debug, Error)]
pub enum ProjectorError {
    #[error("failed to read the event log: {0}")]
    Rebuild(#[source] EventStoreError),

    #[error("failed to subscribe to committed events: {0}")]
    Subscribe(#[source] EventStoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Ignored,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildReport {
    pub applied: u64,
    pub ignored: u64,
    pub failed: u64,
}

pub struct Projector<TEventStore, TRepository>
where
    TEventStore: EventStore + ?Sized + 'static,
    TRepository: TeamProjectionRepository + ?Sized + 'static,
{
    name: String,
    event_store: Arc<TEventStore>,
    repository: Arc<TRepository>,
    metrics: Arc<dyn Metrics>,
    page_size: u64,
}

impl<TEventStore, TRepository> Projector<TEventStore, TRepository>
where
    TEventStore: EventStore + ?Sized + 'static,
    TRepository: TeamProjectionRepository + ?Sized + 'static,
{
    pub fn new(
        name: impl Into<String>,
        event_store: Arc<TEventStore>,
        repository: Arc<TRepository>,
        metrics: Arc<dyn Metrics>,
    ) -> Self {
        Self {
            name: name.into(),
            event_store,
            repository,
            metrics,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn apply_one(&self, stored: &StoredEvent) -> Result<ApplyOutcome, ProjectionError> {
        let started = Instant::now();
        let labels = [("projection", stored.event_type.clone())];

        let event = match TeamEvent::decode(stored) {
            Ok(Some(event)) => event,
            Ok(None) => {
                tracing::debug!(
                    event_id = %stored.id,
                    event_type = %stored.event_type,
                    "no projection for event type"
                );
                return Ok(ApplyOutcome::Ignored);
            }
            Err(source) => {
                self.metrics
                    .increment_counter(names::PROJECTION_ERRORS_TOTAL, &labels);
                return Err(ProjectionError::Decode {
                    event_id: stored.id,
                    source,
                });
            }
        };

        for mutation in apply(&event, stored.timestamp) {
            let written = match mutation {
                Mutation::InsertTeam(row) => self.repository.insert_team(row).await,
                Mutation::UpdateTeam(patch) => self.repository.update_team(patch).await,
                Mutation::InsertStatusUpdate(row) => {
                    self.repository.insert_status_update(row).await
                }
            };
            if let Err(source) = written {
                self.metrics
                    .increment_counter(names::PROJECTION_ERRORS_TOTAL, &labels);
                return Err(ProjectionError::Apply {
                    event_id: stored.id,
                    source,
                });
            }
        }

        let lag = (Utc::now() - stored.timestamp).num_milliseconds() as f64 / 1000.0;
        self.metrics
            .increment_counter(names::PROJECTION_UPDATES_TOTAL, &labels);
        self.metrics
            .set_gauge(names::PROJECTION_LAG_SECONDS, lag.max(0.0), &labels);
        self.metrics.record_histogram(
            names::PROJECTION_PROCESSING_SECONDS,
            started.elapsed().as_secs_f64(),
            &labels,
        );
        Ok(ApplyOutcome::Applied)
    }

    /// Replays the whole log page by page. Safe to run over populated tables.
    pub async fn rebuild(&self) -> Result<RebuildReport, ProjectorError> {
        let mut report = RebuildReport::default();
        let mut offset = 0;

        loop {
            let page = self
                .event_store
                .get_all(None, offset, self.page_size)
                .await
                .map_err(ProjectorError::Rebuild)?;
            let fetched = page.len() as u64;

            for stored in &page {
                match self.apply_one(stored).await {
                    Ok(ApplyOutcome::Applied) => report.applied += 1,
                    Ok(ApplyOutcome::Ignored) => report.ignored += 1,
                    Err(error) => {
                        report.failed += 1;
                        tracing::warn!(
                            projector = %self.name,
                            event_id = %stored.id,
                            event_type = %stored.event_type,
                            aggregate_id = %stored.aggregate_id,
                            error = %error,
                            "failed to project event during rebuild"
                        );
                    }
                }
            }

            offset += fetched;
            if fetched < self.page_size {
                break;
            }
        }

        tracing::info!(
            projector = %self.name,
            applied = report.applied,
            ignored = report.ignored,
            failed = report.failed,
            "rebuild complete"
        );
        Ok(report)
    }

    /// Subscribes, rebuilds, then applies live events on a background task
    /// until `cancel` fires or the feed closes.
    pub async fn start(
        self: Arc<Self>,
        cancel: CancellationToken,
    ) -> Result<JoinHandle<()>, ProjectorError> {
        let subscription = cancel.child_token();
        let feed = self
            .event_store
            .subscribe(Vec::new(), subscription.clone())
            .await
            .map_err(ProjectorError::Subscribe)?;

        if let Err(error) = self.rebuild().await {
            subscription.cancel();
            return Err(error);
        }

        Ok(tokio::spawn(self.run(feed, subscription)))
    }

    async fn run(self: Arc<Self>, mut feed: EventFeed, cancel: CancellationToken) {
        tracing::info!(projector = %self.name, "live projection started");
        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => break,
                next = feed.recv() => next,
            };
            let Some(stored) = next else {
                tracing::info!(projector = %self.name, "event feed closed");
                break;
            };
            if let Err(error) = self.apply_one(&stored).await {
                tracing::warn!(
                    projector = %self.name,
                    event_id = %stored.id,
                    event_type = %stored.event_type,
                    aggregate_id = %stored.aggregate_id,
                    error = %error,
                    "failed to project live event"
                );
            }
        }
        tracing::info!(projector = %self.name, "live projection stopped");
    }
}
