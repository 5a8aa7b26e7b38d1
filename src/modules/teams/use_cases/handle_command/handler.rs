use crate::modules::teams::core::commands::{Command, RegisterTeam, SubmitStatusUpdate, UpdateTeam};
use crate::modules::teams::core::events::TeamEvent;
use crate::modules::teams::core::evolve::evolve;
use crate::modules::teams::core::state::TeamState;
use crate::modules::teams::core::value_objects::ValidationError;
use crate::modules::teams::use_cases::handle_command::decide::{
    DecideError, Decision, decide_register_team, decide_submit_status_update, decide_update_team,
};
use crate::shared::infrastructure::event_store::{EventStore, EventStoreError, StoredEvent};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("invalid command: {0}")]
    Validation(#[from] ValidationError),

    #[error("domain rejected: {0}")]
    Domain(#[from] DecideError),

    #[error(transparent)]
    Storage(#[from] EventStoreError),

    #[error("failed to encode event data: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApplicationError {
    /// Message safe to hand back to whoever issued the command.
    pub fn public_message(&self) -> String {
        match self {
            ApplicationError::Validation(_) | ApplicationError::Domain(_) => self.to_string(),
            ApplicationError::Storage(_) | ApplicationError::Serialization(_) => {
                "the command could not be stored, please retry".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub aggregate_id: String,
    pub event_ids: Vec<Uuid>,
}

/// One async mutex per aggregate id, dropped again once nobody waits on it.
#[derive(Default)]
struct AggregateLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl AggregateLocks {
    fn handle(&self, aggregate_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(aggregate_id.to_string()).or_default().clone()
    }

    fn release(&self, aggregate_id: &str) {
        let mut locks = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(aggregate_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(aggregate_id);
        }
    }
}

/// What the handler needs from an aggregate's past to decide and stamp.
#[derive(Debug)]
struct History {
    state: TeamState,
    version: i32,
    latest: Option<DateTime<Utc>>,
}

impl Default for History {
    fn default() -> Self {
        Self {
            state: TeamState::Untracked,
            version: 0,
            latest: None,
        }
    }
}

pub struct CommandHandler<TEventStore>
where
    TEventStore: EventStore + ?Sized + 'static,
{
    event_store: Arc<TEventStore>,
    locks: AggregateLocks,
}

impl<TEventStore> CommandHandler<TEventStore>
where
    TEventStore: EventStore + ?Sized + 'static,
{
    pub fn new(event_store: Arc<TEventStore>) -> Self {
        Self {
            event_store,
            locks: AggregateLocks::default(),
        }
    }

    pub async fn handle(&self, command: Command) -> Result<CommandOutcome, ApplicationError> {
        let command_name = command.name();
        let result = match command {
            Command::SubmitStatusUpdate(c) => self.submit_status_update(c).await,
            Command::RegisterTeam(c) => self.register_team(c).await,
            Command::UpdateTeam(c) => self.update_team(c).await,
        };

        match &result {
            Ok(outcome) => tracing::info!(
                command = command_name,
                aggregate_id = %outcome.aggregate_id,
                events = outcome.event_ids.len(),
                "command handled"
            ),
            Err(error @ (ApplicationError::Validation(_) | ApplicationError::Domain(_))) => {
                tracing::debug!(command = command_name, error = %error, "command rejected")
            }
            Err(error) => tracing::error!(command = command_name, error = %error, "command failed"),
        }
        result
    }

    async fn submit_status_update(
        &self,
        command: SubmitStatusUpdate,
    ) -> Result<CommandOutcome, ApplicationError> {
        let valid = command.validate()?;
        let aggregate_id = valid.team_id.as_str().to_string();

        let lock = self.locks.handle(&aggregate_id);
        let result: Result<CommandOutcome, ApplicationError> = async {
            let _guard = lock.lock().await;
            let history = self.load(&aggregate_id).await?;
            let decision = decide_submit_status_update(&history.state, valid, Uuid::now_v7());
            self.persist(decision, &history).await
        }
        .await;
        drop(lock);
        self.locks.release(&aggregate_id);
        result
    }

    async fn register_team(
        &self,
        command: RegisterTeam,
    ) -> Result<CommandOutcome, ApplicationError> {
        let valid = command.validate()?;
        self.persist(decide_register_team(valid, Uuid::now_v7()), &History::default())
            .await
    }

    async fn update_team(&self, command: UpdateTeam) -> Result<CommandOutcome, ApplicationError> {
        let valid = command.validate()?;
        let aggregate_id = valid.team_id.as_str().to_string();

        let lock = self.locks.handle(&aggregate_id);
        let result: Result<CommandOutcome, ApplicationError> = async {
            let _guard = lock.lock().await;
            let history = self.load(&aggregate_id).await?;
            self.persist(decide_update_team(valid), &history).await
        }
        .await;
        drop(lock);
        self.locks.release(&aggregate_id);
        result
    }

    async fn load(&self, aggregate_id: &str) -> Result<History, ApplicationError> {
        let events = self.event_store.get_by_aggregate_id(aggregate_id).await?;
        let mut history = History::default();
        if events.is_empty() {
            return Ok(history);
        }

        history.state = TeamState::Unregistered;
        for stored in &events {
            history.version = history.version.max(stored.version);
            history.latest = history.latest.max(Some(stored.timestamp));
            if let Some(event) = TeamEvent::decode(stored)? {
                history.state = evolve(history.state, event);
            }
        }
        Ok(history)
    }

    async fn persist(
        &self,
        decision: Decision,
        history: &History,
    ) -> Result<CommandOutcome, ApplicationError> {
        let (aggregate_id, occurred_at, events) = match decision {
            Decision::Accepted {
                aggregate_id,
                occurred_at,
                events,
            } => (aggregate_id, occurred_at, events),
            Decision::Rejected { reason } => return Err(reason.into()),
        };

        // Replay orders by timestamp, so nothing may land before the history
        // it was decided against. Payloads keep the caller's time.
        let timestamp = history.latest.map_or(occurred_at, |latest| occurred_at.max(latest));
        let stored = encode_all(&events, timestamp, history.version)?;
        let event_ids = stored.iter().map(|e| e.id).collect();

        match <[StoredEvent; 1]>::try_from(stored) {
            Ok([single]) => self.event_store.append(single).await?,
            Err(batch) => self.event_store.append_all(batch).await?,
        }

        Ok(CommandOutcome {
            aggregate_id,
            event_ids,
        })
    }
}

fn encode_all(
    events: &[TeamEvent],
    timestamp: DateTime<Utc>,
    version: i32,
) -> Result<Vec<StoredEvent>, serde_json::Error> {
    events
        .iter()
        .zip(version + 1..)
        .map(|(event, version)| event.to_stored(timestamp, version))
        .collect()
}
