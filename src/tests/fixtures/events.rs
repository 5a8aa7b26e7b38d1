// Shared event fixtures.
//
// Timestamps are offsets in seconds from a fixed instant so tests can state
// logical order without touching the wall clock.

use crate::modules::teams::core::events::TeamEvent;
use crate::modules::teams::core::events::v1::{
    StatusUpdateSubmittedV1, TeamRegisteredV1, TeamUpdatedV1,
};
use crate::shared::infrastructure::event_store::StoredEvent;
use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

pub const BASE_EPOCH_SECS: i64 = 1_700_000_000;

pub fn at(offset_secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(BASE_EPOCH_SECS + offset_secs, 0).expect("valid fixture timestamp")
}

/// Envelope with an empty payload, for store-level tests.
pub fn stored_event(
    event_type: &str,
    aggregate_id: &str,
    timestamp: DateTime<Utc>,
    version: i32,
) -> StoredEvent {
    StoredEvent::new(event_type, aggregate_id, json!({}), timestamp, version)
}

pub fn team_registered(team_id: &str, name: &str) -> TeamRegisteredV1 {
    TeamRegisteredV1 {
        team_id: team_id.to_string(),
        name: name.to_string(),
        channel_ref: format!("#{}", team_id.to_lowercase()),
        poll_schedule: None,
    }
}

pub fn status_update_submitted(
    team_id: &str,
    submitter: &str,
    submitted_at: DateTime<Utc>,
) -> StatusUpdateSubmittedV1 {
    StatusUpdateSubmittedV1 {
        update_id: Uuid::now_v7(),
        team_id: team_id.to_string(),
        content: "Finished the migration, starting on the rollout".to_string(),
        author: format!("{submitter} (display)"),
        submitter: submitter.to_string(),
        submitted_at,
    }
}

fn encode(event: TeamEvent, timestamp: DateTime<Utc>, version: i32) -> StoredEvent {
    event
        .to_stored(timestamp, version)
        .expect("fixture event encodes")
}

pub fn registered_event(
    team_id: &str,
    name: &str,
    timestamp: DateTime<Utc>,
    version: i32,
) -> StoredEvent {
    encode(
        TeamEvent::TeamRegisteredV1(team_registered(team_id, name)),
        timestamp,
        version,
    )
}

pub fn updated_event(
    team_id: &str,
    name: &str,
    timestamp: DateTime<Utc>,
    version: i32,
) -> StoredEvent {
    encode(
        TeamEvent::TeamUpdatedV1(TeamUpdatedV1 {
            team_id: team_id.to_string(),
            name: name.to_string(),
            channel_ref: format!("#{}", team_id.to_lowercase()),
            poll_schedule: None,
        }),
        timestamp,
        version,
    )
}

pub fn submitted_event(
    team_id: &str,
    submitter: &str,
    timestamp: DateTime<Utc>,
    version: i32,
) -> StoredEvent {
    encode(
        TeamEvent::StatusUpdateSubmittedV1(status_update_submitted(team_id, submitter, timestamp)),
        timestamp,
        version,
    )
}
