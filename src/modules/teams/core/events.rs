use crate::shared::infrastructure::event_store::StoredEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const TEAM_REGISTERED: &str = "team.registered";
pub const TEAM_UPDATED: &str = "team.updated";
pub const STATUS_UPDATE_SUBMITTED: &str = "status_update.submitted";

pub mod v1 {
    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
    pub struct TeamRegisteredV1 {
        pub team_id: String,
        pub name: String,
        pub channel_ref: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub poll_schedule: Option<String>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
    pub struct TeamUpdatedV1 {
        pub team_id: String,
        pub name: String,
        pub channel_ref: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub poll_schedule: Option<String>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
    pub struct StatusUpdateSubmittedV1 {
        pub update_id: Uuid,
        pub team_id: String,
        pub content: String,
        pub author: String,
        pub submitter: String,
        pub submitted_at: DateTime<Utc>,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeamEvent {
    TeamRegisteredV1(v1::TeamRegisteredV1),
    TeamUpdatedV1(v1::TeamUpdatedV1),
    StatusUpdateSubmittedV1(v1::StatusUpdateSubmittedV1),
}

impl TeamEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            TeamEvent::TeamRegisteredV1(_) => TEAM_REGISTERED,
            TeamEvent::TeamUpdatedV1(_) => TEAM_UPDATED,
            TeamEvent::StatusUpdateSubmittedV1(_) => STATUS_UPDATE_SUBMITTED,
        }
    }

    pub fn team_id(&self) -> &str {
        match self {
            TeamEvent::TeamRegisteredV1(e) => &e.team_id,
            TeamEvent::TeamUpdatedV1(e) => &e.team_id,
            TeamEvent::StatusUpdateSubmittedV1(e) => &e.team_id,
        }
    }

    /// Wrap into a storable envelope addressed to `team_id`.
    pub fn to_stored(
        &self,
        timestamp: DateTime<Utc>,
        version: i32,
    ) -> Result<StoredEvent, serde_json::Error> {
        let data = match self {
            TeamEvent::TeamRegisteredV1(e) => serde_json::to_value(e)?,
            TeamEvent::TeamUpdatedV1(e) => serde_json::to_value(e)?,
            TeamEvent::StatusUpdateSubmittedV1(e) => serde_json::to_value(e)?,
        };
        Ok(StoredEvent::new(
            self.event_type(),
            self.team_id(),
            data,
            timestamp,
            version,
        ))
    }

    /// `Ok(None)` for types this module does not know about.
    pub fn decode(event: &StoredEvent) -> Result<Option<TeamEvent>, serde_json::Error> {
        let data = event.data.clone();
        let decoded = match event.event_type.as_str() {
            TEAM_REGISTERED => TeamEvent::TeamRegisteredV1(serde_json::from_value(data)?),
            TEAM_UPDATED => TeamEvent::TeamUpdatedV1(serde_json::from_value(data)?),
            STATUS_UPDATE_SUBMITTED => {
                TeamEvent::StatusUpdateSubmittedV1(serde_json::from_value(data)?)
            }
            _ => return Ok(None),
        };
        Ok(Some(decoded))
    }
}
