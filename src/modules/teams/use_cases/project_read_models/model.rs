use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row per team. `updated_at` is the logical time of the last applied
/// registration or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRow {
    pub team_id: String,
    pub name: String,
    pub channel_ref: String,
    pub poll_schedule: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mutable fields of a team as carried by an update event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamPatch {
    pub team_id: String,
    pub name: String,
    pub channel_ref: String,
    pub poll_schedule: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl TeamPatch {
    /// Applies the patch unless the row already reflects a later update.
    /// Returns whether the row changed.
    pub fn apply_to(&self, row: &mut TeamRow) -> bool {
        if self.updated_at < row.updated_at {
            return false;
        }
        row.name = self.name.clone();
        row.channel_ref = self.channel_ref.clone();
        row.poll_schedule = self.poll_schedule.clone();
        row.updated_at = self.updated_at;
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdateRow {
    pub update_id: Uuid,
    pub team_id: String,
    pub content: String,
    pub author: String,
    pub submitter: String,
    pub created_at: DateTime<Utc>,
}
