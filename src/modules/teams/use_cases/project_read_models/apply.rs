// Translate a team event into read model mutations.
//
// Rebuild and live application both go through `apply`, so the two paths
// produce the same rows for the same log.

use crate::modules::teams::core::events::TeamEvent;
use crate::modules::teams::use_cases::project_read_models::model::{
    StatusUpdateRow, TeamPatch, TeamRow,
};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    InsertTeam(TeamRow),
    UpdateTeam(TeamPatch),
    InsertStatusUpdate(StatusUpdateRow),
}

/// `timestamp` is the envelope's logical time.
pub fn apply(event: &TeamEvent, timestamp: DateTime<Utc>) -> Vec<Mutation> {
    match event {
        TeamEvent::TeamRegisteredV1(e) => vec![Mutation::InsertTeam(TeamRow {
            team_id: e.team_id.clone(),
            name: e.name.clone(),
            channel_ref: e.channel_ref.clone(),
            poll_schedule: e.poll_schedule.clone(),
            created_at: timestamp,
            updated_at: timestamp,
        })],
        TeamEvent::TeamUpdatedV1(e) => vec![Mutation::UpdateTeam(TeamPatch {
            team_id: e.team_id.clone(),
            name: e.name.clone(),
            channel_ref: e.channel_ref.clone(),
            poll_schedule: e.poll_schedule.clone(),
            updated_at: timestamp,
        })],
        TeamEvent::StatusUpdateSubmittedV1(e) => {
            vec![Mutation::InsertStatusUpdate(StatusUpdateRow {
                update_id: e.update_id,
                team_id: e.team_id.clone(),
                content: e.content.clone(),
                author: e.author.clone(),
                submitter: e.submitter.clone(),
                created_at: e.submitted_at,
            })]
        }
    }
}
