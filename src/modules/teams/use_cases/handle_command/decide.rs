// Pure decisions: current state + validated command -> events to append.
//
// Freshly assigned identifiers are passed in so every branch stays
// deterministic under test.

use crate::modules::teams::core::commands::{
    ValidRegisterTeam, ValidSubmitStatusUpdate, ValidUpdateTeam,
};
use crate::modules::teams::core::events::TeamEvent;
use crate::modules::teams::core::events::v1::{
    StatusUpdateSubmittedV1, TeamRegisteredV1, TeamUpdatedV1,
};
use crate::modules::teams::core::state::TeamState;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecideError {
    #[error("team {team_id} is not registered and no channel name was supplied to register it")]
    MissingTeamName { team_id: String },
}

#[derive(Debug, PartialEq, Eq)]
pub enum Decision {
    Accepted {
        aggregate_id: String,
        occurred_at: DateTime<Utc>,
        events: Vec<TeamEvent>,
    },
    Rejected {
        reason: DecideError,
    },
}

/// A team without any history is registered on first use, under its own id,
/// with the channel name as display name.
pub fn decide_submit_status_update(
    state: &TeamState,
    command: ValidSubmitStatusUpdate,
    update_id: Uuid,
) -> Decision {
    let team_id = command.team_id.into_inner();
    let mut events = Vec::with_capacity(2);

    if !state.has_history() {
        let Some(name) = command.channel_name else {
            return Decision::Rejected {
                reason: DecideError::MissingTeamName { team_id },
            };
        };
        events.push(TeamEvent::TeamRegisteredV1(TeamRegisteredV1 {
            team_id: team_id.clone(),
            name: name.into_inner(),
            channel_ref: team_id.clone(),
            poll_schedule: None,
        }));
    }

    events.push(TeamEvent::StatusUpdateSubmittedV1(StatusUpdateSubmittedV1 {
        update_id,
        team_id: team_id.clone(),
        content: command.content.into_inner(),
        author: command.author.into_inner(),
        submitter: command.submitter.into_inner(),
        submitted_at: command.submitted_at,
    }));

    Decision::Accepted {
        aggregate_id: team_id,
        occurred_at: command.submitted_at,
        events,
    }
}

pub fn decide_register_team(command: ValidRegisterTeam, team_id: Uuid) -> Decision {
    let team_id = team_id.to_string();
    Decision::Accepted {
        aggregate_id: team_id.clone(),
        occurred_at: command.occurred_at,
        events: vec![TeamEvent::TeamRegisteredV1(TeamRegisteredV1 {
            team_id,
            name: command.name.into_inner(),
            channel_ref: command.channel_ref.into_inner(),
            poll_schedule: command.poll_schedule.map(|s| s.into_inner()),
        })],
    }
}

/// Always accepted. Projecting an update for a team without a row is a no-op.
pub fn decide_update_team(command: ValidUpdateTeam) -> Decision {
    let team_id = command.team_id.into_inner();
    Decision::Accepted {
        aggregate_id: team_id.clone(),
        occurred_at: command.occurred_at,
        events: vec![TeamEvent::TeamUpdatedV1(TeamUpdatedV1 {
            team_id,
            name: command.name.into_inner(),
            channel_ref: command.channel_ref.into_inner(),
            poll_schedule: command.poll_schedule.map(|s| s.into_inner()),
        })],
    }
}
