// Closed set of write intents.
//
// Each variant validates itself into value objects before any decision is made,
// so nothing downstream ever sees an unchecked string.

use crate::modules::teams::core::value_objects::{
    Author, ChannelRef, PollSchedule, SubmitterId, TeamId, TeamName, UpdateContent,
    ValidationError,
};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SubmitStatusUpdate(SubmitStatusUpdate),
    RegisterTeam(RegisterTeam),
    UpdateTeam(UpdateTeam),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::SubmitStatusUpdate(_) => "submit_status_update",
            Command::RegisterTeam(_) => "register_team",
            Command::UpdateTeam(_) => "update_team",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitStatusUpdate {
    pub team_id: String,
    /// Display name of the originating channel. Only used to auto-register an
    /// unknown team.
    pub channel_name: Option<String>,
    pub content: String,
    pub author: String,
    pub submitter: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSubmitStatusUpdate {
    pub team_id: TeamId,
    pub channel_name: Option<TeamName>,
    pub content: UpdateContent,
    pub author: Author,
    pub submitter: SubmitterId,
    pub submitted_at: DateTime<Utc>,
}

impl SubmitStatusUpdate {
    pub fn validate(&self) -> Result<ValidSubmitStatusUpdate, ValidationError> {
        let channel_name = match self.channel_name.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(name) => Some(TeamName::new(name)?),
        };
        Ok(ValidSubmitStatusUpdate {
            team_id: TeamId::new(self.team_id.clone())?,
            channel_name,
            content: UpdateContent::new(self.content.clone())?,
            author: Author::new(self.author.clone())?,
            submitter: SubmitterId::new(self.submitter.clone())?,
            submitted_at: self.submitted_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterTeam {
    pub name: String,
    pub channel_ref: String,
    pub poll_schedule: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRegisterTeam {
    pub name: TeamName,
    pub channel_ref: ChannelRef,
    pub poll_schedule: Option<PollSchedule>,
    pub occurred_at: DateTime<Utc>,
}

impl RegisterTeam {
    pub fn validate(&self) -> Result<ValidRegisterTeam, ValidationError> {
        Ok(ValidRegisterTeam {
            name: TeamName::new(&self.name)?,
            channel_ref: ChannelRef::new(self.channel_ref.clone())?,
            poll_schedule: PollSchedule::optional(self.poll_schedule.as_deref())?,
            occurred_at: self.occurred_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTeam {
    pub team_id: String,
    pub name: String,
    pub channel_ref: String,
    pub poll_schedule: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidUpdateTeam {
    pub team_id: TeamId,
    pub name: TeamName,
    pub channel_ref: ChannelRef,
    pub poll_schedule: Option<PollSchedule>,
    pub occurred_at: DateTime<Utc>,
}

impl UpdateTeam {
    pub fn validate(&self) -> Result<ValidUpdateTeam, ValidationError> {
        Ok(ValidUpdateTeam {
            team_id: TeamId::new(self.team_id.clone())?,
            name: TeamName::new(&self.name)?,
            channel_ref: ChannelRef::new(self.channel_ref.clone())?,
            poll_schedule: PollSchedule::optional(self.poll_schedule.as_deref())?,
            occurred_at: self.occurred_at,
        })
    }
}
