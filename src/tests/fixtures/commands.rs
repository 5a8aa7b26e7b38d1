// Builders for command fixtures. Defaults describe a valid command.

use crate::modules::teams::core::commands::{RegisterTeam, SubmitStatusUpdate, UpdateTeam};
use crate::tests::fixtures::events::at;
use chrono::{DateTime, Utc};

pub struct SubmitStatusUpdateBuilder {
    inner: SubmitStatusUpdate,
}

impl Default for SubmitStatusUpdateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
impl SubmitStatusUpdateBuilder {
    pub fn new() -> Self {
        Self {
            inner: SubmitStatusUpdate {
                team_id: "C-ENG".to_string(),
                channel_name: Some("eng".to_string()),
                content: "Deployed the new billing pipeline".to_string(),
                author: "Ada".to_string(),
                submitter: "U1".to_string(),
                submitted_at: at(0),
            },
        }
    }

    pub fn team_id(mut self, v: impl Into<String>) -> Self {
        self.inner.team_id = v.into();
        self
    }

    pub fn channel_name(mut self, v: Option<String>) -> Self {
        self.inner.channel_name = v;
        self
    }

    pub fn content(mut self, v: impl Into<String>) -> Self {
        self.inner.content = v.into();
        self
    }

    pub fn author(mut self, v: impl Into<String>) -> Self {
        self.inner.author = v.into();
        self
    }

    pub fn submitter(mut self, v: impl Into<String>) -> Self {
        self.inner.submitter = v.into();
        self
    }

    pub fn submitted_at(mut self, v: DateTime<Utc>) -> Self {
        self.inner.submitted_at = v;
        self
    }

    pub fn build(self) -> SubmitStatusUpdate {
        self.inner
    }
}

pub struct RegisterTeamBuilder {
    inner: RegisterTeam,
}

impl Default for RegisterTeamBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
impl RegisterTeamBuilder {
    pub fn new() -> Self {
        Self {
            inner: RegisterTeam {
                name: "Engineering".to_string(),
                channel_ref: "#eng".to_string(),
                poll_schedule: None,
                occurred_at: at(0),
            },
        }
    }

    pub fn name(mut self, v: impl Into<String>) -> Self {
        self.inner.name = v.into();
        self
    }

    pub fn channel_ref(mut self, v: impl Into<String>) -> Self {
        self.inner.channel_ref = v.into();
        self
    }

    pub fn poll_schedule(mut self, v: Option<String>) -> Self {
        self.inner.poll_schedule = v;
        self
    }

    pub fn occurred_at(mut self, v: DateTime<Utc>) -> Self {
        self.inner.occurred_at = v;
        self
    }

    pub fn build(self) -> RegisterTeam {
        self.inner
    }
}

pub struct UpdateTeamBuilder {
    inner: UpdateTeam,
}

#[allow(dead_code)]
impl UpdateTeamBuilder {
    pub fn new(team_id: impl Into<String>) -> Self {
        Self {
            inner: UpdateTeam {
                team_id: team_id.into(),
                name: "Engineering".to_string(),
                channel_ref: "#eng".to_string(),
                poll_schedule: None,
                occurred_at: at(1),
            },
        }
    }

    pub fn name(mut self, v: impl Into<String>) -> Self {
        self.inner.name = v.into();
        self
    }

    pub fn channel_ref(mut self, v: impl Into<String>) -> Self {
        self.inner.channel_ref = v.into();
        self
    }

    pub fn poll_schedule(mut self, v: Option<String>) -> Self {
        self.inner.poll_schedule = v;
        self
    }

    pub fn occurred_at(mut self, v: DateTime<Utc>) -> Self {
        self.inner.occurred_at = v;
        self
    }

    pub fn build(self) -> UpdateTeam {
        self.inner
    }
}

#[cfg(test)]
mod command_builder_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn defaults_build_valid_commands() {
        assert!(SubmitStatusUpdateBuilder::default().build().validate().is_ok());
        assert!(RegisterTeamBuilder::default().build().validate().is_ok());
        assert!(UpdateTeamBuilder::new("C-ENG").build().validate().is_ok());
    }

    #[rstest]
    fn setters_override_fields() {
        let command = SubmitStatusUpdateBuilder::new()
            .team_id("C-OPS")
            .channel_name(None)
            .author("Grace")
            .submitted_at(at(9))
            .build();
        assert_eq!(command.team_id, "C-OPS");
        assert_eq!(command.channel_name, None);
        assert_eq!(command.author, "Grace");
        assert_eq!(command.submitted_at, at(9));
    }
}
