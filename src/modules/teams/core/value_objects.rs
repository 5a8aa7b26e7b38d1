// Constrained scalars used by commands.
//
// Every constructor either returns a value that satisfies its invariant or a
// ValidationError naming the offending field. Lengths are counted in chars.

use std::fmt;
use thiserror::Error;

pub const MAX_TEAM_ID_LEN: usize = 100;
pub const MAX_TEAM_NAME_LEN: usize = 100;
pub const MAX_POLL_SCHEDULE_LEN: usize = 100;
pub const MAX_UPDATE_CONTENT_LEN: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation error on {field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

fn non_empty(field: &'static str, label: &str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new(field, format!("{label} cannot be empty")));
    }
    Ok(())
}

fn at_most(
    field: &'static str,
    label: &str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::new(
            field,
            format!("{label} must be {max} characters or less"),
        ));
    }
    Ok(())
}

macro_rules! string_value {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_value!(TeamId);
string_value!(TeamName);
string_value!(ChannelRef);
string_value!(PollSchedule);
string_value!(UpdateContent);
string_value!(Author);
string_value!(SubmitterId);

impl TeamId {
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        non_empty("team_id", "team ID", &value)?;
        at_most("team_id", "team ID", &value, MAX_TEAM_ID_LEN)?;
        Ok(Self(value))
    }
}

impl TeamName {
    pub fn new(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        let trimmed = value.as_ref().trim();
        non_empty("name", "team name", trimmed)?;
        at_most("name", "team name", trimmed, MAX_TEAM_NAME_LEN)?;
        Ok(Self(trimmed.to_string()))
    }
}

impl ChannelRef {
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        non_empty("channel_ref", "channel reference", &value)?;
        Ok(Self(value))
    }
}

impl PollSchedule {
    pub fn new(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        let trimmed = value.as_ref().trim();
        non_empty("poll_schedule", "poll schedule", trimmed)?;
        at_most("poll_schedule", "poll schedule", trimmed, MAX_POLL_SCHEDULE_LEN)?;
        Ok(Self(trimmed.to_string()))
    }

    /// `None` stays `None`; a present schedule must be valid.
    pub fn optional(value: Option<&str>) -> Result<Option<Self>, ValidationError> {
        value.map(Self::new).transpose()
    }
}

impl UpdateContent {
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        non_empty("content", "update content", &value)?;
        at_most("content", "update content", &value, MAX_UPDATE_CONTENT_LEN)?;
        Ok(Self(value))
    }
}

impl Author {
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        non_empty("author", "author", &value)?;
        Ok(Self(value))
    }
}

impl SubmitterId {
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        non_empty("submitter", "submitter ID", &value)?;
        Ok(Self(value))
    }
}
