#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeamState {
    /// No events at all for this aggregate.
    Untracked,
    /// History exists but holds no registration.
    Unregistered,
    Registered {
        team_id: String,
        name: String,
        channel_ref: String,
        poll_schedule: Option<String>,
    },
}

impl TeamState {
    pub fn is_registered(&self) -> bool {
        matches!(self, TeamState::Registered { .. })
    }

    pub fn has_history(&self) -> bool {
        !matches!(self, TeamState::Untracked)
    }
}
