use crate::modules::teams::core::events::TeamEvent;
use crate::modules::teams::core::state::TeamState;

pub fn evolve(state: TeamState, event: TeamEvent) -> TeamState {
    match (state, event) {
        (
            TeamState::Untracked | TeamState::Unregistered,
            TeamEvent::TeamRegisteredV1(e),
        ) => TeamState::Registered {
            team_id: e.team_id,
            name: e.name,
            channel_ref: e.channel_ref,
            poll_schedule: e.poll_schedule,
        },
        (TeamState::Registered { team_id, .. }, TeamEvent::TeamUpdatedV1(e)) => {
            TeamState::Registered {
                team_id,
                name: e.name,
                channel_ref: e.channel_ref,
                poll_schedule: e.poll_schedule,
            }
        }
        (TeamState::Untracked, _) => TeamState::Unregistered,
        (state, _) => state,
    }
}
