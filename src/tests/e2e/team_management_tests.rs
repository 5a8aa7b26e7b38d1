use crate::modules::teams::core::commands::Command;
use crate::modules::teams::core::events::{TEAM_REGISTERED, TEAM_UPDATED};
use crate::modules::teams::use_cases::query_teams::queries_port::TeamQueries;
use crate::shared::infrastructure::event_store::EventStore;
use crate::shared::infrastructure::observability::NoopMetrics;
use crate::shell::state::AppState;
use crate::tests::fixtures::commands::{RegisterTeamBuilder, UpdateTeamBuilder};
use crate::tests::fixtures::events::at;
use std::sync::Arc;

#[tokio::test]
async fn registers_then_renames_a_team() {
    let state = AppState::in_memory(Arc::new(NoopMetrics));

    let registered = state
        .command_handler
        .handle(Command::RegisterTeam(
            RegisterTeamBuilder::new()
                .name("Engineering")
                .channel_ref("#eng")
                .occurred_at(at(0))
                .build(),
        ))
        .await
        .unwrap();
    let team_id = registered.aggregate_id;

    state.projector.rebuild().await.unwrap();
    let team = state.queries.get_team(&team_id).await.unwrap();
    assert_eq!(team.name, "Engineering");
    assert_eq!(team.channel_ref, "#eng");

    state
        .command_handler
        .handle(Command::UpdateTeam(
            UpdateTeamBuilder::new(&team_id)
                .name("Eng v2")
                .channel_ref("#eng")
                .occurred_at(at(60))
                .build(),
        ))
        .await
        .unwrap();

    state.projector.rebuild().await.unwrap();
    let team = state.queries.get_team(&team_id).await.unwrap();
    assert_eq!(team.name, "Eng v2");
    assert_eq!(team.created_at, at(0));
    assert_eq!(team.updated_at, at(60));

    let history = state.event_store.get_by_aggregate_id(&team_id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].event_type, TEAM_REGISTERED);
    assert_eq!(history[1].event_type, TEAM_UPDATED);
}

#[tokio::test]
async fn lists_registered_teams_by_name() {
    let state = AppState::in_memory(Arc::new(NoopMetrics));
    for name in ["Platform", "Data", "Mobile"] {
        state
            .command_handler
            .handle(Command::RegisterTeam(
                RegisterTeamBuilder::new()
                    .name(name)
                    .channel_ref(format!("#{}", name.to_lowercase()))
                    .poll_schedule(Some("0 9 * * 1-5".to_string()))
                    .build(),
            ))
            .await
            .unwrap();
    }

    state.projector.rebuild().await.unwrap();

    let teams = state.queries.list_teams().await.unwrap();
    let names: Vec<&str> = teams.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Data", "Mobile", "Platform"]);
    assert!(teams.iter().all(|t| t.poll_schedule.as_deref() == Some("0 9 * * 1-5")));
}
