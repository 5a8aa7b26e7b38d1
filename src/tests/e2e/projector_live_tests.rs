use crate::modules::teams::adapters::outbound::projections_in_memory::InMemoryProjections;
use crate::modules::teams::core::commands::Command;
use crate::modules::teams::use_cases::handle_command::handler::CommandHandler;
use crate::modules::teams::use_cases::project_read_models::model::TeamRow;
use crate::modules::teams::use_cases::project_read_models::projector::Projector;
use crate::modules::teams::use_cases::query_teams::queries_port::{QueryError, TeamQueries};
use crate::shared::infrastructure::event_store::EventStore;
use crate::shared::infrastructure::event_store::in_memory::InMemoryEventStore;
use crate::shared::infrastructure::observability::NoopMetrics;
use crate::shell::state::AppState;
use crate::shell::workers::Workers;
use crate::tests::fixtures::commands::{SubmitStatusUpdateBuilder, UpdateTeamBuilder};
use crate::tests::fixtures::events::{at, submitted_event, updated_event};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

async fn eventually<T, F, Fut>(mut probe: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if let Some(value) = probe().await {
                return value;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("read model did not catch up in time")
}

async fn team_named(queries: &dyn TeamQueries, team_id: &str, name: &str) -> Option<TeamRow> {
    match queries.get_team(team_id).await {
        Ok(team) if team.name == name => Some(team),
        Ok(_) | Err(QueryError::TeamNotFound(_)) => None,
        Err(error) => panic!("query failed: {error}"),
    }
}

fn submit(team_id: &str, submitter: &str, secs: i64) -> Command {
    Command::SubmitStatusUpdate(
        SubmitStatusUpdateBuilder::new()
            .team_id(team_id)
            .channel_name(Some("live".to_string()))
            .submitter(submitter)
            .submitted_at(at(secs))
            .build(),
    )
}

#[tokio::test]
async fn rebuilds_history_then_follows_new_events() {
    let state = AppState::in_memory(Arc::new(NoopMetrics));
    state.command_handler.handle(submit("C-LIVE", "U1", 0)).await.unwrap();

    let workers = Workers::spawn(&state, CancellationToken::new()).await.unwrap();
    assert!(state.queries.get_team("C-LIVE").await.is_ok());

    state.command_handler.handle(submit("C-LIVE", "U2", 10)).await.unwrap();
    state
        .command_handler
        .handle(Command::UpdateTeam(
            UpdateTeamBuilder::new("C-LIVE").name("Live Ops").occurred_at(at(20)).build(),
        ))
        .await
        .unwrap();

    eventually(|| team_named(state.queries.as_ref(), "C-LIVE", "Live Ops")).await;
    let queries = state.queries.clone();
    let updates = eventually(|| {
        let queries = queries.clone();
        async move {
            let updates = queries.list_team_updates("C-LIVE", 10).await.ok()?;
            (updates.len() == 2).then_some(updates)
        }
    })
    .await;
    assert_eq!(updates[0].submitter, "U2");

    workers.shutdown().await;
}

#[tokio::test]
async fn keeps_following_after_a_failing_event() {
    let state = AppState::in_memory(Arc::new(NoopMetrics));
    let workers = Workers::spawn(&state, CancellationToken::new()).await.unwrap();

    // A status update for a team nobody registered fails to project.
    let orphan = submitted_event("C-GHOST", "U1", at(0), 1);
    state.event_store.append(orphan).await.unwrap();
    state.command_handler.handle(submit("C-REAL", "U1", 1)).await.unwrap();

    eventually(|| team_named(state.queries.as_ref(), "C-REAL", "live")).await;
    assert!(workers.is_running());
    assert!(state.queries.get_team("C-GHOST").await.is_err());

    workers.shutdown().await;
}

#[tokio::test]
async fn missed_notifications_are_recovered_by_the_next_rebuild() {
    let mut store = InMemoryEventStore::new();
    store.toggle_notifications();
    let store = Arc::new(store);
    let projections = Arc::new(InMemoryProjections::new());
    let projector = Arc::new(Projector::new(
        "teams",
        store.clone(),
        projections.clone(),
        Arc::new(NoopMetrics),
    ));
    let handler = CommandHandler::new(store.clone());

    let cancel = CancellationToken::new();
    let live = projector.clone().start(cancel.clone()).await.unwrap();
    handler.handle(submit("C-MUTE", "U1", 0)).await.unwrap();
    store.append(updated_event("C-MUTE", "Renamed", at(5), 3)).await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(projections.get_team("C-MUTE").await.is_err());

    let report = projector.rebuild().await.unwrap();
    assert_eq!(report.applied, 3);
    assert_eq!(projections.get_team("C-MUTE").await.unwrap().name, "Renamed");

    cancel.cancel();
    live.await.unwrap();
}

#[tokio::test]
async fn backdated_commands_project_the_same_live_and_on_rebuild() {
    let state = AppState::in_memory(Arc::new(NoopMetrics));
    let workers = Workers::spawn(&state, CancellationToken::new()).await.unwrap();

    state.command_handler.handle(submit("C-X", "U1", 100)).await.unwrap();
    state.command_handler.handle(submit("C-X", "U2", 50)).await.unwrap();
    state
        .command_handler
        .handle(Command::UpdateTeam(
            UpdateTeamBuilder::new("C-X").name("Renamed").occurred_at(at(10)).build(),
        ))
        .await
        .unwrap();

    let live_team = eventually(|| team_named(state.queries.as_ref(), "C-X", "Renamed")).await;
    let queries = state.queries.clone();
    let live_updates = eventually(|| {
        let queries = queries.clone();
        async move {
            let updates = queries.list_team_updates("C-X", 10).await.ok()?;
            (updates.len() == 2).then_some(updates)
        }
    })
    .await;
    workers.shutdown().await;

    let fresh = Arc::new(InMemoryProjections::new());
    let report = Projector::new("fresh", state.event_store.clone(), fresh.clone(), Arc::new(NoopMetrics))
        .rebuild()
        .await
        .unwrap();
    assert_eq!(report.failed, 0);
    assert_eq!(fresh.get_team("C-X").await.unwrap(), live_team);
    assert_eq!(fresh.list_team_updates("C-X", 10).await.unwrap(), live_updates);
    assert_eq!(live_updates[1].created_at, at(50));
}
