use crate::modules::teams::core::commands::Command;
use crate::modules::teams::use_cases::handle_command::handler::ApplicationError;
use crate::modules::teams::use_cases::query_teams::queries_port::TeamQueries;
use crate::shared::infrastructure::event_store::EventStore;
use crate::shared::infrastructure::observability::{NoopMetrics, RecordingMetrics, names};
use crate::shell::state::AppState;
use crate::tests::fixtures::commands::SubmitStatusUpdateBuilder;
use crate::tests::fixtures::events::at;
use std::sync::Arc;

fn submit(team_id: &str, channel_name: Option<&str>, submitter: &str, secs: i64) -> Command {
    Command::SubmitStatusUpdate(
        SubmitStatusUpdateBuilder::new()
            .team_id(team_id)
            .channel_name(channel_name.map(str::to_string))
            .submitter(submitter)
            .content(format!("{submitter} update at {secs}"))
            .submitted_at(at(secs))
            .build(),
    )
}

#[tokio::test]
async fn first_submission_registers_the_channel_as_a_team() {
    let state = AppState::in_memory(Arc::new(NoopMetrics));

    state
        .command_handler
        .handle(submit("C-OPS", Some("ops-standup"), "U1", 0))
        .await
        .unwrap();
    state
        .command_handler
        .handle(submit("C-OPS", None, "U2", 30))
        .await
        .unwrap();
    state.projector.rebuild().await.unwrap();

    let team = state.queries.get_team("C-OPS").await.unwrap();
    assert_eq!(team.name, "ops-standup");
    assert_eq!(team.channel_ref, "C-OPS");

    let updates = state.queries.list_team_updates("C-OPS", 10).await.unwrap();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].submitter, "U2");
}

#[tokio::test]
async fn unnamed_first_submission_leaves_no_trace() {
    let state = AppState::in_memory(Arc::new(NoopMetrics));

    let error = state
        .command_handler
        .handle(submit("C-QUIET", None, "U1", 0))
        .await
        .unwrap_err();

    assert!(matches!(error, ApplicationError::Domain(_)));
    assert!(state.event_store.get_by_aggregate_id("C-QUIET").await.unwrap().is_empty());
    state.projector.rebuild().await.unwrap();
    assert!(state.queries.get_team("C-QUIET").await.is_err());
}

#[tokio::test]
async fn summary_counts_distinct_submitters() {
    let metrics = Arc::new(RecordingMetrics::new());
    let state = AppState::in_memory(metrics.clone());

    for (submitter, secs) in [("U1", 10), ("U2", 20), ("U1", 30), ("U3", 40)] {
        state
            .command_handler
            .handle(submit("C-ENG", Some("eng"), submitter, secs))
            .await
            .unwrap();
    }
    state.projector.rebuild().await.unwrap();
    state.projector.rebuild().await.unwrap();

    let summary = state.queries.team_summary("C-ENG").await.unwrap();
    assert_eq!(summary.total_updates, 4);
    assert_eq!(summary.unique_contributors, 3);
    assert_eq!(summary.last_update_at, Some(at(40)));

    let recent = state.queries.list_recent_updates(3).await.unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].created_at, at(40));

    assert_eq!(
        metrics.counter(
            names::EVENTS_STORED_TOTAL,
            &[("event_type", "status_update.submitted".to_string())]
        ),
        4
    );
    assert_eq!(
        metrics.counter(
            names::EVENTS_STORED_TOTAL,
            &[("event_type", "team.registered".to_string())]
        ),
        1
    );
}
