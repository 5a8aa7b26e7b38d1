use crate::modules::teams::use_cases::project_read_models::model::{StatusUpdateRow, TeamRow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("team {0} not found")]
    TeamNotFound(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamSummary {
    pub team: TeamRow,
    pub total_updates: i64,
    pub last_update_at: Option<DateTime<Utc>>,
    pub unique_contributors: i64,
}

/// Read-only view over the projected tables.
#[async_trait]
pub trait TeamQueries: Send + Sync {
    async fn get_team(&self, team_id: &str) -> Result<TeamRow, QueryError>;

    /// Ordered by name.
    async fn list_teams(&self) -> Result<Vec<TeamRow>, QueryError>;

    /// Newest first.
    async fn list_team_updates(
        &self,
        team_id: &str,
        limit: u64,
    ) -> Result<Vec<StatusUpdateRow>, QueryError>;

    /// Newest first, across every team.
    async fn list_recent_updates(&self, limit: u64) -> Result<Vec<StatusUpdateRow>, QueryError>;

    /// Contributors are counted by distinct submitter.
    async fn team_summary(&self, team_id: &str) -> Result<TeamSummary, QueryError>;
}
