// In memory read models.
//
// Purpose
// - Exercise the projector and the query port without a database.
//
// Responsibilities
// - Keep team and status update rows keyed by their primary keys.
// - Enforce the same conflict rules as the relational schema: first insert wins,
//   stale team patches are skipped, status updates need an existing team.

use crate::modules::teams::use_cases::project_read_models::model::{
    StatusUpdateRow, TeamPatch, TeamRow,
};
use crate::modules::teams::use_cases::project_read_models::repository::TeamProjectionRepository;
use crate::modules::teams::use_cases::query_teams::queries_port::{
    QueryError, TeamQueries, TeamSummary,
};
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryProjections {
    teams: RwLock<BTreeMap<String, TeamRow>>,
    updates: RwLock<BTreeMap<Uuid, StatusUpdateRow>>,
    is_offline: bool,
}

impl InMemoryProjections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_offline(&mut self) {
        self.is_offline = !self.is_offline;
    }

    /// Every row, teams by id and updates by update id.
    pub async fn snapshot(&self) -> (Vec<TeamRow>, Vec<StatusUpdateRow>) {
        let teams = self.teams.read().await.values().cloned().collect();
        let updates = self.updates.read().await.values().cloned().collect();
        (teams, updates)
    }

    fn ensure_online(&self) -> anyhow::Result<()> {
        if self.is_offline {
            return Err(anyhow::anyhow!("Projections repository offline"));
        }
        Ok(())
    }

    async fn newest_first<F>(&self, keep: F, limit: u64) -> Vec<StatusUpdateRow>
    where
        F: Fn(&StatusUpdateRow) -> bool,
    {
        let guard = self.updates.read().await;
        let mut rows: Vec<StatusUpdateRow> = guard.values().filter(|r| keep(r)).cloned().collect();
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.update_id.cmp(&a.update_id))
        });
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        rows
    }
}

#[async_trait::async_trait]
impl TeamProjectionRepository for InMemoryProjections {
    async fn insert_team(&self, row: TeamRow) -> anyhow::Result<()> {
        self.ensure_online()?;
        self.teams
            .write()
            .await
            .entry(row.team_id.clone())
            .or_insert(row);
        Ok(())
    }

    async fn update_team(&self, patch: TeamPatch) -> anyhow::Result<()> {
        self.ensure_online()?;
        if let Some(row) = self.teams.write().await.get_mut(&patch.team_id) {
            patch.apply_to(row);
        }
        Ok(())
    }

    async fn insert_status_update(&self, row: StatusUpdateRow) -> anyhow::Result<()> {
        self.ensure_online()?;
        if !self.teams.read().await.contains_key(&row.team_id) {
            anyhow::bail!(
                "status update {} references unknown team {}",
                row.update_id,
                row.team_id
            );
        }
        self.updates
            .write()
            .await
            .entry(row.update_id)
            .or_insert(row);
        Ok(())
    }
}

#[async_trait::async_trait]
impl TeamQueries for InMemoryProjections {
    async fn get_team(&self, team_id: &str) -> Result<TeamRow, QueryError> {
        self.ensure_online()?;
        self.teams
            .read()
            .await
            .get(team_id)
            .cloned()
            .ok_or_else(|| QueryError::TeamNotFound(team_id.to_string()))
    }

    async fn list_teams(&self) -> Result<Vec<TeamRow>, QueryError> {
        self.ensure_online()?;
        let mut teams: Vec<TeamRow> = self.teams.read().await.values().cloned().collect();
        teams.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.team_id.cmp(&b.team_id)));
        Ok(teams)
    }

    async fn list_team_updates(
        &self,
        team_id: &str,
        limit: u64,
    ) -> Result<Vec<StatusUpdateRow>, QueryError> {
        self.ensure_online()?;
        Ok(self.newest_first(|r| r.team_id == team_id, limit).await)
    }

    async fn list_recent_updates(&self, limit: u64) -> Result<Vec<StatusUpdateRow>, QueryError> {
        self.ensure_online()?;
        Ok(self.newest_first(|_| true, limit).await)
    }

    async fn team_summary(&self, team_id: &str) -> Result<TeamSummary, QueryError> {
        let team = self.get_team(team_id).await?;
        let guard = self.updates.read().await;
        let updates: Vec<&StatusUpdateRow> = guard.values().filter(|r| r.team_id == team_id).collect();
        let contributors: HashSet<&str> = updates.iter().map(|r| r.submitter.as_str()).collect();

        Ok(TeamSummary {
            team,
            total_updates: updates.len() as i64,
            last_update_at: updates.iter().map(|r| r.created_at).max(),
            unique_contributors: contributors.len() as i64,
        })
    }
}
