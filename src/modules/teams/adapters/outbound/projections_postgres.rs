// PostgreSQL read models.
//
// The projector writes through TeamProjectionRepository and request handlers
// read through TeamQueries; both run against the `teams` and `status_updates`
// tables created by the migrations.

use crate::modules::teams::use_cases::project_read_models::model::{
    StatusUpdateRow, TeamPatch, TeamRow,
};
use crate::modules::teams::use_cases::project_read_models::repository::TeamProjectionRepository;
use crate::modules::teams::use_cases::query_teams::queries_port::{
    QueryError, TeamQueries, TeamSummary,
};
use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const SELECT_TEAMS: &str =
    "SELECT team_id, name, channel_ref, poll_schedule, created_at, updated_at FROM teams";
const SELECT_UPDATES: &str =
    "SELECT update_id, team_id, content, author, submitter, created_at FROM status_updates";

#[derive(Debug, sqlx::FromRow)]
struct TeamRecord {
    team_id: String,
    name: String,
    channel_ref: String,
    poll_schedule: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TeamRecord> for TeamRow {
    fn from(r: TeamRecord) -> Self {
        TeamRow {
            team_id: r.team_id,
            name: r.name,
            channel_ref: r.channel_ref,
            poll_schedule: r.poll_schedule,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StatusUpdateRecord {
    update_id: Uuid,
    team_id: String,
    content: String,
    author: String,
    submitter: String,
    created_at: DateTime<Utc>,
}

impl From<StatusUpdateRecord> for StatusUpdateRow {
    fn from(r: StatusUpdateRecord) -> Self {
        StatusUpdateRow {
            update_id: r.update_id,
            team_id: r.team_id,
            content: r.content,
            author: r.author,
            submitter: r.submitter,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SummaryRecord {
    #[sqlx(flatten)]
    team: TeamRecord,
    total_updates: i64,
    last_update_at: Option<DateTime<Utc>>,
    unique_contributors: i64,
}

#[derive(Clone)]
pub struct PostgresProjections {
    pool: PgPool,
}

impl PostgresProjections {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn clamp_limit(limit: u64) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait::async_trait]
impl TeamProjectionRepository for PostgresProjections {
    async fn insert_team(&self, row: TeamRow) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO teams (team_id, name, channel_ref, poll_schedule, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (team_id) DO NOTHING
            "#,
        )
        .bind(&row.team_id)
        .bind(&row.name)
        .bind(&row.channel_ref)
        .bind(&row.poll_schedule)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("insert team {}", row.team_id))?;
        Ok(())
    }

    async fn update_team(&self, patch: TeamPatch) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE teams
            SET name = $2, channel_ref = $3, poll_schedule = $4, updated_at = $5
            WHERE team_id = $1 AND updated_at <= $5
            "#,
        )
        .bind(&patch.team_id)
        .bind(&patch.name)
        .bind(&patch.channel_ref)
        .bind(&patch.poll_schedule)
        .bind(patch.updated_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("update team {}", patch.team_id))?;
        Ok(())
    }

    async fn insert_status_update(&self, row: StatusUpdateRow) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO status_updates (update_id, team_id, content, author, submitter, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (update_id) DO NOTHING
            "#,
        )
        .bind(row.update_id)
        .bind(&row.team_id)
        .bind(&row.content)
        .bind(&row.author)
        .bind(&row.submitter)
        .bind(row.created_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("insert status update {} for team {}", row.update_id, row.team_id))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl TeamQueries for PostgresProjections {
    async fn get_team(&self, team_id: &str) -> Result<TeamRow, QueryError> {
        let record = sqlx::query_as::<_, TeamRecord>(&format!("{SELECT_TEAMS} WHERE team_id = $1"))
            .bind(team_id)
            .fetch_optional(&self.pool)
            .await
            .context("get team")?;
        record
            .map(TeamRow::from)
            .ok_or_else(|| QueryError::TeamNotFound(team_id.to_string()))
    }

    async fn list_teams(&self) -> Result<Vec<TeamRow>, QueryError> {
        let records = sqlx::query_as::<_, TeamRecord>(&format!("{SELECT_TEAMS} ORDER BY name, team_id"))
            .fetch_all(&self.pool)
            .await
            .context("list teams")?;
        Ok(records.into_iter().map(TeamRow::from).collect())
    }

    async fn list_team_updates(
        &self,
        team_id: &str,
        limit: u64,
    ) -> Result<Vec<StatusUpdateRow>, QueryError> {
        let records = sqlx::query_as::<_, StatusUpdateRecord>(&format!(
            "{SELECT_UPDATES} WHERE team_id = $1 ORDER BY created_at DESC, update_id DESC LIMIT $2"
        ))
        .bind(team_id)
        .bind(clamp_limit(limit))
        .fetch_all(&self.pool)
        .await
        .context("list team updates")?;
        Ok(records.into_iter().map(StatusUpdateRow::from).collect())
    }

    async fn list_recent_updates(&self, limit: u64) -> Result<Vec<StatusUpdateRow>, QueryError> {
        let records = sqlx::query_as::<_, StatusUpdateRecord>(&format!(
            "{SELECT_UPDATES} ORDER BY created_at DESC, update_id DESC LIMIT $1"
        ))
        .bind(clamp_limit(limit))
        .fetch_all(&self.pool)
        .await
        .context("list recent updates")?;
        Ok(records.into_iter().map(StatusUpdateRow::from).collect())
    }

    async fn team_summary(&self, team_id: &str) -> Result<TeamSummary, QueryError> {
        let record = sqlx::query_as::<_, SummaryRecord>(
            r#"
            SELECT t.team_id, t.name, t.channel_ref, t.poll_schedule, t.created_at, t.updated_at,
                   COUNT(s.update_id) AS total_updates,
                   MAX(s.created_at) AS last_update_at,
                   COUNT(DISTINCT s.submitter) AS unique_contributors
            FROM teams t
            LEFT JOIN status_updates s ON s.team_id = t.team_id
            WHERE t.team_id = $1
            GROUP BY t.team_id
            "#,
        )
        .bind(team_id)
        .fetch_optional(&self.pool)
        .await
        .context("team summary")?;

        let record = record.ok_or_else(|| QueryError::TeamNotFound(team_id.to_string()))?;
        Ok(TeamSummary {
            team: record.team.into(),
            total_updates: record.total_updates,
            last_update_at: record.last_update_at,
            unique_contributors: record.unique_contributors,
        })
    }
}
