use crate::modules::teams::use_cases::project_read_models::model::{
    StatusUpdateRow, TeamPatch, TeamRow,
};
use async_trait::async_trait;

/// Write side of the read models. Owned by the projector; every operation is
/// safe to repeat with the same input.
#[async_trait]
pub trait TeamProjectionRepository: Send + Sync {
    /// No-op when the team already exists.
    async fn insert_team(&self, row: TeamRow) -> anyhow::Result<()>;

    /// Applies the patch when it is not older than the row's `updated_at`.
    /// A missing row is left missing.
    async fn update_team(&self, patch: TeamPatch) -> anyhow::Result<()>;

    /// No-op on a duplicate update id. Fails when the team row does not exist.
    async fn insert_status_update(&self, row: StatusUpdateRow) -> anyhow::Result<()>;
}
