use crate::modules::teams::use_cases::project_read_models::projector::ProjectorError;
use crate::shell::state::AppState;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct Workers {
    cancel: CancellationToken,
    projector: JoinHandle<()>,
}

impl Workers {
    /// Rebuilds the read models, then leaves the projector applying live
    /// events until `shutdown`.
    pub async fn spawn(state: &AppState, cancel: CancellationToken) -> Result<Self, ProjectorError> {
        let projector = state.projector.clone().start(cancel.clone()).await?;
        Ok(Self { cancel, projector })
    }

    pub fn is_running(&self) -> bool {
        !self.projector.is_finished()
    }

    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(error) = self.projector.await {
            tracing::error!(error = %error, "projector task ended abnormally");
        }
    }
}
