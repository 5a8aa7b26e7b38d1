use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use team_status::shared::infrastructure::observability::{Metrics, MetricsFacade, NoopMetrics};
use team_status::shell::config::Settings;
use team_status::shell::state::AppState;
use team_status::shell::workers::Workers;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))?;
    fmt().with_env_filter(filter).init();

    let metrics: Arc<dyn Metrics> = match settings.metrics_addr {
        Some(addr) => {
            PrometheusBuilder::new().with_http_listener(addr).install()?;
            MetricsFacade::describe();
            tracing::info!(%addr, "prometheus exporter listening");
            Arc::new(MetricsFacade)
        }
        None => Arc::new(NoopMetrics),
    };

    let state = AppState::postgres(&settings, metrics).await?;
    let workers = Workers::spawn(&state, CancellationToken::new()).await?;
    tracing::info!("team status service running, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    workers.shutdown().await;
    state.event_store.close().await;
    Ok(())
}
