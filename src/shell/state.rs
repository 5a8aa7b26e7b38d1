use crate::modules::teams::adapters::outbound::projections_in_memory::InMemoryProjections;
use crate::modules::teams::adapters::outbound::projections_postgres::PostgresProjections;
use crate::modules::teams::use_cases::handle_command::handler::CommandHandler;
use crate::modules::teams::use_cases::project_read_models::projector::{DEFAULT_PAGE_SIZE, Projector};
use crate::modules::teams::use_cases::project_read_models::repository::TeamProjectionRepository;
use crate::modules::teams::use_cases::query_teams::queries_port::TeamQueries;
use crate::shared::infrastructure::event_store::EventStore;
use crate::shared::infrastructure::event_store::in_memory::InMemoryEventStore;
use crate::shared::infrastructure::event_store::postgres::{MIGRATOR, PostgresEventStore};
use crate::shared::infrastructure::observability::Metrics;
use crate::shell::config::Settings;
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

pub const PROJECTOR_NAME: &str = "teams";

pub type TeamProjector = Projector<dyn EventStore, dyn TeamProjectionRepository>;

#[derive(Clone)]
pub struct AppState {
    pub event_store: Arc<dyn EventStore>,
    pub command_handler: Arc<CommandHandler<dyn EventStore>>,
    pub queries: Arc<dyn TeamQueries>,
    pub projector: Arc<TeamProjector>,
}

impl AppState {
    fn assemble(
        event_store: Arc<dyn EventStore>,
        repository: Arc<dyn TeamProjectionRepository>,
        queries: Arc<dyn TeamQueries>,
        metrics: Arc<dyn Metrics>,
        page_size: u64,
    ) -> Self {
        let command_handler = Arc::new(CommandHandler::new(event_store.clone()));
        let projector = Arc::new(
            Projector::new(PROJECTOR_NAME, event_store.clone(), repository, metrics)
                .with_page_size(page_size),
        );
        Self {
            event_store,
            command_handler,
            queries,
            projector,
        }
    }

    /// Everything in process memory. Used by tests and local experiments.
    pub fn in_memory(metrics: Arc<dyn Metrics>) -> Self {
        let event_store: Arc<dyn EventStore> =
            Arc::new(InMemoryEventStore::with_metrics(metrics.clone()));
        let projections = Arc::new(InMemoryProjections::new());
        Self::assemble(
            event_store,
            projections.clone(),
            projections,
            metrics,
            DEFAULT_PAGE_SIZE,
        )
    }

    pub async fn postgres(settings: &Settings, metrics: Arc<dyn Metrics>) -> anyhow::Result<Self> {
        let event_store = PostgresEventStore::connect(
            &settings.database_url,
            settings.max_connections,
            settings.subscription(),
            metrics.clone(),
        )
        .await
        .context("connect to the event store")?;

        let shared_database = settings.projection_database_url() == settings.database_url;
        let projection_pool = if shared_database {
            event_store.pool().clone()
        } else {
            PgPoolOptions::new()
                .max_connections(settings.max_connections)
                .connect(settings.projection_database_url())
                .await
                .context("connect to the read model database")?
        };

        if settings.run_migrations {
            event_store.migrate().await.context("migrate the event store")?;
            if !shared_database {
                MIGRATOR
                    .run(&projection_pool)
                    .await
                    .context("migrate the read model database")?;
            }
            tracing::info!("migrations applied");
        }

        let projections = Arc::new(PostgresProjections::new(projection_pool));
        Ok(Self::assemble(
            Arc::new(event_store),
            projections.clone(),
            projections,
            metrics,
            settings.rebuild_page_size,
        ))
    }
}
