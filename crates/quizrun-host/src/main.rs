//! Quizrun host entry point.

use std::error::Error;
use std::sync::Arc;

use quizrun_core::clock::SystemClock;
use quizrun_core::repository::EventRepository;
use quizrun_event_store::in_memory_event_repository::InMemoryEventRepository;
use quizrun_event_store::pg_event_repository::PgEventRepository;
use quizrun_event_store::schema::CREATE_EVENTS_TABLE;
use quizrun_host::config::HostConfig;
use quizrun_host::error::AppError;
use quizrun_host::telemetry;
use quizrun_runtime::{LocalRuntime, TracingPresentationSink};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

async fn open_repository(config: &HostConfig) -> Result<Arc<dyn EventRepository>, AppError> {
    let Some(database_url) = &config.database_url else {
        warn!("DATABASE_URL not set; sessions will not survive a restart");
        return Ok(Arc::new(InMemoryEventRepository::new()));
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(database_url)
        .await?;
    sqlx::raw_sql(CREATE_EVENTS_TABLE).execute(&pool).await?;
    info!("connected to event store");
    Ok(Arc::new(PgEventRepository::new(pool)))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = HostConfig::from_env()?;
    let telemetry = telemetry::init(&config)?;

    info!(
        reveal_secs = config.settings.reveal_duration.as_secs(),
        summary_policy = %config.settings.summary_policy,
        "Starting quizrun host"
    );

    let repository = open_repository(&config).await?;
    let runtime = Arc::new(LocalRuntime::new(
        Arc::new(SystemClock),
        repository,
        Arc::new(TracingPresentationSink::new()),
        config.settings,
    ));

    let resumed = runtime.recover().await.map_err(AppError::from)?;
    info!(resumed, "recovered running sessions");

    tokio::signal::ctrl_c().await.map_err(AppError::from)?;
    info!("shutting down; running sessions stay resumable");
    runtime.shutdown().await;
    telemetry.shutdown();

    Ok(())
}
