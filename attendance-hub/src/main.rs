use attendance_hub::config::AppConfig;
use attendance_hub::database;
use attendance_hub::logging::{self, LOG_RETENTION_DAYS};
use attendance_hub::services::ServiceContainer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let (logging, _guard) = logging::init_logging(&config.log_dir)?;
    if let Err(e) = logging::cleanup_old_logs(logging.log_dir(), LOG_RETENTION_DAYS).await {
        tracing::warn!(error = %e, "Failed to cleanup old logs");
    }

    let pool = database::init_pool(&config.database_url).await?;
    database::run_migrations(&pool).await?;

    let container = ServiceContainer::new(&config, pool);

    tracing::info!(
        filter = logging.filter(),
        channels = ?container.router.registered_channels(),
        "attendance-hub initialized successfully"
    );

    container.pool.close().await;
    Ok(())
}
