use std::time::Duration;

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, ConnectionTrait};
use settings::Database;

mod settings;

const DEFAULT_REPORTS_DIR: &str = "static/reports";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "balance_service={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let Some(server) = settings.server else {
        tracing::warn!("no [server] settings found, nothing to run");
        return Ok(());
    };

    tracing::info!("Found server settings...");
    let db = parse_database(&server.database).await?;

    let mut builder = engine::Engine::builder().database(db);
    if let Some(ms) = server.timeout_ms {
        builder = builder.default_timeout(Duration::from_millis(ms));
    }
    let engine = builder.build().await?;

    let reports = server::ReportFiles::new(
        server
            .reports_dir
            .unwrap_or_else(|| DEFAULT_REPORTS_DIR.to_string()),
    );

    let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
    let addr = format!("{}:{}", bind, server.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    server::run_with_listener(server::ServerState::new(engine, reports), listener).await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let mut options = match config {
        Database::Memory => {
            // Every pooled connection would open its own empty in-memory database.
            let mut options = ConnectOptions::new("sqlite::memory:");
            options.max_connections(1).min_connections(1);
            options
        }
        Database::Sqlite(path) => ConnectOptions::new(format!("sqlite:{}?mode=rwc", path)),
        Database::Postgres(url) => ConnectOptions::new(url.as_str()),
    };
    options.sqlx_logging(false);

    let database = sea_orm::Database::connect(options).await?;
    Migrator::up(&database, None).await?;
    tracing::info!(backend = ?database.get_database_backend(), "database ready");
    Ok(database)
}
