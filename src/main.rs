use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use bookings::config::AppConfig;
use bookings::db;
use bookings::handlers;
use bookings::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    anyhow::ensure!(
        config.recent_reservations_limit > 0,
        "RECENT_RESERVATIONS_LIMIT must be positive"
    );
    if config.admin_token == "changeme" {
        tracing::warn!("ADMIN_TOKEN is not set; using the default token");
    }

    let conn = db::init_db_with_timeout(
        &config.database_url,
        Duration::from_millis(config.busy_timeout_ms),
    )?;
    tracing::info!(database = %config.database_url, "database ready");

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
    });

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
