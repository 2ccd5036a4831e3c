use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use pulselytics_server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise structured JSON logging. Level controlled via RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pulselytics=info".parse()?),
        )
        .json()
        .init();

    let cfg = pulselytics_core::config::Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    // Ensure the data directory exists before opening DuckDB.
    std::fs::create_dir_all(&cfg.data_dir)?;
    let db_path = format!("{}/pulselytics.db", cfg.data_dir);

    // Open DuckDB — initialises the schema and the event id sequence.
    let db = pulselytics_duckdb::DuckDbBackend::open(&db_path, &cfg.duckdb_memory_limit)?;

    let state = Arc::new(AppState::new(db, cfg.clone()));

    // Spawn the hourly profile refresh loop. First tick fires one full
    // interval after startup, never immediately.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            pulselytics_server::scheduler::run_profile_refresh_loop(state).await;
        });
    }

    let addr = format!("0.0.0.0:{}", cfg.port);
    let app = pulselytics_server::app::build_app(Arc::clone(&state));

    info!(port = cfg.port, "Pulselytics listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}
