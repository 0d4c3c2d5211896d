//! Dashport Server — application entry point.

use std::sync::Arc;

use dashport_access::GoTrueClient;
use dashport_db::DbManager;
use dashport_server::{AppState, ServerConfig, router};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dashport=info"));
    tracing_subscriber::fmt().with_env_filter(filter).json().init();

    tracing::info!("Starting dashport server...");

    let config = ServerConfig::from_env()?;

    let db = DbManager::connect(&config.db).await?;
    db.migrate().await?;

    let identity = Arc::new(GoTrueClient::new(config.identity.clone()));
    let state = AppState::new(db.store(), identity, config.access.clone(), config.embed.clone());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "Listening");
    axum::serve(listener, router(state)).await?;

    tracing::info!("Dashport server stopped.");
    Ok(())
}
