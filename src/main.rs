//! quest-ledger worker entry point.
//!
//! Builds the engine, relays notifications to the log and the store, and
//! flushes engagement counters on shutdown.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use quest_ledger::app_state::AppState;
use quest_ledger::config::{EngineConfig, LogFormat};
use quest_ledger::service::spawn_notification_relay;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = EngineConfig::from_env();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    tracing::info!(
        persistence = config.persistence_enabled,
        flush_every = config.engagement_flush_every,
        "starting quest-ledger"
    );

    // Build engine
    let state = AppState::build(&config)
        .await
        .context("failed to build engine state")?;

    let log_store = config
        .notification_log_enabled
        .then(|| std::sync::Arc::clone(&state.store));
    let relay = spawn_notification_relay(&state.notifications, log_store);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("shutdown requested");

    let flushed = state.gamification.engagement().flush_all().await;
    tracing::info!(flushed, "engagement counters flushed");

    relay.abort();
    Ok(())
}
