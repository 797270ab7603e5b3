//! Communauto search bot
//!
//! A Telegram bot that walks each user through a short dialogue, then watches
//! Communauto availability in the background and notifies the user when a
//! matching vehicle shows up.

mod api;
mod config;
mod provider;
mod runtime;
mod state_machine;
mod telegram;

use api::AppState;
use config::BotConfig;
use provider::{CommunautoFinder, LoggingProvider};
use runtime::ProductionManager;
use std::sync::Arc;
use telegram::TelegramClient;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "communauto_bot=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = BotConfig::from_env()?;
    tracing::info!(config = ?config, "Configuration loaded");

    let client = Arc::new(TelegramClient::new(
        &config.telegram_api_url,
        &config.telegram_token,
    )?);
    let me = client.get_me().await?;
    tracing::info!(bot_id = me.id, username = ?me.username, "Authorized on Telegram");

    let finder = CommunautoFinder::new(
        &config.communauto_api_url,
        config.city_id,
        config.poll_interval,
    )?;
    let manager: ProductionManager =
        ProductionManager::new(LoggingProvider::new(Arc::new(finder)), Arc::clone(&client));

    let shutdown = CancellationToken::new();

    let listener = api::bind(config.health_port).await?;
    let health = tokio::spawn(api::serve(
        listener,
        AppState::new(manager.registry()),
        shutdown.clone(),
    ));

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown requested");
                signal_token.cancel();
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });

    telegram::run_polling(&client, &manager, &shutdown).await;

    let cancelled = manager.shutdown();
    tracing::info!(cancelled, "Cancelled in-flight searches");

    match health.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "Health server failed"),
        Err(e) => tracing::error!(error = %e, "Health server task panicked"),
    }

    Ok(())
}
