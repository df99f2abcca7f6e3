//! Whiskers Presenter binary
//!
//! Composition root: loads configuration, wires the adapters to the ports and
//! runs the presenter until Ctrl+C or SIGTERM.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use whiskers_presenter::application::media::MediaSessionController;
use whiskers_presenter::application::{
    MessageRouter, Presenter, PresenterContext, PresenterSettings,
};
use whiskers_presenter::config::PresenterConfig;
use whiskers_presenter::infrastructure::clock::{SystemClock, SystemRandom};
use whiskers_presenter::infrastructure::headless::{
    HeadlessMediaBackend, HeadlessMinigameHost, HeadlessViewport,
};
use whiskers_presenter::infrastructure::messaging::{create_channel, generate_client_id};
use whiskers_presenter::infrastructure::story::{JsonStoryContent, JsonStoryFactory};
use whiskers_presenter::infrastructure::websocket::WebSocketTransport;

/// Scroll steps the headless viewport allows.
const VIEWPORT_HEIGHT: u32 = 10;

/// Spawns a task that cancels `cancel_token` on SIGTERM/SIGINT
fn setup_shutdown_signal(cancel_token: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown...");
            }
        }

        cancel_token.cancel();
    });
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "whiskers_presenter=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Whiskers Presenter");

    let config = PresenterConfig::from_env();
    config.validate().context("invalid configuration")?;
    tracing::info!("Configuration loaded");
    tracing::info!("  Broker: {}", config.channel.primary_url);
    if let Some(fallback) = &config.channel.fallback_url {
        tracing::info!("  Fallback: {}", fallback);
    }
    tracing::info!("  Story: {}", config.story_path.display());

    let cancel_token = CancellationToken::new();
    setup_shutdown_signal(cancel_token.clone());

    let clock = Arc::new(SystemClock);
    let random = Arc::new(SystemRandom);

    let content = JsonStoryContent::load(config.story_path.clone())
        .with_context(|| format!("loading story from {}", config.story_path.display()))?;
    let factory = JsonStoryFactory::new(config.story_path.clone());

    let client_id = generate_client_id(
        &config.channel.client_id_prefix,
        clock.as_ref(),
        random.as_ref(),
    );
    let channel = create_channel(
        Arc::new(WebSocketTransport::new()),
        config.channel.clone(),
        client_id,
        clock.clone(),
    );

    let (media, media_events) = MediaSessionController::new(
        Arc::new(HeadlessMediaBackend),
        Arc::new(HeadlessMinigameHost),
        clock,
        random,
        config.media.clone(),
    );

    let ctx = PresenterContext::new(
        Arc::new(content),
        Arc::new(factory),
        media,
        channel.publisher,
        Arc::new(HeadlessViewport::new(VIEWPORT_HEIGHT)),
        PresenterSettings::from_config(&config),
    );
    let presenter = Presenter::new(
        MessageRouter::new(ctx),
        channel.inbound,
        media_events,
        channel.state_observer,
    );

    let router = presenter.run(cancel_token).await;
    let state = router.context().state();
    tracing::info!(
        chapter = %state.current_chapter(),
        choices_made = state.history().len(),
        "Presenter stopped"
    );

    if let Err(e) = channel.task.await {
        tracing::warn!(error = %e, "Channel task ended abnormally");
    }
    Ok(())
}
