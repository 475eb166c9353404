mod bootstrap;
mod health;
mod webhook;

use anyhow::Result;
use axum::Router;
use quotedesk_core::config::{AppConfig, LoadOptions};

use crate::bootstrap::Application;
use crate::health::HealthState;
use crate::webhook::WebhookState;

fn init_logging(config: &AppConfig) {
    use quotedesk_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config)?;
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "quotedesk-server listening"
    );
    axum::serve(listener, routes(&app)).with_graceful_shutdown(wait_for_shutdown()).await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "quotedesk-server stopping"
    );

    Ok(())
}

fn routes(app: &Application) -> Router {
    let health = HealthState::new(
        app.config.render.template_path.clone(),
        app.runtime.transport_names(),
    );
    let webhook = WebhookState {
        runtime: app.runtime.clone(),
        verify_token: app.config.whatsapp.verify_token.clone(),
        app_secret: app.config.whatsapp.app_secret.clone(),
    };
    health::router(health).merge(webhook::router(webhook))
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %error, "failed to listen for shutdown signal");
    }
}
