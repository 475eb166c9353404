use std::sync::Arc;

use quotedesk_agent::runtime::QuotationRuntime;
use quotedesk_core::config::{AppConfig, ConfigError, LoadOptions};
use quotedesk_core::notify::{DiscardSink, NotificationSink, NotifyError};
use quotedesk_whatsapp::WhatsAppClient;
use thiserror::Error;
use tracing::{info, warn};

pub struct Application {
    pub config: AppConfig,
    pub runtime: Arc<QuotationRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("notification channel setup failed: {0}")]
    Notifier(#[source] NotifyError),
    #[error("pipeline setup failed: {0:#}")]
    Runtime(#[source] anyhow::Error),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let sink: Arc<dyn NotificationSink> =
        match WhatsAppClient::from_config(&config.whatsapp).map_err(BootstrapError::Notifier)? {
            Some(client) => Arc::new(client),
            None => {
                warn!(
                    event_name = "system.bootstrap.notifier_disabled",
                    correlation_id = "bootstrap",
                    "whatsapp access token not configured, replies will be discarded"
                );
                Arc::new(DiscardSink)
            }
        };

    let runtime = QuotationRuntime::from_config(&config, sink).map_err(BootstrapError::Runtime)?;
    info!(
        event_name = "system.bootstrap.runtime_ready",
        correlation_id = "bootstrap",
        extractors = ?runtime.extractor_names(),
        transports = ?runtime.transport_names(),
        "quotation pipeline ready"
    );

    Ok(Application { config, runtime: Arc::new(runtime) })
}
