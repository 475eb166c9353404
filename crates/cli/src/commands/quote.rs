use std::sync::Arc;

use async_trait::async_trait;
use quotedesk_agent::runtime::{PipelineReport, QuotationRuntime};
use quotedesk_core::config::{AppConfig, LoadOptions};
use quotedesk_core::domain::request::QuotationRequest;
use quotedesk_core::notify::{NotificationSink, NotifyError};
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use super::{block_on, CommandResult, EXIT_CONFIG, EXIT_PIPELINE};

pub const CLI_CHANNEL: &str = "cli";

/// Prints the sender reply to stdout.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdoutSink;

#[async_trait]
impl NotificationSink for StdoutSink {
    async fn notify(&self, recipient: &str, text: &str) -> Result<(), NotifyError> {
        let line = format!("[reply to {recipient}]\n{text}\n");
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(line.as_bytes())
            .await
            .map_err(|error| NotifyError::Transport(error.to_string()))?;
        stdout.flush().await.map_err(|error| NotifyError::Transport(error.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct QuoteOutput<'a> {
    command: &'static str,
    status: &'static str,
    report: &'a PipelineReport,
}

pub fn run(text: &str, sender: &str) -> CommandResult {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => run_with_sink(&config, text, sender, Arc::new(StdoutSink)),
        Err(error) => {
            CommandResult::failure("quote", "config_validation", error.to_string(), EXIT_CONFIG)
        }
    }
}

pub fn run_with_sink(
    config: &AppConfig,
    text: &str,
    sender: &str,
    sink: Arc<dyn NotificationSink>,
) -> CommandResult {
    let runtime = match QuotationRuntime::from_config(config, sink) {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "quote",
                "pipeline_setup",
                format!("{error:#}"),
                EXIT_CONFIG,
            )
        }
    };

    let request = QuotationRequest::new(text, sender, CLI_CHANNEL);
    let report = match block_on("quote", runtime.handle(&request)) {
        Ok(report) => report,
        Err(result) => return result,
    };

    let delivered = report.is_delivered();
    CommandResult::json(
        if delivered { 0 } else { EXIT_PIPELINE },
        &QuoteOutput {
            command: "quote",
            status: if delivered { "ok" } else { "error" },
            report: &report,
        },
    )
}
