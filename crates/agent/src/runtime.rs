//! The quotation pipeline controller.
//!
//! One call to [`QuotationRuntime::handle`] takes a request from `Received` to `Reported`.
//! Every stage result is typed; failures drop straight to `Reported` with a classification
//! and the sender is told the outcome exactly once. Nothing escapes a run, so one bad request
//! never affects another and the runtime can be shared across tasks behind an `Arc`.

use std::sync::Arc;

use anyhow::{Context, Result};
use quotedesk_core::config::AppConfig;
use quotedesk_core::domain::fields::CandidateFields;
use quotedesk_core::domain::outcome::DeliveryOutcome;
use quotedesk_core::domain::quotation::Quotation;
use quotedesk_core::domain::request::{QuotationRequest, RequestId};
use quotedesk_core::errors::{DeliveryFailure, ExtractionFailure, FailureKind, PipelineFailure};
use quotedesk_core::flows::{FlowEngine, PipelineEvent, PipelineState, QuotationFlow};
use quotedesk_core::normalize::Normalizer;
use quotedesk_core::notify::NotificationSink;
use quotedesk_core::render::DocumentRenderer;
use quotedesk_mail::{DeliveryOrchestrator, DeliveryTransport};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::extract::{AiExtractor, FieldExtractor, RuleExtractor};
use crate::llm;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    Delivered { transport: String, recipient: String },
    Failed { kind: FailureKind, detail: String },
}

/// What happened to one request, for logs, the CLI and tests.
#[derive(Clone, Debug, Serialize)]
pub struct PipelineReport {
    pub request_id: RequestId,
    pub states: Vec<PipelineState>,
    pub extractor: Option<String>,
    pub attempts: Vec<DeliveryOutcome>,
    pub outcome: PipelineOutcome,
    pub message: String,
    #[serde(skip)]
    pub failure: Option<PipelineFailure>,
}

impl PipelineReport {
    pub fn is_delivered(&self) -> bool {
        matches!(self.outcome, PipelineOutcome::Delivered { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure.as_ref().map(PipelineFailure::kind)
    }

    pub fn final_state(&self) -> Option<PipelineState> {
        self.states.last().copied()
    }
}

/// Everything the runtime needs, in priority order where order matters.
pub struct RuntimeParts {
    pub extractors: Vec<Arc<dyn FieldExtractor>>,
    pub normalizer: Normalizer,
    pub renderer: DocumentRenderer,
    pub orchestrator: DeliveryOrchestrator,
    pub transports: Vec<Arc<dyn DeliveryTransport>>,
    pub sink: Arc<dyn NotificationSink>,
}

pub struct QuotationRuntime {
    extractors: Vec<Arc<dyn FieldExtractor>>,
    normalizer: Normalizer,
    renderer: DocumentRenderer,
    orchestrator: DeliveryOrchestrator,
    transports: Vec<Arc<dyn DeliveryTransport>>,
    sink: Arc<dyn NotificationSink>,
    flow: FlowEngine<QuotationFlow>,
}

pub fn success_message(quotation: &Quotation) -> String {
    format!(
        "Success! Your quotation for {} was emailed to {}.",
        quotation.product(),
        quotation.email()
    )
}

/// The configured extraction strategies: the model first when enabled, rules always last.
pub fn extractors_from_config(config: &AppConfig) -> Result<Vec<Arc<dyn FieldExtractor>>> {
    let mut extractors: Vec<Arc<dyn FieldExtractor>> = Vec::new();
    if let Some(client) = llm::from_config(&config.llm)? {
        extractors.push(Arc::new(AiExtractor::new(
            client,
            std::time::Duration::from_secs(config.llm.timeout_secs),
        )));
    }
    extractors.push(Arc::new(RuleExtractor::new()));
    Ok(extractors)
}

/// Tries each strategy in order; the first one that does not fail wins.
pub async fn extract_first(
    extractors: &[Arc<dyn FieldExtractor>],
    text: &str,
) -> Result<(String, CandidateFields), ExtractionFailure> {
    let mut last_failure = None;
    for extractor in extractors {
        match extractor.extract(text).await {
            Ok(fields) => return Ok((extractor.name().to_owned(), fields)),
            Err(failure) => {
                warn!(
                    event_name = "pipeline.extract.fallback",
                    extractor = extractor.name(),
                    error = %failure,
                    "extraction strategy failed, trying next"
                );
                last_failure = Some(failure);
            }
        }
    }
    Err(last_failure
        .unwrap_or_else(|| ExtractionFailure::Model("no extraction strategy configured".into())))
}

impl QuotationRuntime {
    pub fn new(parts: RuntimeParts) -> Self {
        Self {
            extractors: parts.extractors,
            normalizer: parts.normalizer,
            renderer: parts.renderer,
            orchestrator: parts.orchestrator,
            transports: parts.transports,
            sink: parts.sink,
            flow: FlowEngine::default(),
        }
    }

    pub fn from_config(config: &AppConfig, sink: Arc<dyn NotificationSink>) -> Result<Self> {
        let transports = quotedesk_mail::transports_from_config(config)
            .context("building delivery transports")?;
        Ok(Self::new(RuntimeParts {
            extractors: extractors_from_config(config).context("building extractors")?,
            normalizer: Normalizer::new(config.normalizer_settings()),
            renderer: DocumentRenderer::new(config.renderer_settings()),
            orchestrator: DeliveryOrchestrator::from_config(config),
            transports,
            sink,
        }))
    }

    pub fn extractor_names(&self) -> Vec<&'static str> {
        self.extractors.iter().map(|extractor| extractor.name()).collect()
    }

    pub fn transport_names(&self) -> Vec<String> {
        self.transports.iter().map(|transport| transport.name().to_owned()).collect()
    }

    /// Runs extraction only, with the same fallback order as [`Self::handle`].
    pub async fn extract(
        &self,
        text: &str,
    ) -> Result<(String, CandidateFields), ExtractionFailure> {
        extract_first(&self.extractors, text).await
    }

    pub async fn handle(&self, request: &QuotationRequest) -> PipelineReport {
        let mut trace = StateTrace::new(&self.flow, request.id());
        info!(
            event_name = "pipeline.received",
            correlation_id = %request.id(),
            channel = request.channel_id(),
            chars = request.raw_text().len(),
            "quotation request received"
        );

        let mut extractor = None;
        let mut attempts = Vec::new();
        let result = self.run(request, &mut trace, &mut extractor, &mut attempts).await;

        let (outcome, message, failure) = match result {
            Ok((quotation, delivered)) => {
                trace.apply(PipelineEvent::DeliveryFinished);
                info!(
                    event_name = "pipeline.delivered",
                    correlation_id = %request.id(),
                    transport = delivered.transport(),
                    "quotation delivered"
                );
                (
                    PipelineOutcome::Delivered {
                        transport: delivered.transport().to_owned(),
                        recipient: delivered.recipient().to_owned(),
                    },
                    success_message(&quotation),
                    None,
                )
            }
            Err(failure) => {
                let kind = failure.kind();
                trace.apply(PipelineEvent::Failed { kind });
                warn!(
                    event_name = "pipeline.failed",
                    correlation_id = %request.id(),
                    kind = ?kind,
                    error = %failure,
                    "quotation request failed"
                );
                (
                    PipelineOutcome::Failed { kind, detail: failure.to_string() },
                    failure.user_message(),
                    Some(failure),
                )
            }
        };

        if let Err(error) = self.sink.notify(request.sender_id(), &message).await {
            warn!(
                event_name = "pipeline.notify_failed",
                correlation_id = %request.id(),
                error = %error,
                "could not notify sender"
            );
        }

        PipelineReport {
            request_id: request.id().clone(),
            states: trace.visited,
            extractor,
            attempts,
            outcome,
            message,
            failure,
        }
    }

    async fn run(
        &self,
        request: &QuotationRequest,
        trace: &mut StateTrace<'_>,
        extractor: &mut Option<String>,
        attempts: &mut Vec<DeliveryOutcome>,
    ) -> Result<(Quotation, DeliveryOutcome), PipelineFailure> {
        trace.apply(PipelineEvent::RequestAccepted);
        let (name, fields) = self.extract(request.raw_text()).await?;
        debug!(correlation_id = %request.id(), extractor = %name, "fields extracted");
        *extractor = Some(name);

        trace.apply(PipelineEvent::FieldsExtracted);
        let quotation = self.normalizer.normalize(&fields)?;

        trace.apply(PipelineEvent::QuotationValidated);
        let document = self.renderer.render(&quotation).await?;

        trace.apply(PipelineEvent::DocumentRendered);
        let mut delivered = None;
        for transport in &self.transports {
            let outcome =
                self.orchestrator.deliver(&quotation, &document, transport.as_ref()).await;
            attempts.push(outcome.clone());
            if outcome.is_delivered() {
                delivered = Some(outcome);
                break;
            }
        }

        if let Err(error) = document.release() {
            warn!(correlation_id = %request.id(), error = %error, "could not release document");
        }

        match (delivered, attempts.last()) {
            (Some(outcome), _) => Ok((quotation, outcome)),
            (None, Some(DeliveryOutcome::Failed { transport, recipient, reason })) => {
                Err(PipelineFailure::Delivery {
                    recipient: recipient.clone(),
                    failure: DeliveryFailure::Transport {
                        transport: transport.clone(),
                        reason: reason.clone(),
                    },
                })
            }
            (None, _) => Err(PipelineFailure::Delivery {
                recipient: quotation.email().to_owned(),
                failure: DeliveryFailure::NoTransports,
            }),
        }
    }
}

struct StateTrace<'a> {
    engine: &'a FlowEngine<QuotationFlow>,
    request_id: &'a RequestId,
    current: PipelineState,
    visited: Vec<PipelineState>,
}

impl<'a> StateTrace<'a> {
    fn new(engine: &'a FlowEngine<QuotationFlow>, request_id: &'a RequestId) -> Self {
        let current = engine.initial_state();
        Self { engine, request_id, current, visited: vec![current] }
    }

    fn apply(&mut self, event: PipelineEvent) {
        match self.engine.apply(self.current, &event) {
            Ok(outcome) => {
                debug!(
                    correlation_id = %self.request_id,
                    from = ?outcome.from,
                    to = ?outcome.to,
                    actions = ?outcome.actions,
                    "pipeline transition"
                );
                self.current = outcome.to;
                self.visited.push(outcome.to);
            }
            Err(transition_error) => {
                error!(
                    correlation_id = %self.request_id,
                    error = %transition_error,
                    "pipeline transition rejected"
                );
            }
        }
    }
}
