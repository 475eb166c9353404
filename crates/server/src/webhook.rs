//! WhatsApp webhook endpoints.
//!
//! `GET /webhook` answers Meta's subscription handshake. `POST /webhook` always answers 200 so
//! the platform does not redeliver; each extracted enquiry runs on its own task and reports
//! back through the runtime's notification sink.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::Router;
use quotedesk_agent::runtime::{PipelineReport, QuotationRuntime};
use quotedesk_core::domain::request::QuotationRequest;
use quotedesk_whatsapp::{
    parse_envelope, verify_signature, verify_subscription, VerifyQuery, SIGNATURE_HEADER,
};
use secrecy::{ExposeSecret, SecretString};
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Clone)]
pub struct WebhookState {
    pub runtime: Arc<QuotationRuntime>,
    pub verify_token: Option<SecretString>,
    pub app_secret: Option<SecretString>,
}

pub fn router(state: WebhookState) -> Router {
    Router::new().route("/webhook", get(verify).post(receive)).with_state(state)
}

async fn verify(
    State(state): State<WebhookState>,
    Query(query): Query<VerifyQuery>,
) -> (StatusCode, String) {
    match verify_subscription(&query, state.verify_token.as_ref()) {
        Ok(challenge) => {
            info!(event_name = "webhook.verified", correlation_id = "webhook", "webhook verified");
            (StatusCode::OK, challenge)
        }
        Err(error) => {
            warn!(
                event_name = "webhook.verify_rejected",
                correlation_id = "webhook",
                error = %error,
                "webhook verification rejected"
            );
            (StatusCode::FORBIDDEN, "Forbidden".to_owned())
        }
    }
}

async fn receive(State(state): State<WebhookState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    if let Some(secret) = &state.app_secret {
        let header = headers.get(SIGNATURE_HEADER).and_then(|value| value.to_str().ok());
        if let Err(error) = verify_signature(secret.expose_secret().as_bytes(), &body, header) {
            warn!(
                event_name = "webhook.signature_rejected",
                correlation_id = "webhook",
                error = %error,
                "dropping webhook payload"
            );
            return StatusCode::OK;
        }
    }

    match parse_envelope(&body) {
        Ok(envelope) => {
            dispatch(&state.runtime, envelope.quotation_requests());
        }
        Err(error) => {
            warn!(
                event_name = "webhook.unparseable",
                correlation_id = "webhook",
                error = %error,
                "ignoring webhook payload"
            );
        }
    }
    StatusCode::OK
}

/// Runs every request on its own task.
pub fn dispatch(
    runtime: &Arc<QuotationRuntime>,
    requests: Vec<QuotationRequest>,
) -> Vec<JoinHandle<PipelineReport>> {
    requests
        .into_iter()
        .map(|request| {
            let runtime = Arc::clone(runtime);
            tokio::spawn(async move { runtime.handle(&request).await })
        })
        .collect()
}
