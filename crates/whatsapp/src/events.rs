use quotedesk_core::domain::request::{QuotationRequest, RequestId};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const CHANNEL_ID: &str = "whatsapp";

#[derive(Debug, Error)]
pub enum EventError {
    #[error("webhook body is not a WhatsApp envelope: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("webhook verify token is not configured")]
    NotConfigured,
    #[error("hub.mode must be `subscribe`")]
    WrongMode,
    #[error("verify token does not match")]
    TokenMismatch,
    #[error("hub.challenge is missing")]
    MissingChallenge,
}

/// Query string of the subscription handshake `GET`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Returns the challenge to echo when the handshake is valid.
pub fn verify_subscription(
    query: &VerifyQuery,
    expected_token: Option<&SecretString>,
) -> Result<String, VerifyError> {
    let expected = expected_token.ok_or(VerifyError::NotConfigured)?;
    if query.mode.as_deref() != Some("subscribe") {
        return Err(VerifyError::WrongMode);
    }
    if query.verify_token.as_deref() != Some(expected.expose_secret()) {
        return Err(VerifyError::TokenMismatch);
    }
    query
        .challenge
        .clone()
        .filter(|challenge| !challenge.is_empty())
        .ok_or(VerifyError::MissingChallenge)
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub value: ChangeValue,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
    #[serde(default)]
    pub statuses: Vec<serde_json::Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct InboundMessage {
    pub from: String,
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<TextBody>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TextBody {
    pub body: String,
}

pub fn parse_envelope(body: &[u8]) -> Result<WebhookEnvelope, EventError> {
    Ok(serde_json::from_slice(body)?)
}

impl WebhookEnvelope {
    /// One request per inbound text message. Status callbacks, media and empty texts are skipped.
    pub fn quotation_requests(&self) -> Vec<QuotationRequest> {
        let mut requests = Vec::new();
        for change in self.entry.iter().flat_map(|entry| &entry.changes) {
            if !change.value.statuses.is_empty() {
                debug!(statuses = change.value.statuses.len(), "ignoring status callbacks");
            }
            for message in &change.value.messages {
                let text = match (message.kind.as_str(), &message.text) {
                    ("text", Some(text)) if !text.body.trim().is_empty() => &text.body,
                    (kind, _) => {
                        debug!(kind, from = %message.from, "ignoring non-text message");
                        continue;
                    }
                };
                let id = if message.id.is_empty() {
                    RequestId::generate()
                } else {
                    RequestId(format!("wa-{}", message.id))
                };
                requests.push(QuotationRequest::with_id(
                    id,
                    text.as_str(),
                    message.from.as_str(),
                    CHANNEL_ID,
                ));
            }
        }
        requests
    }
}
