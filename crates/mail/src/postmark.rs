//! Postmark `POST /email` transport.
//!
//! See <https://postmarkapp.com/developer/api/email-api>. The attachment travels base64 encoded
//! inside the JSON body, so documents are bounded by the provider's 10 MB message limit.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use quotedesk_core::config::PostmarkConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::transport::{DeliveryTransport, TransportError, TransportMessage};

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PostmarkEmail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text_body: &'a str,
    attachments: Vec<PostmarkAttachment<'a>>,
    message_stream: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PostmarkAttachment<'a> {
    name: &'a str,
    content: String,
    content_type: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PostmarkResponse {
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    message: String,
    #[serde(rename = "MessageID", default)]
    message_id: Option<String>,
}

pub struct PostmarkTransport {
    http: Client,
    api_base_url: String,
    server_token: SecretString,
    from_address: String,
}

impl PostmarkTransport {
    pub fn new(
        api_base_url: impl Into<String>,
        server_token: SecretString,
        from_address: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| TransportError::Misconfigured(error.to_string()))?;
        Ok(Self {
            http,
            api_base_url: api_base_url.into(),
            server_token,
            from_address: from_address.into(),
        })
    }

    pub fn from_config(config: &PostmarkConfig, timeout: Duration) -> Result<Self, TransportError> {
        let server_token = config.server_token.clone().ok_or_else(|| {
            TransportError::Misconfigured("delivery.postmark.server_token is not set".to_string())
        })?;
        let from_address = config.from_address.clone().ok_or_else(|| {
            TransportError::Misconfigured("delivery.postmark.from_address is not set".to_string())
        })?;
        Self::new(config.api_base_url.clone(), server_token, from_address, timeout)
    }
}

#[async_trait]
impl DeliveryTransport for PostmarkTransport {
    fn name(&self) -> &str {
        "postmark"
    }

    async fn send(&self, message: &TransportMessage<'_>) -> Result<(), TransportError> {
        let url = format!("{}/email", self.api_base_url.trim_end_matches('/'));
        let body = PostmarkEmail {
            from: &self.from_address,
            to: &message.recipient,
            subject: &message.subject,
            text_body: &message.body,
            attachments: vec![PostmarkAttachment {
                name: message.attachment.filename,
                content: STANDARD.encode(message.attachment.bytes),
                content_type: message.attachment.content_type,
            }],
            message_stream: "outbound",
        };

        let response = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .header("X-Postmark-Server-Token", self.server_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| {
                warn!(error = %error, "postmark request failed");
                TransportError::Network(error.to_string())
            })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<PostmarkResponse>(&text).unwrap_or_default();

        if !status.is_success() || parsed.error_code != 0 {
            let reason = if parsed.message.is_empty() { text } else { parsed.message };
            warn!(status = %status, error_code = parsed.error_code, error = %reason, "postmark API error");
            return Err(TransportError::Rejected { status: status.as_u16(), reason });
        }

        debug!(message_id = ?parsed.message_id, "postmark accepted message");
        Ok(())
    }
}
