use std::time::Duration;

use async_trait::async_trait;
use quotedesk_core::config::WhatsAppConfig;
use quotedesk_core::notify::{NotificationSink, NotifyError};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct OutboundText<'a> {
    messaging_product: &'static str,
    recipient_type: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    text: TextPayload<'a>,
}

#[derive(Debug, Serialize)]
struct TextPayload<'a> {
    preview_url: bool,
    body: &'a str,
}

/// Sends plain text replies through the Graph API `/{phone_number_id}/messages` endpoint.
pub struct WhatsAppClient {
    http: Client,
    api_base_url: String,
    phone_number_id: String,
    access_token: SecretString,
}

impl WhatsAppClient {
    pub fn new(
        api_base_url: impl Into<String>,
        phone_number_id: impl Into<String>,
        access_token: SecretString,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| NotifyError::Transport(error.to_string()))?;
        Ok(Self {
            http,
            api_base_url: api_base_url.into(),
            phone_number_id: phone_number_id.into(),
            access_token,
        })
    }

    /// `None` when no access token is configured.
    pub fn from_config(config: &WhatsAppConfig) -> Result<Option<Self>, NotifyError> {
        let (Some(access_token), Some(phone_number_id)) =
            (config.access_token.clone(), config.phone_number_id.clone())
        else {
            return Ok(None);
        };
        Self::new(
            config.api_base_url.clone(),
            phone_number_id,
            access_token,
            Duration::from_secs(config.timeout_secs),
        )
        .map(Some)
    }

    pub fn messages_url(&self) -> String {
        format!("{}/{}/messages", self.api_base_url.trim_end_matches('/'), self.phone_number_id)
    }
}

#[async_trait]
impl NotificationSink for WhatsAppClient {
    async fn notify(&self, recipient: &str, text: &str) -> Result<(), NotifyError> {
        let payload = OutboundText {
            messaging_product: "whatsapp",
            recipient_type: "individual",
            to: recipient,
            kind: "text",
            text: TextPayload { preview_url: false, body: text },
        };

        let response = self
            .http
            .post(self.messages_url())
            .bearer_auth(self.access_token.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|error| NotifyError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                event_name = "whatsapp.send_failed",
                recipient,
                status = status.as_u16(),
                "graph api rejected message"
            );
            return Err(NotifyError::Rejected {
                recipient: recipient.to_owned(),
                reason: format!("{status}: {body}"),
            });
        }

        debug!(event_name = "whatsapp.sent", recipient, "reply sent");
        Ok(())
    }
}
