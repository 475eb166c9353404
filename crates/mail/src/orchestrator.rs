use std::time::Duration;

use quotedesk_core::config::AppConfig;
use quotedesk_core::domain::outcome::DeliveryOutcome;
use quotedesk_core::domain::quotation::Quotation;
use quotedesk_core::render::RenderedDocument;
use tracing::{info, warn};

use crate::transport::{Attachment, DeliveryTransport, TransportMessage};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageSettings {
    pub seller_name: String,
    pub signatory: String,
}

/// Turns a quotation and its document into one send attempt on one transport.
#[derive(Clone, Debug)]
pub struct DeliveryOrchestrator {
    settings: MessageSettings,
    timeout: Duration,
}

impl DeliveryOrchestrator {
    pub fn new(settings: MessageSettings, timeout: Duration) -> Self {
        Self { settings, timeout }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            MessageSettings {
                seller_name: config.quotation.seller_name.clone(),
                signatory: config.quotation.signatory.clone(),
            },
            Duration::from_secs(config.delivery.timeout_secs),
        )
    }

    pub fn compose<'a>(
        &self,
        quotation: &Quotation,
        document: &'a RenderedDocument,
    ) -> TransportMessage<'a> {
        TransportMessage {
            recipient: quotation.email().to_owned(),
            subject: subject_line(&self.settings.seller_name, quotation.q_no()),
            body: self.body(quotation),
            attachment: Attachment {
                filename: document.filename(),
                content_type: document.content_type(),
                bytes: document.bytes(),
            },
        }
    }

    pub async fn deliver(
        &self,
        quotation: &Quotation,
        document: &RenderedDocument,
        transport: &dyn DeliveryTransport,
    ) -> DeliveryOutcome {
        let message = self.compose(quotation, document);
        let recipient = message.recipient.clone();
        let transport_name = transport.name().to_owned();

        let reason = match tokio::time::timeout(self.timeout, transport.send(&message)).await {
            Ok(Ok(())) => {
                info!(
                    event_name = "delivery.sent",
                    transport = %transport_name,
                    recipient = %recipient,
                    "quotation delivered"
                );
                return DeliveryOutcome::Delivered { transport: transport_name, recipient };
            }
            Ok(Err(error)) => error.to_string(),
            Err(_) => format!("timed out after {}s", self.timeout.as_secs()),
        };

        warn!(
            event_name = "delivery.failed",
            transport = %transport_name,
            recipient = %recipient,
            reason = %reason,
            "quotation delivery failed"
        );
        DeliveryOutcome::Failed { transport: transport_name, recipient, reason }
    }

    fn body(&self, quotation: &Quotation) -> String {
        let units = quotation.units();
        format!(
            "Dear {customer},\n\n\
Thank you for your enquiry.\n\n\
Product: {product}\n\
Qty: {quantity} {units}\n\
Rate: {rate}\n\
Total: {total}\n\n\
Please find our official quotation attached.\n\n\
Regards,\n\
{signatory}\n\
{seller}",
            customer = quotation.customer_name(),
            product = quotation.product(),
            quantity = quotation.quantity(),
            rate = quotation.rate_display(),
            total = quotation.total_display(),
            signatory = self.settings.signatory,
            seller = self.settings.seller_name,
        )
    }
}

pub fn subject_line(seller_name: &str, q_no: &str) -> String {
    match q_no.trim() {
        "" => format!("Quotation from {seller_name}"),
        q_no => format!("Quotation from {seller_name} (Ref: {q_no})"),
    }
}
