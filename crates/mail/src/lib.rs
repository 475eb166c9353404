//! Email delivery for rendered quotations.

pub mod orchestrator;
pub mod outbox;
pub mod postmark;
pub mod smtp;
pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use quotedesk_core::config::{AppConfig, TransportKind};

pub use orchestrator::{subject_line, DeliveryOrchestrator, MessageSettings};
pub use outbox::OutboxTransport;
pub use postmark::PostmarkTransport;
pub use smtp::SmtpTransport;
pub use transport::{Attachment, DeliveryTransport, TransportError, TransportMessage};

/// The configured transports, in delivery priority order.
pub fn transports_from_config(
    config: &AppConfig,
) -> Result<Vec<Arc<dyn DeliveryTransport>>, TransportError> {
    let timeout = Duration::from_secs(config.delivery.timeout_secs);
    config
        .delivery
        .transports
        .iter()
        .map(|kind| -> Result<Arc<dyn DeliveryTransport>, TransportError> {
            match kind {
                TransportKind::Postmark => Ok(Arc::new(PostmarkTransport::from_config(
                    &config.delivery.postmark,
                    timeout,
                )?)),
                TransportKind::Smtp => {
                    Ok(Arc::new(SmtpTransport::from_config(&config.delivery.smtp, timeout)?))
                }
                TransportKind::Outbox => {
                    Ok(Arc::new(OutboxTransport::new(config.delivery.outbox.dir.clone())))
                }
            }
        })
        .collect()
}
