//! Authenticated SMTP relay transport, for mailboxes that only hand out SMTP credentials.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MimeAttachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use quotedesk_core::config::SmtpConfig;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::transport::{DeliveryTransport, TransportError, TransportMessage};

pub struct SmtpTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
    from: Mailbox,
}

impl SmtpTransport {
    pub fn new(
        host: &str,
        port: u16,
        starttls: bool,
        username: String,
        password: &SecretString,
        from_address: &str,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let from = parse_mailbox(from_address)
            .map_err(|reason| TransportError::Misconfigured(format!("from address: {reason}")))?;
        let builder = if starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        }
        .map_err(|error| TransportError::Misconfigured(error.to_string()))?;

        let mailer = builder
            .port(port)
            .credentials(Credentials::new(username, password.expose_secret().to_owned()))
            .timeout(Some(timeout))
            .build();
        Ok(Self { mailer, host: host.to_owned(), from })
    }

    pub fn from_config(config: &SmtpConfig, timeout: Duration) -> Result<Self, TransportError> {
        let host = config.host.as_deref().ok_or_else(|| {
            TransportError::Misconfigured("delivery.smtp.host is not set".to_string())
        })?;
        let username = config.username.clone().ok_or_else(|| {
            TransportError::Misconfigured("delivery.smtp.username is not set".to_string())
        })?;
        let password = config.password.as_ref().ok_or_else(|| {
            TransportError::Misconfigured("delivery.smtp.password is not set".to_string())
        })?;
        let from_address = config.from_address.as_deref().ok_or_else(|| {
            TransportError::Misconfigured("delivery.smtp.from_address is not set".to_string())
        })?;
        Self::new(host, config.port, config.starttls, username, password, from_address, timeout)
    }
}

/// Plain-text body with the rendered document attached.
pub fn build_message(
    from: &Mailbox,
    message: &TransportMessage<'_>,
) -> Result<Message, TransportError> {
    let to = parse_mailbox(&message.recipient).map_err(TransportError::InvalidMessage)?;
    let content_type = ContentType::parse(message.attachment.content_type)
        .map_err(|error| TransportError::InvalidMessage(error.to_string()))?;
    let attachment = MimeAttachment::new(message.attachment.filename.to_owned())
        .body(message.attachment.bytes.to_vec(), content_type);

    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(message.subject.as_str())
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(message.body.clone()))
                .singlepart(attachment),
        )
        .map_err(|error| TransportError::InvalidMessage(error.to_string()))
}

fn parse_mailbox(address: &str) -> Result<Mailbox, String> {
    address.trim().parse::<Mailbox>().map_err(|error| format!("`{address}`: {error}"))
}

#[async_trait]
impl DeliveryTransport for SmtpTransport {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send(&self, message: &TransportMessage<'_>) -> Result<(), TransportError> {
        let email = build_message(&self.from, message)?;

        match self.mailer.send(email).await {
            Ok(response) => {
                debug!(host = %self.host, code = %response.code(), "smtp relay accepted message");
                Ok(())
            }
            Err(error) => {
                warn!(host = %self.host, error = %error, "smtp send failed");
                Err(match error.status() {
                    Some(code) => TransportError::Rejected {
                        status: code.to_string().parse().unwrap_or_default(),
                        reason: error.to_string(),
                    },
                    None => TransportError::Network(error.to_string()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use lettre::message::Mailbox;
    use quotedesk_core::config::SmtpConfig;

    use super::{build_message, SmtpTransport};
    use crate::transport::{Attachment, TransportError, TransportMessage};

    fn message(recipient: &str) -> TransportMessage<'static> {
        TransportMessage {
            recipient: recipient.to_owned(),
            subject: "Quotation from Nivee Metal Products (Ref: 101)".to_owned(),
            body: "Dear Raju,\n\nPlease find attached your quotation.".to_owned(),
            attachment: Attachment {
                filename: "Quotation_Raju_2025-11-05.html",
                content_type: "text/html; charset=utf-8",
                bytes: b"<h1>Raju</h1>",
            },
        }
    }

    fn sender() -> Mailbox {
        "Nivee Metal Products <sales@example.com>".parse().expect("valid mailbox")
    }

    #[test]
    fn message_carries_headers_body_and_attachment() {
        let email = build_message(&sender(), &message("raju@example.com")).expect("builds");
        let formatted = String::from_utf8(email.formatted()).expect("ascii message");

        assert!(formatted.contains("To: raju@example.com"), "{formatted}");
        assert!(formatted.contains("Subject: Quotation from Nivee Metal Products (Ref: 101)"));
        assert!(formatted.contains("Please find attached your quotation."));
        assert!(formatted.contains("Quotation_Raju_2025-11-05.html"));
    }

    #[test]
    fn malformed_recipient_is_an_invalid_message() {
        let error = build_message(&sender(), &message("raju at example")).expect_err("bad to");
        assert!(matches!(
            error,
            TransportError::InvalidMessage(reason) if reason.contains("raju at example")
        ));
    }

    #[test]
    fn incomplete_config_is_misconfigured() {
        let config = SmtpConfig {
            host: Some("smtp.example.com".to_owned()),
            port: 465,
            starttls: false,
            username: Some("sales@example.com".to_owned()),
            password: None,
            from_address: Some("sales@example.com".to_owned()),
        };
        let error = SmtpTransport::from_config(&config, Duration::from_secs(5))
            .err()
            .expect("password is required");
        assert!(matches!(
            error,
            TransportError::Misconfigured(reason) if reason.contains("password")
        ));
    }
}
