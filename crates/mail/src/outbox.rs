//! Filesystem transport: each message becomes a directory holding `message.json` and the
//! attachment. Used for local runs and as a last-resort transport.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::transport::{DeliveryTransport, TransportError, TransportMessage};

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    id: String,
    queued_at: String,
    #[serde(flatten)]
    message: &'a TransportMessage<'a>,
}

#[derive(Clone, Debug)]
pub struct OutboxTransport {
    dir: PathBuf,
}

impl OutboxTransport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn io_error(path: &Path, error: std::io::Error) -> TransportError {
    TransportError::Io(format!("{}: {error}", path.display()))
}

#[async_trait]
impl DeliveryTransport for OutboxTransport {
    fn name(&self) -> &str {
        "outbox"
    }

    async fn send(&self, message: &TransportMessage<'_>) -> Result<(), TransportError> {
        let id = Uuid::new_v4().to_string();
        let message_dir = self.dir.join(&id);
        tokio::fs::create_dir_all(&message_dir)
            .await
            .map_err(|error| io_error(&message_dir, error))?;

        let attachment_path = message_dir.join(message.attachment.filename);
        tokio::fs::write(&attachment_path, message.attachment.bytes)
            .await
            .map_err(|error| io_error(&attachment_path, error))?;

        let envelope = Envelope { id: id.clone(), queued_at: Utc::now().to_rfc3339(), message };
        let json = serde_json::to_vec_pretty(&envelope)
            .map_err(|error| TransportError::Io(error.to_string()))?;
        let envelope_path = message_dir.join("message.json");
        tokio::fs::write(&envelope_path, json)
            .await
            .map_err(|error| io_error(&envelope_path, error))?;

        info!(outbox_id = %id, recipient = %message.recipient, "message written to outbox");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::OutboxTransport;
    use crate::transport::{Attachment, DeliveryTransport, TransportMessage};

    #[tokio::test]
    async fn writes_envelope_and_attachment() {
        let dir = TempDir::new().expect("temp dir");
        let transport = OutboxTransport::new(dir.path().join("outbox"));
        let message = TransportMessage {
            recipient: "raju@example.com".to_owned(),
            subject: "Quotation from Nivee (Ref: 101)".to_owned(),
            body: "Dear Raju".to_owned(),
            attachment: Attachment {
                filename: "Quotation_Raju_2025-11-05.html",
                content_type: "text/html; charset=utf-8",
                bytes: b"<html></html>",
            },
        };

        transport.send(&message).await.expect("outbox write");

        let entries = std::fs::read_dir(transport.dir())
            .expect("outbox exists")
            .filter_map(Result::ok)
            .collect::<Vec<_>>();
        assert_eq!(entries.len(), 1);

        let message_dir = entries[0].path();
        let attachment = std::fs::read(message_dir.join("Quotation_Raju_2025-11-05.html"))
            .expect("attachment written");
        assert_eq!(attachment, b"<html></html>");

        let envelope: serde_json::Value = serde_json::from_slice(
            &std::fs::read(message_dir.join("message.json")).expect("envelope written"),
        )
        .expect("envelope is json");
        assert_eq!(envelope["recipient"], "raju@example.com");
        assert_eq!(envelope["subject"], "Quotation from Nivee (Ref: 101)");
        assert_eq!(envelope["attachment"]["filename"], "Quotation_Raju_2025-11-05.html");
    }

    #[tokio::test]
    async fn unwritable_directory_is_a_transport_error() {
        let dir = TempDir::new().expect("temp dir");
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").expect("write blocker");

        let transport = OutboxTransport::new(blocker.join("outbox"));
        let message = TransportMessage {
            recipient: "raju@example.com".to_owned(),
            subject: "s".to_owned(),
            body: "b".to_owned(),
            attachment: Attachment { filename: "q.html", content_type: "text/html", bytes: b"x" },
        };

        let error = transport.send(&message).await.expect_err("parent is a file");
        assert!(matches!(error, crate::transport::TransportError::Io(_)));
    }
}
