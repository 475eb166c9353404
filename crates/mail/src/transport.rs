use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Attachment<'a> {
    pub filename: &'a str,
    pub content_type: &'a str,
    #[serde(skip)]
    pub bytes: &'a [u8],
}

/// One outbound email. Borrows the rendered document instead of copying it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransportMessage<'a> {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub attachment: Attachment<'a>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("rejected by provider ({status}): {reason}")]
    Rejected { status: u16, reason: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("could not write message: {0}")]
    Io(String),
    #[error("transport misconfigured: {0}")]
    Misconfigured(String),
    #[error("message could not be built: {0}")]
    InvalidMessage(String),
}

#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    fn name(&self) -> &str;
    async fn send(&self, message: &TransportMessage<'_>) -> Result<(), TransportError>;
}
