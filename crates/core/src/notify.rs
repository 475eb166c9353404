use async_trait::async_trait;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification channel is not configured")]
    NotConfigured,
    #[error("notification to `{recipient}` was rejected: {reason}")]
    Rejected { recipient: String, reason: String },
    #[error("notification transport error: {0}")]
    Transport(String),
}

/// Channel back to whoever sent the enquiry.
///
/// The pipeline calls this exactly once per run and only logs failures, so implementations
/// should not retry on their own.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, recipient: &str, text: &str) -> Result<(), NotifyError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DiscardSink;

#[async_trait]
impl NotificationSink for DiscardSink {
    async fn notify(&self, recipient: &str, _text: &str) -> Result<(), NotifyError> {
        tracing::debug!(recipient, "notification discarded");
        Ok(())
    }
}
