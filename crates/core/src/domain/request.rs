use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        Self(format!("req-{}", Uuid::new_v4()))
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One inbound enquiry, as handed over by whichever channel received it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationRequest {
    id: RequestId,
    raw_text: String,
    sender_id: String,
    channel_id: String,
}

impl QuotationRequest {
    pub fn new(
        raw_text: impl Into<String>,
        sender_id: impl Into<String>,
        channel_id: impl Into<String>,
    ) -> Self {
        Self::with_id(RequestId::generate(), raw_text, sender_id, channel_id)
    }

    pub fn with_id(
        id: RequestId,
        raw_text: impl Into<String>,
        sender_id: impl Into<String>,
        channel_id: impl Into<String>,
    ) -> Self {
        Self {
            id,
            raw_text: raw_text.into(),
            sender_id: sender_id.into(),
            channel_id: channel_id.into(),
        }
    }

    pub fn id(&self) -> &RequestId {
        &self.id
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }
}

#[cfg(test)]
mod tests {
    use super::{QuotationRequest, RequestId};

    #[test]
    fn generated_ids_are_unique_and_prefixed() {
        let first = QuotationRequest::new("hello", "919800000000", "whatsapp");
        let second = QuotationRequest::new("hello", "919800000000", "whatsapp");

        assert_ne!(first.id(), second.id());
        assert!(first.id().0.starts_with("req-"));
    }

    #[test]
    fn explicit_id_is_preserved() {
        let request =
            QuotationRequest::with_id(RequestId("req-1".to_owned()), "text", "sender", "cli");
        assert_eq!(request.id().to_string(), "req-1");
        assert_eq!(request.raw_text(), "text");
        assert_eq!(request.sender_id(), "sender");
        assert_eq!(request.channel_id(), "cli");
    }
}
