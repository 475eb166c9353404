use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Delivered { transport: String, recipient: String },
    Failed { transport: String, recipient: String, reason: String },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    pub fn transport(&self) -> &str {
        match self {
            Self::Delivered { transport, .. } | Self::Failed { transport, .. } => transport,
        }
    }

    pub fn recipient(&self) -> &str {
        match self {
            Self::Delivered { recipient, .. } | Self::Failed { recipient, .. } => recipient,
        }
    }
}
