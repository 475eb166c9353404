use serde::{Deserialize, Serialize};

use crate::errors::FailureKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Received,
    Extracting,
    Normalizing,
    Rendering,
    Delivering,
    Reported,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Reported)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    RequestAccepted,
    FieldsExtracted,
    QuotationValidated,
    DocumentRendered,
    DeliveryFinished,
    Failed { kind: FailureKind },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineAction {
    ExtractFields,
    NormalizeFields,
    RenderDocument,
    DeliverDocument,
    ReleaseDocument,
    NotifySender,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: PipelineState,
    pub to: PipelineState,
    pub event: PipelineEvent,
    pub actions: Vec<PipelineAction>,
}
