use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::fields::FieldName;

pub const GUIDANCE_MESSAGE: &str = "Sorry, I couldn't read all details. Please send like:\n\n\
Name: Raju\n\
Product: 5 inch SS 316L sheets\n\
Quantity: 5\n\
Rate: 25000\n\
Units: Pcs\n\
Email: raju@example.com";

pub const RENDER_FAILURE_MESSAGE: &str =
    "Sorry, an internal error occurred while creating your quotation document. Please try again later.";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExtractionFailure {
    #[error("model call failed: {0}")]
    Model(String),
    #[error("model call timed out after {secs}s")]
    Timeout { secs: u64 },
    #[error("model response is not a field object: {0}")]
    Unparseable(String),
    #[error("required fields missing from extraction: {}", join_fields(.0))]
    MissingRequired(Vec<FieldName>),
    #[error("extracted fields are unusable: {0}")]
    Invalid(ValidationFailure),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationFailure {
    #[error("required field `{0}` is missing")]
    MissingField(FieldName),
    #[error("`{0}` is not a valid email address")]
    InvalidEmail(String),
    #[error("`{value}` is not a valid {field}")]
    InvalidNumber { field: FieldName, value: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RenderFailure {
    #[error("template not found at `{}`", .0.display())]
    TemplateNotFound(PathBuf),
    #[error("template rendering failed: {0}")]
    Render(String),
    #[error("could not spool rendered document: {0}")]
    Spool(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DeliveryFailure {
    #[error("transport `{transport}` failed: {reason}")]
    Transport { transport: String, reason: String },
    #[error("no delivery transport is configured")]
    NoTransports,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Extraction,
    Validation,
    Render,
    Delivery,
}

/// Terminal failure of one pipeline run, carrying what the sender should be told.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PipelineFailure {
    #[error(transparent)]
    Extraction(#[from] ExtractionFailure),
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
    #[error(transparent)]
    Render(#[from] RenderFailure),
    #[error("delivery to {recipient} failed: {failure}")]
    Delivery { recipient: String, failure: DeliveryFailure },
}

impl PipelineFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Extraction(_) => FailureKind::Extraction,
            Self::Validation(_) => FailureKind::Validation,
            Self::Render(_) => FailureKind::Render,
            Self::Delivery { .. } => FailureKind::Delivery,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Extraction(_) | Self::Validation(_) => GUIDANCE_MESSAGE.to_owned(),
            Self::Render(_) => RENDER_FAILURE_MESSAGE.to_owned(),
            Self::Delivery { recipient, .. } => {
                format!("Sorry, I created the quote but couldn't send the email to {recipient}.")
            }
        }
    }
}

fn join_fields(fields: &[FieldName]) -> String {
    fields.iter().map(FieldName::as_str).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::domain::fields::FieldName;
    use crate::errors::{
        DeliveryFailure, ExtractionFailure, FailureKind, PipelineFailure, RenderFailure,
        ValidationFailure, GUIDANCE_MESSAGE,
    };

    #[test]
    fn extraction_and_validation_failures_share_guidance_message() {
        let extraction = PipelineFailure::from(ExtractionFailure::MissingRequired(vec![
            FieldName::Email,
            FieldName::Rate,
        ]));
        let validation = PipelineFailure::from(ValidationFailure::MissingField(FieldName::Email));

        assert_eq!(extraction.kind(), FailureKind::Extraction);
        assert_eq!(validation.kind(), FailureKind::Validation);
        assert_eq!(extraction.user_message(), GUIDANCE_MESSAGE);
        assert_eq!(validation.user_message(), GUIDANCE_MESSAGE);
        assert!(extraction.to_string().contains("email, rate"));
    }

    #[test]
    fn render_failure_hides_internal_detail() {
        let failure =
            PipelineFailure::from(RenderFailure::TemplateNotFound(PathBuf::from("missing.tera")));

        assert_eq!(failure.kind(), FailureKind::Render);
        assert!(failure.user_message().contains("internal error"));
        assert!(!failure.user_message().contains("missing.tera"));
    }

    #[test]
    fn delivery_failure_names_the_recipient() {
        let failure = PipelineFailure::Delivery {
            recipient: "raju@example.com".to_owned(),
            failure: DeliveryFailure::Transport {
                transport: "postmark".to_owned(),
                reason: "401 unauthorized".to_owned(),
            },
        };

        assert_eq!(failure.kind(), FailureKind::Delivery);
        assert_eq!(
            failure.user_message(),
            "Sorry, I created the quote but couldn't send the email to raju@example.com."
        );
    }

    #[test]
    fn guidance_message_shows_every_required_label() {
        for label in ["Name:", "Product:", "Quantity:", "Rate:", "Email:"] {
            assert!(GUIDANCE_MESSAGE.contains(label), "guidance should mention {label}");
        }
    }
}
