pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod money;
pub mod normalize;
pub mod notify;
pub mod render;

pub use domain::fields::{CandidateFields, FieldName};
pub use domain::outcome::DeliveryOutcome;
pub use domain::quotation::Quotation;
pub use domain::request::{QuotationRequest, RequestId};
pub use errors::{
    DeliveryFailure, ExtractionFailure, FailureKind, PipelineFailure, RenderFailure,
    ValidationFailure,
};
pub use normalize::{Normalizer, NormalizerSettings};
pub use notify::{NotificationSink, NotifyError};
pub use render::{DocumentFormat, DocumentRenderer, RenderedDocument, RendererSettings};
