//! Raw enquiry text to [`CandidateFields`].
//!
//! Two strategies share [`FieldExtractor`]: the model-backed [`AiExtractor`] and the
//! label-scanning [`RuleExtractor`]. The runtime tries them in priority order and takes the
//! first that does not fail.

pub mod ai;
pub mod rules;

use async_trait::async_trait;
use quotedesk_core::domain::fields::CandidateFields;
use quotedesk_core::errors::ExtractionFailure;

pub use ai::{AiExtractor, EXTRACTION_INSTRUCTION};
pub use rules::RuleExtractor;

#[async_trait]
pub trait FieldExtractor: Send + Sync {
    fn name(&self) -> &'static str;
    async fn extract(&self, text: &str) -> Result<CandidateFields, ExtractionFailure>;
}
