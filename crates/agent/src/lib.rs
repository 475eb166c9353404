//! Quotation agent runtime.
//!
//! - `llm`: generative model clients (OpenAI-compatible, Gemini)
//! - `extract`: AI and rule-based field extraction behind one trait
//! - `runtime`: the pipeline controller that extracts, normalizes, renders, delivers and
//!   reports back to the sender
//!
//! The model only reads text. Totals, validation and formatting are decided by the
//! deterministic core.

pub mod extract;
pub mod llm;
pub mod runtime;

pub use extract::{AiExtractor, FieldExtractor, RuleExtractor};
pub use llm::LlmClient;
pub use runtime::{PipelineOutcome, PipelineReport, QuotationRuntime, RuntimeParts};
