pub mod engine;
pub mod states;

pub use engine::{FlowDefinition, FlowEngine, FlowTransitionError, QuotationFlow};
pub use states::{PipelineAction, PipelineEvent, PipelineState, TransitionOutcome};
