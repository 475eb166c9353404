use thiserror::Error;

use crate::errors::FailureKind;
use crate::flows::states::{PipelineAction, PipelineEvent, PipelineState, TransitionOutcome};

pub trait FlowDefinition {
    fn initial_state(&self) -> PipelineState;
    fn transition(
        &self,
        current: PipelineState,
        event: &PipelineEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

/// The single quotation pipeline: every stage either advances or drops to `Reported`.
#[derive(Clone, Debug, Default)]
pub struct QuotationFlow;

impl FlowDefinition for QuotationFlow {
    fn initial_state(&self) -> PipelineState {
        PipelineState::Received
    }

    fn transition(
        &self,
        current: PipelineState,
        event: &PipelineEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_quotation(current, event)
    }
}

pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_state(&self) -> PipelineState {
        self.flow.initial_state()
    }

    pub fn apply(
        &self,
        current: PipelineState,
        event: &PipelineEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, event)
    }
}

impl Default for FlowEngine<QuotationFlow> {
    fn default() -> Self {
        Self::new(QuotationFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: PipelineState, event: PipelineEvent },
    #[error("{kind:?} failure cannot be raised while {state:?}")]
    MisplacedFailure { state: PipelineState, kind: FailureKind },
}

/// The stage during which a failure of `kind` may occur.
fn failing_stage(kind: FailureKind) -> PipelineState {
    match kind {
        FailureKind::Extraction => PipelineState::Extracting,
        FailureKind::Validation => PipelineState::Normalizing,
        FailureKind::Render => PipelineState::Rendering,
        FailureKind::Delivery => PipelineState::Delivering,
    }
}

fn transition_quotation(
    current: PipelineState,
    event: &PipelineEvent,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use PipelineAction::{
        DeliverDocument, ExtractFields, NormalizeFields, NotifySender, ReleaseDocument,
        RenderDocument,
    };
    use PipelineEvent::{
        DeliveryFinished, DocumentRendered, Failed, FieldsExtracted, QuotationValidated,
        RequestAccepted,
    };
    use PipelineState::{Delivering, Extracting, Normalizing, Received, Rendering, Reported};

    let (to, actions) = match (current, event) {
        (Received, RequestAccepted) => (Extracting, vec![ExtractFields]),
        (Extracting, FieldsExtracted) => (Normalizing, vec![NormalizeFields]),
        (Normalizing, QuotationValidated) => (Rendering, vec![RenderDocument]),
        (Rendering, DocumentRendered) => (Delivering, vec![DeliverDocument]),
        (Delivering, DeliveryFinished) => (Reported, vec![ReleaseDocument, NotifySender]),
        (Delivering, Failed { kind: FailureKind::Delivery }) => {
            (Reported, vec![ReleaseDocument, NotifySender])
        }
        (state, Failed { kind }) if !state.is_terminal() => {
            if failing_stage(*kind) != state {
                return Err(FlowTransitionError::MisplacedFailure { state, kind: *kind });
            }
            (Reported, vec![NotifySender])
        }
        _ => {
            return Err(FlowTransitionError::InvalidTransition {
                state: current,
                event: event.clone(),
            });
        }
    };

    Ok(TransitionOutcome { from: current, to, event: event.clone(), actions })
}

#[cfg(test)]
mod tests {
    use crate::errors::FailureKind;
    use crate::flows::engine::{FlowEngine, FlowTransitionError};
    use crate::flows::states::{PipelineAction, PipelineEvent, PipelineState};

    #[test]
    fn happy_path_visits_every_stage() {
        let engine = FlowEngine::default();
        let mut state = engine.initial_state();
        let mut visited = vec![state];

        for event in [
            PipelineEvent::RequestAccepted,
            PipelineEvent::FieldsExtracted,
            PipelineEvent::QuotationValidated,
            PipelineEvent::DocumentRendered,
            PipelineEvent::DeliveryFinished,
        ] {
            state = engine.apply(state, &event).expect("happy path transition").to;
            visited.push(state);
        }

        assert_eq!(
            visited,
            vec![
                PipelineState::Received,
                PipelineState::Extracting,
                PipelineState::Normalizing,
                PipelineState::Rendering,
                PipelineState::Delivering,
                PipelineState::Reported,
            ]
        );
    }

    #[test]
    fn failure_in_each_stage_goes_straight_to_reported() {
        let engine = FlowEngine::default();
        let cases = [
            (PipelineState::Extracting, FailureKind::Extraction),
            (PipelineState::Normalizing, FailureKind::Validation),
            (PipelineState::Rendering, FailureKind::Render),
        ];

        for (state, kind) in cases {
            let outcome =
                engine.apply(state, &PipelineEvent::Failed { kind }).expect("failure edge");
            assert_eq!(outcome.to, PipelineState::Reported);
            assert_eq!(outcome.actions, vec![PipelineAction::NotifySender]);
        }
    }

    #[test]
    fn delivery_failure_still_releases_the_document() {
        let outcome = FlowEngine::default()
            .apply(
                PipelineState::Delivering,
                &PipelineEvent::Failed { kind: FailureKind::Delivery },
            )
            .expect("delivery failure edge");

        assert_eq!(outcome.to, PipelineState::Reported);
        assert_eq!(
            outcome.actions,
            vec![PipelineAction::ReleaseDocument, PipelineAction::NotifySender]
        );
    }

    #[test]
    fn failure_must_match_the_current_stage() {
        let error = FlowEngine::default()
            .apply(
                PipelineState::Extracting,
                &PipelineEvent::Failed { kind: FailureKind::Render },
            )
            .expect_err("render failure while extracting");

        assert_eq!(
            error,
            FlowTransitionError::MisplacedFailure {
                state: PipelineState::Extracting,
                kind: FailureKind::Render,
            }
        );
    }

    #[test]
    fn stages_cannot_be_skipped_and_reported_is_terminal() {
        let engine = FlowEngine::default();

        let skipped = engine
            .apply(PipelineState::Received, &PipelineEvent::DocumentRendered)
            .expect_err("received cannot jump to delivering");
        assert!(matches!(skipped, FlowTransitionError::InvalidTransition { .. }));

        let after_report = engine
            .apply(
                PipelineState::Reported,
                &PipelineEvent::Failed { kind: FailureKind::Delivery },
            )
            .expect_err("reported is terminal");
        assert!(matches!(
            after_report,
            FlowTransitionError::InvalidTransition { state: PipelineState::Reported, .. }
        ));
    }
}
