use thiserror::Error;

use crate::domain::request::RequestState;
use crate::flows::states::{TransitionOutcome, WorkflowAction};

pub trait FlowDefinition {
    fn initial_state(&self) -> RequestState;
    fn transition(
        &self,
        current: &RequestState,
        action: &WorkflowAction,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

/// Decommission lifecycle: `Pending -> Approved | Rejected`, then
/// `Approved -> Executing -> Executed`. Completion may also be taken straight from
/// `Approved` when no separate start of execution was recorded.
#[derive(Clone, Copy, Debug, Default)]
pub struct DecommissionFlow;

impl FlowDefinition for DecommissionFlow {
    fn initial_state(&self) -> RequestState {
        RequestState::Pending
    }

    fn transition(
        &self,
        current: &RequestState,
        action: &WorkflowAction,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_decommission(current, action)
    }
}

#[derive(Clone, Debug)]
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

    pub fn initial_state(&self) -> RequestState {
        self.flow.initial_state()
    }

    pub fn apply(
        &self,
        current: &RequestState,
        action: &WorkflowAction,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, action)
    }

    pub fn permitted_actions(&self, current: &RequestState) -> Vec<WorkflowAction> {
        WorkflowAction::all()
            .into_iter()
            .filter(|action| self.flow.transition(current, action).is_ok())
            .collect()
    }
}

impl Default for FlowEngine<DecommissionFlow> {
    fn default() -> Self {
        Self::new(DecommissionFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("action `{action}` is not allowed from state `{state}`")]
    InvalidTransition { state: RequestState, action: WorkflowAction },
}

fn transition_decommission(
    current: &RequestState,
    action: &WorkflowAction,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use RequestState::{Approved, Executed, Executing, Pending, Rejected};
    use WorkflowAction::{Approve, BeginExecution, CompleteExecution, Reject};

    let to = match (current, action) {
        (Pending, Approve) => Approved,
        (Pending, Reject) => Rejected,
        (Approved, BeginExecution) => Executing,
        (Approved, CompleteExecution) | (Executing, CompleteExecution) => Executed,
        _ => {
            return Err(FlowTransitionError::InvalidTransition {
                state: *current,
                action: *action,
            });
        }
    };

    Ok(TransitionOutcome { from: *current, to, action: *action })
}

#[cfg(test)]
mod tests {
    use crate::domain::request::RequestState;
    use crate::flows::engine::{DecommissionFlow, FlowEngine, FlowTransitionError};
    use crate::flows::states::WorkflowAction;

    const STATES: [RequestState; 5] = [
        RequestState::Pending,
        RequestState::Approved,
        RequestState::Rejected,
        RequestState::Executing,
        RequestState::Executed,
    ];

    #[test]
    fn approval_then_staged_execution_reaches_executed() {
        let engine = FlowEngine::new(DecommissionFlow);
        let mut state = engine.initial_state();

        for action in
            [WorkflowAction::Approve, WorkflowAction::BeginExecution, WorkflowAction::CompleteExecution]
        {
            state = engine.apply(&state, &action).expect("happy path transition").to;
        }

        assert_eq!(state, RequestState::Executed);
    }

    #[test]
    fn completion_can_fold_the_start_of_execution() {
        let engine = FlowEngine::default();
        let outcome = engine
            .apply(&RequestState::Approved, &WorkflowAction::CompleteExecution)
            .expect("approved -> executed");

        assert_eq!(outcome.from, RequestState::Approved);
        assert_eq!(outcome.to, RequestState::Executed);
    }

    #[test]
    fn terminal_states_permit_nothing() {
        let engine = FlowEngine::default();

        for state in STATES.iter().filter(|state| state.is_terminal()) {
            assert!(engine.permitted_actions(state).is_empty(), "{state:?} should be terminal");
        }
    }

    #[test]
    fn executed_is_only_reachable_from_approved_or_executing() {
        let engine = FlowEngine::default();

        for state in STATES {
            for action in WorkflowAction::all() {
                if let Ok(outcome) = engine.apply(&state, &action) {
                    if outcome.to == RequestState::Executed {
                        assert!(matches!(
                            state,
                            RequestState::Approved | RequestState::Executing
                        ));
                    }
                }
            }
        }
    }

    #[test]
    fn second_evaluation_is_an_invalid_transition() {
        let engine = FlowEngine::default();
        let error = engine
            .apply(&RequestState::Approved, &WorkflowAction::Approve)
            .expect_err("approved cannot be approved again");

        assert_eq!(
            error,
            FlowTransitionError::InvalidTransition {
                state: RequestState::Approved,
                action: WorkflowAction::Approve,
            }
        );
    }

    #[test]
    fn create_is_never_a_transition_between_states() {
        let engine = FlowEngine::default();

        for state in STATES {
            assert!(engine.apply(&state, &WorkflowAction::Create).is_err());
        }
    }
}
