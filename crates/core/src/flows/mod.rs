pub mod engine;
pub mod states;

pub use engine::{DecommissionFlow, FlowDefinition, FlowEngine, FlowTransitionError};
pub use states::{TransitionOutcome, WorkflowAction};
