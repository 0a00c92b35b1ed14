use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::request::RequestState;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowAction {
    Create,
    Approve,
    Reject,
    BeginExecution,
    CompleteExecution,
}

impl WorkflowAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::BeginExecution => "begin_execution",
            Self::CompleteExecution => "complete_execution",
        }
    }

    pub fn all() -> [Self; 5] {
        [Self::Create, Self::Approve, Self::Reject, Self::BeginExecution, Self::CompleteExecution]
    }
}

impl fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: RequestState,
    pub to: RequestState,
    pub action: WorkflowAction,
}
