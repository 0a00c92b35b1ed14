pub mod code;
pub mod commands;
pub mod service;

pub use code::RequestCodeFormat;
pub use commands::{
    BeginExecutionCommand, CommandContext, CompleteExecutionCommand, CreateRequestCommand,
    CreatedRequest, EvaluationCommand, PartInput,
};
pub use service::{DecommissionService, WorkflowSettings};
