use thiserror::Error;

use crate::domain::request::{RequestId, RequestState};
use crate::flows::{FlowTransitionError, WorkflowAction};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    FlowTransition(#[from] FlowTransitionError),
    #[error("required field `{field}` is missing")]
    MissingField { field: String },
    #[error("field `{field}` must not be negative")]
    NegativeAmount { field: String },
    #[error("field `{field}` is invalid: {message}")]
    InvalidField { field: String, message: String },
    #[error("execution must be explicitly confirmed")]
    ConfirmationRequired,
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Failure of a workflow command. Every variant is terminal for the call; the
/// workflow never retries on its own.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("validation failed for `{field}`: {message}")]
    Validation { field: String, message: String },
    #[error("cannot {action} a request in state `{from}`")]
    InvalidStateTransition { from: RequestState, action: WorkflowAction },
    #[error("execution of request `{request_id}` requires explicit confirmation")]
    ConfirmationRequired { request_id: RequestId },
    #[error("decommission request `{0}` was not found")]
    NotFound(RequestId),
    #[error(
        "decommission request `{request_id}` was modified concurrently (expected version {expected_version})"
    )]
    ConcurrentModification { request_id: RequestId, expected_version: u32 },
    #[error("document storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("actor `{actor}` is not allowed to {action}")]
    Forbidden { actor: String, action: WorkflowAction },
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl WorkflowError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    /// Lifts an aggregate-level failure into the command taxonomy. The request id is
    /// needed because the aggregate reports a missing confirmation without it.
    pub fn from_domain(error: DomainError, request_id: &RequestId) -> Self {
        match error {
            DomainError::FlowTransition(FlowTransitionError::InvalidTransition {
                state,
                action,
            }) => Self::InvalidStateTransition { from: state, action },
            DomainError::MissingField { field } => {
                Self::Validation { field, message: "a value is required".to_string() }
            }
            DomainError::NegativeAmount { field } => {
                Self::Validation { field, message: "must not be negative".to_string() }
            }
            DomainError::InvalidField { field, message } => Self::Validation { field, message },
            DomainError::ConfirmationRequired => {
                Self::ConfirmationRequired { request_id: request_id.clone() }
            }
            DomainError::InvariantViolation(message) => {
                Self::Validation { field: "request".to_string(), message }
            }
        }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::InvalidStateTransition { .. } => "invalid_state_transition",
            Self::ConfirmationRequired { .. } => "confirmation_required",
            Self::NotFound(_) => "not_found",
            Self::ConcurrentModification { .. } => "concurrent_modification",
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::Forbidden { .. } => "forbidden",
            Self::Persistence(_) => "persistence",
        }
    }

    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::PreconditionRequired { correlation_id: id, .. }
            | InterfaceError::Forbidden { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { error_class: &'static str, message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { error_class: &'static str, message: String, correlation_id: String },
    #[error("precondition required: {message}")]
    PreconditionRequired { message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::NotFound { .. } => "The decommission request does not exist.",
            Self::Conflict { error_class: "concurrent_modification", .. } => {
                "The request was changed by someone else. Reload it and try again."
            }
            Self::Conflict { .. } => "The request is not in a state that allows this action.",
            Self::PreconditionRequired { .. } => {
                "Confirm that the equipment was physically retired before completing execution."
            }
            Self::Forbidden { .. } => "You are not allowed to perform this action.",
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::PreconditionRequired { correlation_id, .. }
            | Self::Forbidden { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl From<WorkflowError> for InterfaceError {
    fn from(value: WorkflowError) -> Self {
        let error_class = value.error_class();
        let message = value.to_string();
        let correlation_id = "unassigned".to_owned();
        match value {
            WorkflowError::Validation { .. } => {
                Self::BadRequest { error_class, message, correlation_id }
            }
            WorkflowError::InvalidStateTransition { .. }
            | WorkflowError::ConcurrentModification { .. } => {
                Self::Conflict { error_class, message, correlation_id }
            }
            WorkflowError::ConfirmationRequired { .. } => {
                Self::PreconditionRequired { message, correlation_id }
            }
            WorkflowError::NotFound(_) => Self::NotFound { message, correlation_id },
            WorkflowError::Forbidden { .. } => Self::Forbidden { message, correlation_id },
            WorkflowError::StorageUnavailable(_) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
            WorkflowError::Persistence(_) => Self::Internal { message, correlation_id },
        }
    }
}
