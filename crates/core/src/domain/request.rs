use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::document::Document;
use crate::domain::equipment::EquipmentSnapshot;
use crate::errors::DomainError;
use crate::flows::engine::{DecommissionFlow, FlowDefinition};
use crate::flows::states::{TransitionOutcome, WorkflowAction};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestCode(pub String);

impl fmt::Display for RequestCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Pending,
    Approved,
    Rejected,
    Executing,
    Executed,
}

impl RequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Executing => "executing",
            Self::Executed => "executed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "executing" => Some(Self::Executing),
            "executed" => Some(Self::Executed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Executed)
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclineType {
    TechnologicalObsolescence,
    EndOfLife,
    IrreparableDamage,
    ExcessiveMaintenanceCost,
    PartsUnavailable,
    RegulatoryNonCompliance,
    TechnologicalReplacement,
}

impl DeclineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TechnologicalObsolescence => "technological_obsolescence",
            Self::EndOfLife => "end_of_life",
            Self::IrreparableDamage => "irreparable_damage",
            Self::ExcessiveMaintenanceCost => "excessive_maintenance_cost",
            Self::PartsUnavailable => "parts_unavailable",
            Self::RegulatoryNonCompliance => "regulatory_non_compliance",
            Self::TechnologicalReplacement => "technological_replacement",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "technological_obsolescence" | "obsolescence" => Some(Self::TechnologicalObsolescence),
            "end_of_life" | "end_of_service_life" => Some(Self::EndOfLife),
            "irreparable_damage" => Some(Self::IrreparableDamage),
            "excessive_maintenance_cost" => Some(Self::ExcessiveMaintenanceCost),
            "parts_unavailable" | "parts_unavailability" => Some(Self::PartsUnavailable),
            "regulatory_non_compliance" => Some(Self::RegulatoryNonCompliance),
            "technological_replacement" => Some(Self::TechnologicalReplacement),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartCondition {
    Functional,
    NeedsRepair,
    NonFunctional,
}

impl PartCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Functional => "functional",
            Self::NeedsRepair => "needs_repair",
            Self::NonFunctional => "non_functional",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverablePart {
    pub id: PartId,
    pub name: String,
    pub description: String,
    pub condition: PartCondition,
    pub estimated_value: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicalEvaluation {
    pub evaluator: String,
    pub evaluated_at: DateTime<Utc>,
    pub approved: bool,
    pub observations: String,
    pub recommendations: Option<String>,
    pub approved_recoverable_value: Option<Decimal>,
}

impl TechnicalEvaluation {
    pub fn approval(
        evaluator: impl Into<String>,
        evaluated_at: DateTime<Utc>,
        observations: impl Into<String>,
        recommendations: Option<String>,
        approved_recoverable_value: Option<Decimal>,
    ) -> Result<Self, DomainError> {
        let evaluation = Self {
            evaluator: evaluator.into(),
            evaluated_at,
            approved: true,
            observations: observations.into(),
            recommendations,
            approved_recoverable_value,
        };
        evaluation.validate()?;
        Ok(evaluation)
    }

    /// The caller cannot carry an approved value into a rejection; it is always
    /// cleared here.
    pub fn rejection(
        evaluator: impl Into<String>,
        evaluated_at: DateTime<Utc>,
        observations: impl Into<String>,
        recommendations: Option<String>,
    ) -> Result<Self, DomainError> {
        let evaluation = Self {
            evaluator: evaluator.into(),
            evaluated_at,
            approved: false,
            observations: observations.into(),
            recommendations,
            approved_recoverable_value: None,
        };
        evaluation.validate()?;
        Ok(evaluation)
    }

    fn validate(&self) -> Result<(), DomainError> {
        require_text("evaluator", &self.evaluator)?;
        require_text("observations", &self.observations)?;
        if let Some(value) = self.approved_recoverable_value {
            require_non_negative("approved_recoverable_value", value)?;
            if !self.approved {
                return Err(DomainError::InvariantViolation(
                    "a rejected evaluation cannot carry an approved recoverable value".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStart {
    pub executor: String,
    pub started_at: DateTime<Utc>,
}

impl ExecutionStart {
    pub fn new(
        executor: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let start = Self { executor: executor.into(), started_at };
        require_text("executor", &start.executor)?;
        Ok(start)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub executed_at: DateTime<Utc>,
    pub executor: String,
    pub final_documents: Vec<Document>,
    pub final_recoverable_parts: Vec<RecoverablePart>,
    pub execution_notes: String,
    pub confirmed: bool,
}

impl ExecutionRecord {
    pub fn validate(&self) -> Result<(), DomainError> {
        require_text("executor", &self.executor)?;
        require_text("execution_notes", &self.execution_notes)?;
        validate_parts("final_recoverable_parts", &self.final_recoverable_parts)
    }

    pub fn recovered_value(&self) -> Decimal {
        self.final_recoverable_parts.iter().map(|part| part.estimated_value).sum()
    }
}

/// Input for a freshly created request. Lifecycle fields are not part of it: a new
/// request always starts pending with no evaluation or execution attached.
#[derive(Clone, Debug, PartialEq)]
pub struct NewDecommissionRequest {
    pub id: RequestId,
    pub request_code: RequestCode,
    pub equipment: EquipmentSnapshot,
    pub responsible_party: String,
    pub requester: String,
    pub decline_type: DeclineType,
    pub technical_justification: String,
    pub economic_justification: Option<String>,
    pub notes: Option<String>,
    pub estimated_recoverable_value: Option<Decimal>,
    pub recoverable_parts: Vec<RecoverablePart>,
    pub supporting_documents: Vec<Document>,
    pub created_at: DateTime<Utc>,
}

impl NewDecommissionRequest {
    pub fn validate(&self) -> Result<(), DomainError> {
        require_text("equipment.code", &self.equipment.code.0)?;
        require_text("equipment.name", &self.equipment.name)?;
        require_text("responsible_party", &self.responsible_party)?;
        require_text("requester", &self.requester)?;
        require_text("technical_justification", &self.technical_justification)?;
        if let Some(value) = self.estimated_recoverable_value {
            require_non_negative("estimated_recoverable_value", value)?;
        }
        validate_parts("recoverable_parts", &self.recoverable_parts)
    }
}

/// Lifecycle portion of the aggregate, as persisted. Used to rebuild a stored
/// request and checked for consistency before it is accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleSnapshot {
    pub state: RequestState,
    pub evaluation: Option<TechnicalEvaluation>,
    pub execution_start: Option<ExecutionStart>,
    pub execution: Option<ExecutionRecord>,
}

impl LifecycleSnapshot {
    fn check(&self) -> Result<(), DomainError> {
        let approved = self.evaluation.as_ref().map(|evaluation| evaluation.approved);
        let consistent = match self.state {
            RequestState::Pending => {
                approved.is_none() && self.execution_start.is_none() && self.execution.is_none()
            }
            RequestState::Approved => {
                approved == Some(true)
                    && self.execution_start.is_none()
                    && self.execution.is_none()
            }
            RequestState::Rejected => {
                approved == Some(false)
                    && self.execution_start.is_none()
                    && self.execution.is_none()
            }
            RequestState::Executing => {
                approved == Some(true) && self.execution_start.is_some() && self.execution.is_none()
            }
            RequestState::Executed => {
                approved == Some(true)
                    && self.execution.as_ref().map(|record| record.confirmed) == Some(true)
            }
        };

        if !consistent {
            return Err(DomainError::InvariantViolation(format!(
                "stored lifecycle is inconsistent with state `{}`",
                self.state.as_str()
            )));
        }

        if let Some(evaluation) = &self.evaluation {
            evaluation.validate()?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartConditionCounts {
    pub functional: usize,
    pub needs_repair: usize,
    pub non_functional: usize,
}

impl PartConditionCounts {
    fn tally(parts: &[RecoverablePart]) -> Self {
        parts.iter().fold(Self::default(), |mut counts, part| {
            match part.condition {
                PartCondition::Functional => counts.functional += 1,
                PartCondition::NeedsRepair => counts.needs_repair += 1,
                PartCondition::NonFunctional => counts.non_functional += 1,
            }
            counts
        })
    }

    pub fn total(&self) -> usize {
        self.functional + self.needs_repair + self.non_functional
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSummary {
    pub requested_recoverable_value: Option<Decimal>,
    pub approved_recoverable_value: Option<Decimal>,
    pub recovered_value: Option<Decimal>,
    pub candidate_parts: PartConditionCounts,
    pub final_parts: PartConditionCounts,
    pub supporting_documents: usize,
    pub final_documents: usize,
    pub document_bytes: u64,
}

/// Built only through `new` and `with_lifecycle`, never deserialized directly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecommissionRequest {
    pub id: RequestId,
    pub request_code: RequestCode,
    pub equipment: EquipmentSnapshot,
    pub responsible_party: String,
    pub requester: String,
    pub decline_type: DeclineType,
    pub technical_justification: String,
    pub economic_justification: Option<String>,
    pub notes: Option<String>,
    pub estimated_recoverable_value: Option<Decimal>,
    pub recoverable_parts: Vec<RecoverablePart>,
    pub supporting_documents: Vec<Document>,
    state: RequestState,
    evaluation: Option<TechnicalEvaluation>,
    execution_start: Option<ExecutionStart>,
    execution: Option<ExecutionRecord>,
    /// Optimistic concurrency token; bumped on every persisted transition.
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DecommissionRequest {
    pub fn new(input: NewDecommissionRequest) -> Result<Self, DomainError> {
        input.validate()?;

        Ok(Self {
            id: input.id,
            request_code: input.request_code,
            equipment: input.equipment,
            responsible_party: input.responsible_party,
            requester: input.requester,
            decline_type: input.decline_type,
            technical_justification: input.technical_justification,
            economic_justification: input.economic_justification,
            notes: input.notes,
            estimated_recoverable_value: input.estimated_recoverable_value,
            recoverable_parts: input.recoverable_parts,
            supporting_documents: input.supporting_documents,
            state: DecommissionFlow.initial_state(),
            evaluation: None,
            execution_start: None,
            execution: None,
            version: 1,
            created_at: input.created_at,
            updated_at: input.created_at,
        })
    }

    /// Rebuilds a stored request. The lifecycle is rejected when it could not have
    /// been produced by the transition rules.
    pub fn with_lifecycle(mut self, lifecycle: LifecycleSnapshot) -> Result<Self, DomainError> {
        lifecycle.check()?;
        self.state = lifecycle.state;
        self.evaluation = lifecycle.evaluation;
        self.execution_start = lifecycle.execution_start;
        self.execution = lifecycle.execution;
        Ok(self)
    }

    pub fn lifecycle(&self) -> LifecycleSnapshot {
        LifecycleSnapshot {
            state: self.state,
            evaluation: self.evaluation.clone(),
            execution_start: self.execution_start.clone(),
            execution: self.execution.clone(),
        }
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn evaluation(&self) -> Option<&TechnicalEvaluation> {
        self.evaluation.as_ref()
    }

    pub fn execution_start(&self) -> Option<&ExecutionStart> {
        self.execution_start.as_ref()
    }

    pub fn execution(&self) -> Option<&ExecutionRecord> {
        self.execution.as_ref()
    }

    /// The caller-supplied estimate is authoritative; the part list only stands in
    /// when no estimate was given.
    pub fn requested_recoverable_value(&self) -> Option<Decimal> {
        if let Some(value) = self.estimated_recoverable_value {
            return Some(value);
        }
        if self.recoverable_parts.is_empty() {
            return None;
        }
        Some(self.recoverable_parts.iter().map(|part| part.estimated_value).sum())
    }

    pub fn approved_recoverable_value(&self) -> Option<Decimal> {
        self.evaluation.as_ref().and_then(|evaluation| evaluation.approved_recoverable_value)
    }

    pub fn summary(&self) -> RequestSummary {
        let final_parts = self
            .execution
            .as_ref()
            .map(|record| PartConditionCounts::tally(&record.final_recoverable_parts))
            .unwrap_or_default();
        let final_documents =
            self.execution.as_ref().map(|record| record.final_documents.as_slice()).unwrap_or(&[]);
        let document_bytes = self
            .supporting_documents
            .iter()
            .chain(final_documents.iter())
            .map(|document| document.size_bytes)
            .sum();

        RequestSummary {
            requested_recoverable_value: self.requested_recoverable_value(),
            approved_recoverable_value: self.approved_recoverable_value(),
            recovered_value: self.execution.as_ref().map(ExecutionRecord::recovered_value),
            candidate_parts: PartConditionCounts::tally(&self.recoverable_parts),
            final_parts,
            supporting_documents: self.supporting_documents.len(),
            final_documents: final_documents.len(),
            document_bytes,
        }
    }

    pub fn record_evaluation(
        &mut self,
        evaluation: TechnicalEvaluation,
    ) -> Result<TransitionOutcome, DomainError> {
        let action =
            if evaluation.approved { WorkflowAction::Approve } else { WorkflowAction::Reject };
        let outcome = DecommissionFlow.transition(&self.state, &action)?;
        if self.evaluation.is_some() {
            return Err(DomainError::InvariantViolation(
                "technical evaluation is already recorded".to_string(),
            ));
        }
        evaluation.validate()?;
        if evaluation.evaluated_at < self.created_at {
            return Err(DomainError::InvalidField {
                field: "evaluated_at".to_string(),
                message: "date precedes the request creation".to_string(),
            });
        }

        self.evaluation = Some(evaluation);
        self.state = outcome.to;
        Ok(outcome)
    }

    pub fn begin_execution(
        &mut self,
        start: ExecutionStart,
    ) -> Result<TransitionOutcome, DomainError> {
        let outcome = DecommissionFlow.transition(&self.state, &WorkflowAction::BeginExecution)?;
        require_text("executor", &start.executor)?;
        self.require_not_before_evaluation("started_at", start.started_at)?;

        self.execution_start = Some(start);
        self.state = outcome.to;
        Ok(outcome)
    }

    pub fn complete_execution(
        &mut self,
        record: ExecutionRecord,
    ) -> Result<TransitionOutcome, DomainError> {
        let outcome =
            DecommissionFlow.transition(&self.state, &WorkflowAction::CompleteExecution)?;
        if !record.confirmed {
            return Err(DomainError::ConfirmationRequired);
        }
        record.validate()?;
        self.require_not_before_evaluation("executed_at", record.executed_at)?;
        if let Some(start) = &self.execution_start {
            if record.executed_at < start.started_at {
                return Err(DomainError::InvalidField {
                    field: "executed_at".to_string(),
                    message: "execution date precedes the start of execution".to_string(),
                });
            }
        }

        self.execution = Some(record);
        self.state = outcome.to;
        Ok(outcome)
    }

    fn require_not_before_evaluation(
        &self,
        field: &str,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        match &self.evaluation {
            Some(evaluation) if at < evaluation.evaluated_at => Err(DomainError::InvalidField {
                field: field.to_string(),
                message: "date precedes the technical evaluation".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

pub fn validate_parts(field: &str, parts: &[RecoverablePart]) -> Result<(), DomainError> {
    for (index, part) in parts.iter().enumerate() {
        require_text(&format!("{field}[{index}].name"), &part.name)?;
        require_non_negative(&format!("{field}[{index}].estimated_value"), part.estimated_value)?;
    }
    Ok(())
}

fn require_text(field: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::MissingField { field: field.to_string() });
    }
    Ok(())
}

fn require_non_negative(field: &str, value: Decimal) -> Result<(), DomainError> {
    if value < Decimal::ZERO {
        return Err(DomainError::NegativeAmount { field: field.to_string() });
    }
    Ok(())
}
