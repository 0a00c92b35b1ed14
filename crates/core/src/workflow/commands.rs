use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::AuditContext;
use crate::domain::actor::Actor;
use crate::domain::document::DocumentSource;
use crate::domain::request::{
    DeclineType, DecommissionRequest, PartCondition, PartId, RecoverablePart, RequestCode,
    RequestId,
};

/// Who is issuing a command and under which correlation id it is traced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandContext {
    pub actor: Actor,
    pub correlation_id: String,
}

impl CommandContext {
    pub fn new(actor: Actor, correlation_id: impl Into<String>) -> Self {
        Self { actor, correlation_id: correlation_id.into() }
    }

    pub fn audit(&self, request_id: Option<RequestId>) -> AuditContext {
        AuditContext::new(request_id, self.correlation_id.clone(), self.actor.id.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub condition: PartCondition,
    pub estimated_value: Decimal,
}

impl PartInput {
    pub fn into_part(self) -> RecoverablePart {
        RecoverablePart {
            id: PartId(Uuid::new_v4().to_string()),
            name: self.name,
            description: self.description,
            condition: self.condition,
            estimated_value: self.estimated_value,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequestCommand {
    pub equipment_code: String,
    pub decline_type: DeclineType,
    pub technical_justification: String,
    pub responsible_party: String,
    /// Defaults to the issuing actor's display name.
    #[serde(default)]
    pub requester: Option<String>,
    #[serde(default)]
    pub economic_justification: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub estimated_recoverable_value: Option<Decimal>,
    #[serde(default)]
    pub recoverable_parts: Vec<PartInput>,
    #[serde(default)]
    pub supporting_documents: Vec<DocumentSource>,
}

impl CreateRequestCommand {
    pub fn new(
        equipment_code: impl Into<String>,
        decline_type: DeclineType,
        technical_justification: impl Into<String>,
        responsible_party: impl Into<String>,
    ) -> Self {
        Self {
            equipment_code: equipment_code.into(),
            decline_type,
            technical_justification: technical_justification.into(),
            responsible_party: responsible_party.into(),
            requester: None,
            economic_justification: None,
            notes: None,
            estimated_recoverable_value: None,
            recoverable_parts: Vec::new(),
            supporting_documents: Vec::new(),
        }
    }
}

/// Payload of both approve and reject. On rejection the approved value is ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationCommand {
    pub observations: String,
    #[serde(default)]
    pub recommendations: Option<String>,
    #[serde(default)]
    pub approved_recoverable_value: Option<Decimal>,
    #[serde(default)]
    pub evaluated_at: Option<DateTime<Utc>>,
}

impl EvaluationCommand {
    pub fn new(observations: impl Into<String>) -> Self {
        Self { observations: observations.into(), ..Self::default() }
    }

    pub fn with_approved_value(mut self, value: Decimal) -> Self {
        self.approved_recoverable_value = Some(value);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeginExecutionCommand {
    pub executor: String,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteExecutionCommand {
    pub executor: String,
    #[serde(default)]
    pub executed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub execution_notes: String,
    #[serde(default)]
    pub final_recoverable_parts: Vec<PartInput>,
    #[serde(default)]
    pub final_documents: Vec<DocumentSource>,
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedRequest {
    pub id: RequestId,
    pub request_code: RequestCode,
}

impl From<&DecommissionRequest> for CreatedRequest {
    fn from(request: &DecommissionRequest) -> Self {
        Self { id: request.id.clone(), request_code: request.request_code.clone() }
    }
}
