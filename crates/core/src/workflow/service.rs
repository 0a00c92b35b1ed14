use std::sync::Arc;

use chrono::{Datelike, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{AuditCategory, AuditOutcome, AuditSink, TracingAuditSink};
use crate::authorization::{AuthorizationPolicy, RoleAuthorizationPolicy};
use crate::domain::document::{Document, DocumentId, DocumentSource, MimeCategory};
use crate::domain::equipment::{EquipmentCode, EquipmentSnapshot};
use crate::domain::request::{
    DecommissionRequest, ExecutionRecord, ExecutionStart, NewDecommissionRequest, RequestCode,
    RequestId, TechnicalEvaluation,
};
use crate::errors::{DomainError, WorkflowError};
use crate::flows::{DecommissionFlow, FlowEngine, TransitionOutcome, WorkflowAction};
use crate::ports::{DocumentStore, EquipmentCatalog, PortError, RequestRepository};
use crate::workflow::code::RequestCodeFormat;
use crate::workflow::commands::{
    BeginExecutionCommand, CommandContext, CompleteExecutionCommand, CreateRequestCommand,
    EvaluationCommand, PartInput,
};

pub const DEFAULT_MAX_DOCUMENT_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkflowSettings {
    pub code_format: RequestCodeFormat,
    pub max_document_bytes: u64,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            code_format: RequestCodeFormat::default(),
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }
}

/// Runs every decommission command as one read-modify-write against the repository.
///
/// Order of checks per command: authorization, load, state, confirmation, payload,
/// document storage, persistence. Documents are stored only after the payload has been
/// accepted by a dry run on a copy of the aggregate, and the aggregate is saved only
/// once every document has a blob reference. Nothing is retried here.
#[derive(Clone)]
pub struct DecommissionService {
    repository: Arc<dyn RequestRepository>,
    documents: Arc<dyn DocumentStore>,
    catalog: Arc<dyn EquipmentCatalog>,
    authorization: Arc<dyn AuthorizationPolicy>,
    audit: Arc<dyn AuditSink>,
    engine: FlowEngine<DecommissionFlow>,
    settings: WorkflowSettings,
}

impl DecommissionService {
    pub fn new(
        repository: Arc<dyn RequestRepository>,
        documents: Arc<dyn DocumentStore>,
        catalog: Arc<dyn EquipmentCatalog>,
    ) -> Self {
        Self {
            repository,
            documents,
            catalog,
            authorization: Arc::new(RoleAuthorizationPolicy::default()),
            audit: Arc::new(TracingAuditSink),
            engine: FlowEngine::default(),
            settings: WorkflowSettings::default(),
        }
    }

    pub fn with_authorization(mut self, authorization: Arc<dyn AuthorizationPolicy>) -> Self {
        self.authorization = authorization;
        self
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_settings(mut self, settings: WorkflowSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    pub fn permitted_actions(&self, request: &DecommissionRequest) -> Vec<WorkflowAction> {
        self.engine.permitted_actions(&request.state())
    }

    pub async fn get_request(&self, id: &RequestId) -> Result<DecommissionRequest, WorkflowError> {
        self.load(id).await
    }

    pub async fn create_request(
        &self,
        ctx: &CommandContext,
        command: CreateRequestCommand,
    ) -> Result<DecommissionRequest, WorkflowError> {
        match self.create_inner(ctx, command).await {
            Ok(request) => {
                self.audit.emit(
                    ctx.audit(Some(request.id.clone()))
                        .event(
                            event_name(WorkflowAction::Create),
                            AuditCategory::Workflow,
                            AuditOutcome::Success,
                        )
                        .with_metadata("request_code", request.request_code.0.clone())
                        .with_metadata("to", request.state().as_str()),
                );
                info!(
                    event_name = event_name(WorkflowAction::Create),
                    correlation_id = %ctx.correlation_id,
                    request_id = %request.id,
                    request_code = %request.request_code,
                    equipment_code = %request.equipment.code.0,
                    actor = %ctx.actor.id,
                    "decommission request created"
                );
                Ok(request)
            }
            Err(error) => {
                self.record_refusal(ctx, None, WorkflowAction::Create, &error);
                Err(error)
            }
        }
    }

    pub async fn approve_request(
        &self,
        ctx: &CommandContext,
        id: &RequestId,
        command: EvaluationCommand,
    ) -> Result<DecommissionRequest, WorkflowError> {
        let result = self.evaluate_inner(ctx, id, command, WorkflowAction::Approve).await;
        self.finish_transition(ctx, id, WorkflowAction::Approve, result)
    }

    pub async fn reject_request(
        &self,
        ctx: &CommandContext,
        id: &RequestId,
        command: EvaluationCommand,
    ) -> Result<DecommissionRequest, WorkflowError> {
        let result = self.evaluate_inner(ctx, id, command, WorkflowAction::Reject).await;
        self.finish_transition(ctx, id, WorkflowAction::Reject, result)
    }

    pub async fn begin_execution(
        &self,
        ctx: &CommandContext,
        id: &RequestId,
        command: BeginExecutionCommand,
    ) -> Result<DecommissionRequest, WorkflowError> {
        let result = self.begin_execution_inner(ctx, id, command).await;
        self.finish_transition(ctx, id, WorkflowAction::BeginExecution, result)
    }

    pub async fn execute_request(
        &self,
        ctx: &CommandContext,
        id: &RequestId,
        command: CompleteExecutionCommand,
    ) -> Result<DecommissionRequest, WorkflowError> {
        let result = self.execute_inner(ctx, id, command).await;
        self.finish_transition(ctx, id, WorkflowAction::CompleteExecution, result)
    }

    async fn create_inner(
        &self,
        ctx: &CommandContext,
        command: CreateRequestCommand,
    ) -> Result<DecommissionRequest, WorkflowError> {
        self.authorize(ctx, WorkflowAction::Create)?;
        let equipment = self.lookup_equipment(&command.equipment_code).await?;

        let now = Utc::now();
        let mut draft = NewDecommissionRequest {
            id: RequestId(Uuid::new_v4().to_string()),
            request_code: RequestCode(String::new()),
            equipment,
            responsible_party: command.responsible_party,
            requester: command.requester.unwrap_or_else(|| ctx.actor.label().to_string()),
            decline_type: command.decline_type,
            technical_justification: command.technical_justification,
            economic_justification: command.economic_justification,
            notes: command.notes,
            estimated_recoverable_value: command.estimated_recoverable_value,
            recoverable_parts: command
                .recoverable_parts
                .into_iter()
                .map(PartInput::into_part)
                .collect(),
            supporting_documents: Vec::new(),
            created_at: now,
        };
        draft.validate().map_err(|error| WorkflowError::from_domain(error, &draft.id))?;

        draft.supporting_documents = self
            .store_documents(ctx, &draft.id, "supporting_documents", command.supporting_documents)
            .await?;

        let sequence =
            self.repository.next_code_sequence(now.year()).await.map_err(persistence_error)?;
        draft.request_code = self.settings.code_format.format(now.year(), sequence);

        let id = draft.id.clone();
        let request = DecommissionRequest::new(draft)
            .map_err(|error| WorkflowError::from_domain(error, &id))?;
        self.repository.insert(request.clone()).await.map_err(persistence_error)?;
        Ok(request)
    }

    async fn evaluate_inner(
        &self,
        ctx: &CommandContext,
        id: &RequestId,
        command: EvaluationCommand,
        action: WorkflowAction,
    ) -> Result<(DecommissionRequest, TransitionOutcome), WorkflowError> {
        self.authorize(ctx, action)?;
        let mut request = self.load(id).await?;
        self.check_transition(&request, action)?;

        let now = Utc::now();
        let evaluated_at = command.evaluated_at.unwrap_or(now);
        if evaluated_at > now {
            return Err(WorkflowError::validation("evaluated_at", "date is in the future"));
        }
        let evaluator = ctx.actor.label().to_string();
        let evaluation = if action == WorkflowAction::Approve {
            let approved_value = command
                .approved_recoverable_value
                .or_else(|| request.requested_recoverable_value());
            TechnicalEvaluation::approval(
                evaluator,
                evaluated_at,
                command.observations,
                command.recommendations,
                approved_value,
            )
        } else {
            TechnicalEvaluation::rejection(
                evaluator,
                evaluated_at,
                command.observations,
                command.recommendations,
            )
        }
        .map_err(|error| WorkflowError::from_domain(error, id))?;

        let outcome = request
            .record_evaluation(evaluation)
            .map_err(|error| WorkflowError::from_domain(error, id))?;
        self.persist(&mut request).await?;
        Ok((request, outcome))
    }

    async fn begin_execution_inner(
        &self,
        ctx: &CommandContext,
        id: &RequestId,
        command: BeginExecutionCommand,
    ) -> Result<(DecommissionRequest, TransitionOutcome), WorkflowError> {
        self.authorize(ctx, WorkflowAction::BeginExecution)?;
        let mut request = self.load(id).await?;
        self.check_transition(&request, WorkflowAction::BeginExecution)?;

        let started_at = command.started_at.unwrap_or_else(Utc::now);
        let outcome = ExecutionStart::new(command.executor, started_at)
            .and_then(|start| request.begin_execution(start))
            .map_err(|error| WorkflowError::from_domain(error, id))?;
        self.persist(&mut request).await?;
        Ok((request, outcome))
    }

    async fn execute_inner(
        &self,
        ctx: &CommandContext,
        id: &RequestId,
        command: CompleteExecutionCommand,
    ) -> Result<(DecommissionRequest, TransitionOutcome), WorkflowError> {
        self.authorize(ctx, WorkflowAction::CompleteExecution)?;
        let mut request = self.load(id).await?;
        self.check_transition(&request, WorkflowAction::CompleteExecution)?;
        if !command.confirmed {
            return Err(WorkflowError::ConfirmationRequired { request_id: id.clone() });
        }

        let mut record = ExecutionRecord {
            executed_at: command.executed_at.unwrap_or_else(Utc::now),
            executor: command.executor,
            final_documents: Vec::new(),
            final_recoverable_parts: command
                .final_recoverable_parts
                .into_iter()
                .map(PartInput::into_part)
                .collect(),
            execution_notes: command.execution_notes,
            confirmed: command.confirmed,
        };
        request
            .clone()
            .complete_execution(record.clone())
            .map_err(|error| WorkflowError::from_domain(error, id))?;

        record.final_documents =
            self.store_documents(ctx, id, "final_documents", command.final_documents).await?;
        let outcome = request
            .complete_execution(record)
            .map_err(|error| WorkflowError::from_domain(error, id))?;
        self.persist(&mut request).await?;
        Ok((request, outcome))
    }

    fn authorize(&self, ctx: &CommandContext, action: WorkflowAction) -> Result<(), WorkflowError> {
        let decision = self.authorization.authorize(&ctx.actor, action);
        if decision.allowed {
            return Ok(());
        }
        Err(WorkflowError::Forbidden { actor: ctx.actor.id.clone(), action })
    }

    fn check_transition(
        &self,
        request: &DecommissionRequest,
        action: WorkflowAction,
    ) -> Result<TransitionOutcome, WorkflowError> {
        self.engine
            .apply(&request.state(), &action)
            .map_err(|error| WorkflowError::from_domain(DomainError::from(error), &request.id))
    }

    async fn load(&self, id: &RequestId) -> Result<DecommissionRequest, WorkflowError> {
        self.repository.get(id).await.map_err(|error| match error {
            PortError::NotFound => WorkflowError::NotFound(id.clone()),
            other => persistence_error(other),
        })
    }

    async fn persist(&self, request: &mut DecommissionRequest) -> Result<(), WorkflowError> {
        let expected_version = request.version;
        request.version = expected_version.saturating_add(1);
        request.updated_at = Utc::now();

        self.repository.save(request, expected_version).await.map_err(|error| match error {
            PortError::VersionConflict => WorkflowError::ConcurrentModification {
                request_id: request.id.clone(),
                expected_version,
            },
            PortError::NotFound => WorkflowError::NotFound(request.id.clone()),
            other => persistence_error(other),
        })
    }

    async fn lookup_equipment(&self, code: &str) -> Result<EquipmentSnapshot, WorkflowError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(WorkflowError::validation("equipment_code", "a value is required"));
        }

        match self.catalog.lookup(&EquipmentCode(code.to_string())).await {
            Ok(Some(snapshot)) => Ok(snapshot),
            Ok(None) => Err(WorkflowError::validation(
                "equipment_code",
                format!("no equipment is registered under `{code}`"),
            )),
            Err(error) => Err(WorkflowError::Persistence(format!("equipment catalog: {error}"))),
        }
    }

    /// Checks every source before the first upload so a bad entry late in the list
    /// never leaves earlier blobs behind.
    async fn store_documents(
        &self,
        ctx: &CommandContext,
        request_id: &RequestId,
        field: &str,
        sources: Vec<DocumentSource>,
    ) -> Result<Vec<Document>, WorkflowError> {
        let limit = self.settings.max_document_bytes;
        for (index, source) in sources.iter().enumerate() {
            if source.filename().trim().is_empty() {
                return Err(WorkflowError::validation(
                    format!("{field}[{index}].filename"),
                    "a value is required",
                ));
            }
            if let DocumentSource::Upload { content, .. } = source {
                check_document_size(field, index, content.len() as u64, limit)?;
            }
        }

        let mut stored = Vec::with_capacity(sources.len());
        for (index, source) in sources.into_iter().enumerate() {
            let document = match source {
                DocumentSource::Upload { filename, content } => {
                    let size_bytes = content.len() as u64;
                    let blob_ref = self
                        .documents
                        .upload(&filename, content)
                        .await
                        .map_err(|error| WorkflowError::StorageUnavailable(error.to_string()))?;
                    Document {
                        id: DocumentId(Uuid::new_v4().to_string()),
                        mime_category: MimeCategory::from_filename(&filename),
                        filename,
                        size_bytes,
                        uploaded_at: Utc::now(),
                        blob_ref,
                    }
                }
                DocumentSource::Stored { filename, blob_ref } => {
                    let metadata =
                        self.documents.describe(&blob_ref).await.map_err(|error| match error {
                            PortError::NotFound => WorkflowError::validation(
                                format!("{field}[{index}].blob_ref"),
                                format!("no stored document `{}`", blob_ref.0),
                            ),
                            other => WorkflowError::StorageUnavailable(other.to_string()),
                        })?;
                    check_document_size(field, index, metadata.size_bytes, limit)?;
                    Document {
                        id: DocumentId(Uuid::new_v4().to_string()),
                        filename,
                        mime_category: metadata.mime_category,
                        size_bytes: metadata.size_bytes,
                        uploaded_at: Utc::now(),
                        blob_ref,
                    }
                }
            };
            stored.push(document);
        }

        if !stored.is_empty() {
            self.audit.emit(
                ctx.audit(Some(request_id.clone()))
                    .event(
                        "decommission.documents.stored",
                        AuditCategory::Documents,
                        AuditOutcome::Success,
                    )
                    .with_metadata("field", field)
                    .with_metadata("count", stored.len().to_string()),
            );
        }
        Ok(stored)
    }

    fn finish_transition(
        &self,
        ctx: &CommandContext,
        id: &RequestId,
        action: WorkflowAction,
        result: Result<(DecommissionRequest, TransitionOutcome), WorkflowError>,
    ) -> Result<DecommissionRequest, WorkflowError> {
        match result {
            Ok((request, outcome)) => {
                self.audit.emit(
                    ctx.audit(Some(request.id.clone()))
                        .event(event_name(action), AuditCategory::Workflow, AuditOutcome::Success)
                        .with_metadata("from", outcome.from.as_str())
                        .with_metadata("to", outcome.to.as_str())
                        .with_metadata("version", request.version.to_string()),
                );
                info!(
                    event_name = event_name(action),
                    correlation_id = %ctx.correlation_id,
                    request_id = %request.id,
                    request_code = %request.request_code,
                    actor = %ctx.actor.id,
                    from = outcome.from.as_str(),
                    to = outcome.to.as_str(),
                    version = request.version,
                    "decommission request transitioned"
                );
                Ok(request)
            }
            Err(error) => {
                self.record_refusal(ctx, Some(id), action, &error);
                Err(error)
            }
        }
    }

    fn record_refusal(
        &self,
        ctx: &CommandContext,
        request_id: Option<&RequestId>,
        action: WorkflowAction,
        error: &WorkflowError,
    ) {
        let (category, outcome) = match error {
            WorkflowError::Forbidden { .. } => (AuditCategory::Authorization, AuditOutcome::Rejected),
            WorkflowError::StorageUnavailable(_) => (AuditCategory::Documents, AuditOutcome::Failed),
            WorkflowError::ConcurrentModification { .. } => {
                (AuditCategory::Persistence, AuditOutcome::Rejected)
            }
            WorkflowError::Persistence(_) => (AuditCategory::Persistence, AuditOutcome::Failed),
            _ => (AuditCategory::Workflow, AuditOutcome::Rejected),
        };

        self.audit.emit(
            ctx.audit(request_id.cloned())
                .event("decommission.request.command_refused", category, outcome)
                .with_metadata("action", action.as_str())
                .with_metadata("error_class", error.error_class())
                .with_metadata("reason", error.to_string()),
        );
        warn!(
            event_name = "decommission.request.command_refused",
            correlation_id = %ctx.correlation_id,
            request_id = request_id.map(|id| id.0.as_str()).unwrap_or("none"),
            actor = %ctx.actor.id,
            action = action.as_str(),
            error_class = error.error_class(),
            error = %error,
            "decommission command refused"
        );
    }
}

fn event_name(action: WorkflowAction) -> &'static str {
    match action {
        WorkflowAction::Create => "decommission.request.created",
        WorkflowAction::Approve => "decommission.request.approved",
        WorkflowAction::Reject => "decommission.request.rejected",
        WorkflowAction::BeginExecution => "decommission.request.execution_started",
        WorkflowAction::CompleteExecution => "decommission.request.executed",
    }
}

fn check_document_size(
    field: &str,
    index: usize,
    size_bytes: u64,
    limit: u64,
) -> Result<(), WorkflowError> {
    if size_bytes == 0 {
        return Err(WorkflowError::validation(
            format!("{field}[{index}].content"),
            "document is empty",
        ));
    }
    if size_bytes > limit {
        return Err(WorkflowError::validation(
            format!("{field}[{index}].content"),
            format!("document exceeds the {limit} byte limit"),
        ));
    }
    Ok(())
}

fn persistence_error(error: PortError) -> WorkflowError {
    WorkflowError::Persistence(error.to_string())
}
