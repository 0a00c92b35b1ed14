//! JSON API over the decommission workflow.
//!
//! Endpoints:
//! - `POST /api/v1/decommissions` create a request; answers `{id, request_code, request}`
//! - `GET  /api/v1/decommissions` filtered, paged listing
//! - `GET  /api/v1/decommissions/{id}` one request with its summary
//! - `POST /api/v1/decommissions/{id}/approve`
//! - `POST /api/v1/decommissions/{id}/reject`
//! - `POST /api/v1/decommissions/{id}/execution/start`
//! - `POST /api/v1/decommissions/{id}/execution/complete`
//! - `POST /api/v1/documents` store a raw document body named by `x-filename`
//!
//! Callers identify themselves with `x-actor-id`, `x-actor-name` and `x-actor-role`.
//! `x-correlation-id` is echoed in error bodies; one is generated when absent.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use baja_core::domain::actor::{Actor, ActorRole};
use baja_core::domain::document::{BlobRef, MimeCategory};
use baja_core::domain::request::{DecommissionRequest, RequestId, RequestState, RequestSummary};
use baja_core::flows::WorkflowAction;
use baja_core::listing::{ListQuery, OrderDirection, OrderField};
use baja_core::ports::{DocumentStore, PortError};
use baja_core::workflow::{
    BeginExecutionCommand, CommandContext, CompleteExecutionCommand, CreateRequestCommand,
    CreatedRequest, EvaluationCommand,
};
use baja_core::{DecommissionService, InterfaceError, ListingService, WorkflowError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

const ACTOR_ID_HEADER: &str = "x-actor-id";
const ACTOR_NAME_HEADER: &str = "x-actor-name";
const ACTOR_ROLE_HEADER: &str = "x-actor-role";
const CORRELATION_HEADER: &str = "x-correlation-id";
const FILENAME_HEADER: &str = "x-filename";

#[derive(Clone)]
pub struct ApiState {
    pub service: DecommissionService,
    pub listing: ListingService,
    pub documents: Arc<dyn DocumentStore>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct RequestView {
    #[serde(flatten)]
    pub request: DecommissionRequest,
    pub summary: RequestSummary,
    pub permitted_actions: Vec<WorkflowAction>,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    #[serde(flatten)]
    pub created: CreatedRequest,
    pub request: RequestView,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub items: Vec<ListItem>,
    pub total: u64,
    pub total_pages: u64,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Serialize)]
pub struct ListItem {
    pub id: RequestId,
    pub request_code: String,
    pub state: RequestState,
    pub equipment_code: String,
    pub equipment_name: String,
    pub responsible_party: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct StoredDocumentResponse {
    pub blob_ref: BlobRef,
    pub filename: String,
    pub size_bytes: u64,
    pub mime_category: MimeCategory,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error_class: &'static str,
    pub message: String,
    pub user_message: &'static str,
    pub correlation_id: String,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub state: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub order_by: Option<String>,
    pub order_direction: Option<String>,
}

impl ListParams {
    fn into_query(self) -> Result<ListQuery, WorkflowError> {
        let state = match self.state.as_deref().map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) => Some(RequestState::parse(value).ok_or_else(|| {
                WorkflowError::validation("state", format!("unknown state `{value}`"))
            })?),
            None => None,
        };

        Ok(ListQuery {
            state,
            search: self.search,
            page: self.page,
            page_size: self.page_size,
            order_by: self.order_by.as_deref().map(OrderField::from_str).transpose()?,
            order_direction: self
                .order_direction
                .as_deref()
                .map(OrderDirection::from_str)
                .transpose()?,
        })
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/decommissions", post(create_request).get(list_requests))
        .route("/api/v1/decommissions/{id}", get(get_request))
        .route("/api/v1/decommissions/{id}/approve", post(approve_request))
        .route("/api/v1/decommissions/{id}/reject", post(reject_request))
        .route("/api/v1/decommissions/{id}/execution/start", post(begin_execution))
        .route("/api/v1/decommissions/{id}/execution/complete", post(complete_execution))
        .route("/api/v1/documents", post(upload_document))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn create_request(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<CreateRequestCommand>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let ctx = command_context(&headers)?;
    let request = state
        .service
        .create_request(&ctx, body)
        .await
        .map_err(|error| workflow_error(error, &ctx.correlation_id))?;

    let created = CreatedRequest::from(&request);
    let request = view(&state.service, request);
    Ok((StatusCode::CREATED, Json(CreatedResponse { created, request })))
}

pub async fn list_requests(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let query = params.into_query().map_err(|error| workflow_error(error, &correlation_id))?;
    let result =
        state.listing.list(query).await.map_err(|error| workflow_error(error, &correlation_id))?;

    Ok(Json(ListResponse {
        items: result.items.iter().map(list_item).collect(),
        total: result.total,
        total_pages: result.total_pages,
        page: result.page,
        page_size: result.page_size,
    }))
}

pub async fn get_request(
    Path(id): Path<String>,
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<RequestView>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let request = state
        .service
        .get_request(&RequestId(id))
        .await
        .map_err(|error| workflow_error(error, &correlation_id))?;

    Ok(Json(view(&state.service, request)))
}

pub async fn approve_request(
    Path(id): Path<String>,
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<EvaluationCommand>,
) -> Result<Json<RequestView>, ApiError> {
    let ctx = command_context(&headers)?;
    let request = state
        .service
        .approve_request(&ctx, &RequestId(id), body)
        .await
        .map_err(|error| workflow_error(error, &ctx.correlation_id))?;

    Ok(Json(view(&state.service, request)))
}

pub async fn reject_request(
    Path(id): Path<String>,
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<EvaluationCommand>,
) -> Result<Json<RequestView>, ApiError> {
    let ctx = command_context(&headers)?;
    let request = state
        .service
        .reject_request(&ctx, &RequestId(id), body)
        .await
        .map_err(|error| workflow_error(error, &ctx.correlation_id))?;

    Ok(Json(view(&state.service, request)))
}

pub async fn begin_execution(
    Path(id): Path<String>,
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<BeginExecutionCommand>,
) -> Result<Json<RequestView>, ApiError> {
    let ctx = command_context(&headers)?;
    let request = state
        .service
        .begin_execution(&ctx, &RequestId(id), body)
        .await
        .map_err(|error| workflow_error(error, &ctx.correlation_id))?;

    Ok(Json(view(&state.service, request)))
}

pub async fn complete_execution(
    Path(id): Path<String>,
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<CompleteExecutionCommand>,
) -> Result<Json<RequestView>, ApiError> {
    let ctx = command_context(&headers)?;
    let request = state
        .service
        .execute_request(&ctx, &RequestId(id), body)
        .await
        .map_err(|error| workflow_error(error, &ctx.correlation_id))?;

    Ok(Json(view(&state.service, request)))
}

/// Stores a document ahead of the command that attaches it. The returned
/// `blob_ref` is passed back as a `stored` document source.
pub async fn upload_document(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<StoredDocumentResponse>), ApiError> {
    let ctx = command_context(&headers)?;
    let filename = header_value(&headers, FILENAME_HEADER).unwrap_or_default();
    if filename.is_empty() {
        return Err(workflow_error(
            WorkflowError::validation(FILENAME_HEADER, "a filename is required"),
            &ctx.correlation_id,
        ));
    }

    let limit = state.service.settings().max_document_bytes;
    let size_bytes = body.len() as u64;
    if size_bytes == 0 || size_bytes > limit {
        return Err(workflow_error(
            WorkflowError::validation(
                "document",
                format!("`{filename}` must be between 1 and {limit} bytes, got {size_bytes}"),
            ),
            &ctx.correlation_id,
        ));
    }

    let blob_ref = state
        .documents
        .upload(&filename, body.to_vec())
        .await
        .map_err(|error| workflow_error(storage_error(error), &ctx.correlation_id))?;

    info!(
        event_name = "api.document.stored",
        correlation_id = %ctx.correlation_id,
        actor = %ctx.actor.id,
        blob_ref = %blob_ref.0,
        size_bytes,
        "document stored for a later command"
    );

    Ok((
        StatusCode::CREATED,
        Json(StoredDocumentResponse {
            blob_ref,
            mime_category: MimeCategory::from_filename(&filename),
            filename,
            size_bytes,
        }),
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn view(service: &DecommissionService, request: DecommissionRequest) -> RequestView {
    RequestView {
        summary: request.summary(),
        permitted_actions: service.permitted_actions(&request),
        request,
    }
}

fn list_item(request: &DecommissionRequest) -> ListItem {
    ListItem {
        id: request.id.clone(),
        request_code: request.request_code.0.clone(),
        state: request.state(),
        equipment_code: request.equipment.code.0.clone(),
        equipment_name: request.equipment.name.clone(),
        responsible_party: request.responsible_party.clone(),
        created_at: request.created_at.to_rfc3339(),
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn correlation_id(headers: &HeaderMap) -> String {
    header_value(headers, CORRELATION_HEADER).unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn command_context(headers: &HeaderMap) -> Result<CommandContext, ApiError> {
    let correlation_id = correlation_id(headers);
    let Some(actor_id) = header_value(headers, ACTOR_ID_HEADER) else {
        return Err(actor_error(
            StatusCode::UNAUTHORIZED,
            format!("header `{ACTOR_ID_HEADER}` is required"),
            correlation_id,
        ));
    };
    let Some(raw_role) = header_value(headers, ACTOR_ROLE_HEADER) else {
        return Err(actor_error(
            StatusCode::UNAUTHORIZED,
            format!("header `{ACTOR_ROLE_HEADER}` is required"),
            correlation_id,
        ));
    };
    let Some(role) = ActorRole::parse(&raw_role) else {
        return Err(actor_error(
            StatusCode::BAD_REQUEST,
            format!("unknown actor role `{raw_role}`"),
            correlation_id,
        ));
    };

    let display_name = header_value(headers, ACTOR_NAME_HEADER).unwrap_or_default();
    Ok(CommandContext::new(Actor::new(actor_id, display_name, role), correlation_id))
}

fn actor_error(status: StatusCode, message: String, correlation_id: String) -> ApiError {
    warn!(
        event_name = "api.actor.rejected",
        correlation_id = %correlation_id,
        reason = %message,
        "request carried no usable actor identity"
    );
    (
        status,
        Json(ErrorBody {
            error_class: "invalid_actor",
            message,
            user_message: "Identify yourself with a known actor id and role.",
            correlation_id,
        }),
    )
}

fn storage_error(error: PortError) -> WorkflowError {
    match error {
        PortError::Unavailable(message) => WorkflowError::StorageUnavailable(message),
        other => WorkflowError::Persistence(other.to_string()),
    }
}

fn workflow_error(error: WorkflowError, correlation_id: &str) -> ApiError {
    let error_class = error.error_class();
    let interface = error.into_interface(correlation_id);
    let status = match &interface {
        InterfaceError::BadRequest { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
        InterfaceError::PreconditionRequired { .. } => StatusCode::PRECONDITION_REQUIRED,
        InterfaceError::Forbidden { .. } => StatusCode::FORBIDDEN,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    warn!(
        event_name = "api.command.failed",
        correlation_id = %correlation_id,
        error_class,
        status = status.as_u16(),
        error = %interface,
        "workflow command failed"
    );

    (
        status,
        Json(ErrorBody {
            error_class,
            message: interface.to_string(),
            user_message: interface.user_message(),
            correlation_id: interface.correlation_id().to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Bytes,
        extract::{Path, Query, State},
        http::{HeaderMap, HeaderValue, StatusCode},
        Json,
    };
    use baja_core::domain::document::{BlobRef, DocumentSource};
    use baja_core::domain::equipment::EquipmentSnapshot;
    use baja_core::domain::request::{DeclineType, RequestState};
    use baja_core::flows::WorkflowAction;
    use baja_core::workflow::{
        BeginExecutionCommand, CompleteExecutionCommand, CreateRequestCommand, EvaluationCommand,
        WorkflowSettings,
    };
    use baja_core::{DecommissionService, ListingService};
    use baja_db::{InMemoryDocumentStore, InMemoryEquipmentCatalog, InMemoryRequestRepository};
    use rust_decimal::Decimal;

    use super::*;

    fn state_with(documents: Arc<InMemoryDocumentStore>, max_document_bytes: u64) -> ApiState {
        let repository = Arc::new(InMemoryRequestRepository::default());
        let catalog = Arc::new(InMemoryEquipmentCatalog::with_equipment([
            EquipmentSnapshot::new("EQ-001", "Autoclave 23L").with_brand("Tuttnauer"),
        ]));
        let service = DecommissionService::new(repository.clone(), documents.clone(), catalog)
            .with_settings(WorkflowSettings { max_document_bytes, ..WorkflowSettings::default() });

        ApiState { service, listing: ListingService::new(repository), documents }
    }

    fn state() -> ApiState {
        state_with(Arc::new(InMemoryDocumentStore::default()), 1024)
    }

    fn headers(role: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_ID_HEADER, HeaderValue::from_static("u-42"));
        headers.insert(ACTOR_NAME_HEADER, HeaderValue::from_static("Ana Perez"));
        headers.insert(ACTOR_ROLE_HEADER, HeaderValue::from_str(role).expect("role header"));
        headers.insert(CORRELATION_HEADER, HeaderValue::from_static("corr-1"));
        headers
    }

    fn create_body() -> CreateRequestCommand {
        let mut body = CreateRequestCommand::new(
            "EQ-001",
            DeclineType::IrreparableDamage,
            "pressure chamber cracked",
            "Dr. Rojas",
        );
        body.estimated_recoverable_value = Some(Decimal::new(800, 0));
        body
    }

    async fn created(state: &ApiState) -> String {
        let (status, Json(body)) =
            create_request(State(state.clone()), headers("requester"), Json(create_body()))
                .await
                .expect("create should succeed");
        assert_eq!(status, StatusCode::CREATED);
        body.created.id.0
    }

    #[tokio::test]
    async fn create_returns_pending_request_with_permitted_actions() {
        let state = state();

        let (status, Json(body)) =
            create_request(State(state), headers("requester"), Json(create_body()))
                .await
                .expect("create should succeed");

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.created.id, body.request.request.id);
        assert!(body.created.request_code.0.starts_with("BAJA-"), "{:?}", body.created);
        let view = body.request;
        assert_eq!(view.request.state(), RequestState::Pending);
        assert_eq!(view.request.requester, "Ana Perez");
        assert_eq!(view.summary.requested_recoverable_value, Some(Decimal::new(800, 0)));
        assert_eq!(view.permitted_actions, vec![WorkflowAction::Approve, WorkflowAction::Reject]);
    }

    #[tokio::test]
    async fn create_without_actor_headers_is_unauthorized() {
        let result = create_request(State(state()), HeaderMap::new(), Json(create_body())).await;

        let (status, Json(body)) = result.expect_err("actor is required");
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.error_class, "invalid_actor");
    }

    #[tokio::test]
    async fn unknown_equipment_is_unprocessable() {
        let mut body = create_body();
        body.equipment_code = "EQ-404".to_string();

        let (status, Json(error)) = create_request(State(state()), headers("requester"), Json(body))
            .await
            .expect_err("unknown equipment");

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(error.error_class, "validation_error");
        assert_eq!(error.correlation_id, "corr-1");
    }

    #[tokio::test]
    async fn requester_cannot_approve() {
        let state = state();
        let id = created(&state).await;

        let (status, Json(error)) = approve_request(
            Path(id),
            State(state),
            headers("requester"),
            Json(EvaluationCommand::new("looks fine")),
        )
        .await
        .expect_err("forbidden");

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(error.error_class, "forbidden");
    }

    #[tokio::test]
    async fn second_evaluation_conflicts() {
        let state = state();
        let id = created(&state).await;

        reject_request(
            Path(id.clone()),
            State(state.clone()),
            headers("reviewer"),
            Json(EvaluationCommand::new("repairable")),
        )
        .await
        .expect("reject");

        let (status, Json(error)) = approve_request(
            Path(id),
            State(state),
            headers("reviewer"),
            Json(EvaluationCommand::new("changed my mind")),
        )
        .await
        .expect_err("already rejected");

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(error.error_class, "invalid_state_transition");
    }

    #[tokio::test]
    async fn unconfirmed_completion_requires_precondition() {
        let state = state();
        let id = created(&state).await;
        approve_request(
            Path(id.clone()),
            State(state.clone()),
            headers("technical_reviewer"),
            Json(EvaluationCommand::new("beyond repair")),
        )
        .await
        .expect("approve");

        let (status, Json(error)) = complete_execution(
            Path(id.clone()),
            State(state.clone()),
            headers("technician"),
            Json(CompleteExecutionCommand {
                executor: "Luis".to_string(),
                executed_at: None,
                execution_notes: "removed".to_string(),
                final_recoverable_parts: Vec::new(),
                final_documents: Vec::new(),
                confirmed: false,
            }),
        )
        .await
        .expect_err("confirmation missing");

        assert_eq!(status, StatusCode::PRECONDITION_REQUIRED);
        assert_eq!(error.error_class, "confirmation_required");

        let Json(view) = get_request(Path(id), State(state), HeaderMap::new()).await.expect("get");
        assert_eq!(view.request.state(), RequestState::Approved);
    }

    #[tokio::test]
    async fn uploaded_document_can_be_attached_on_completion() {
        let documents = Arc::new(InMemoryDocumentStore::default());
        let state = state_with(documents.clone(), 1024);
        let id = created(&state).await;
        approve_request(
            Path(id.clone()),
            State(state.clone()),
            headers("reviewer"),
            Json(EvaluationCommand::new("beyond repair")),
        )
        .await
        .expect("approve");
        begin_execution(
            Path(id.clone()),
            State(state.clone()),
            headers("technician"),
            Json(BeginExecutionCommand { executor: "Luis".to_string(), started_at: None }),
        )
        .await
        .expect("begin execution");

        let mut upload_headers = headers("technician");
        upload_headers.insert(FILENAME_HEADER, HeaderValue::from_static("acta_baja.pdf"));
        let (status, Json(stored)) = upload_document(
            State(state.clone()),
            upload_headers,
            Bytes::from_static(b"%PDF-1.7 acta"),
        )
        .await
        .expect("upload");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(stored.mime_category, MimeCategory::Pdf);

        let Json(view) = complete_execution(
            Path(id),
            State(state),
            headers("technician"),
            Json(CompleteExecutionCommand {
                executor: "Luis".to_string(),
                executed_at: None,
                execution_notes: "unit removed from room 2".to_string(),
                final_recoverable_parts: Vec::new(),
                final_documents: vec![DocumentSource::Stored {
                    filename: stored.filename.clone(),
                    blob_ref: stored.blob_ref.clone(),
                }],
                confirmed: true,
            }),
        )
        .await
        .expect("complete");

        assert_eq!(view.request.state(), RequestState::Executed);
        assert_eq!(view.summary.final_documents, 1);
        assert!(view.permitted_actions.is_empty());
        assert_eq!(documents.blob_count().await, 1);
    }

    #[tokio::test]
    async fn oversized_or_unnamed_uploads_are_refused() {
        let documents = Arc::new(InMemoryDocumentStore::default());
        let state = state_with(documents.clone(), 4);

        let (status, _) = upload_document(
            State(state.clone()),
            headers("requester"),
            Bytes::from_static(b"abc"),
        )
        .await
        .expect_err("filename missing");
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let mut named = headers("requester");
        named.insert(FILENAME_HEADER, HeaderValue::from_static("foto.jpg"));
        let (status, _) =
            upload_document(State(state), named, Bytes::from_static(b"too large"))
                .await
                .expect_err("too large");
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(documents.blob_count().await, 0);
    }

    #[tokio::test]
    async fn offline_store_reports_service_unavailable() {
        let documents = Arc::new(InMemoryDocumentStore::default());
        documents.set_unavailable(true);
        let state = state_with(documents, 1024);
        let mut named = headers("requester");
        named.insert(FILENAME_HEADER, HeaderValue::from_static("foto.jpg"));

        let (status, Json(error)) =
            upload_document(State(state), named, Bytes::from_static(b"jpeg"))
                .await
                .expect_err("offline");

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(error.error_class, "storage_unavailable");
    }

    #[tokio::test]
    async fn missing_request_is_not_found() {
        let (status, _) =
            get_request(Path("nope".to_string()), State(state()), HeaderMap::new())
                .await
                .expect_err("missing");

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listing_filters_by_state_and_rejects_unknown_values() {
        let state = state();
        let first = created(&state).await;
        created(&state).await;
        approve_request(
            Path(first.clone()),
            State(state.clone()),
            headers("reviewer"),
            Json(EvaluationCommand::new("ok")),
        )
        .await
        .expect("approve");

        let Json(listing) = list_requests(
            State(state.clone()),
            HeaderMap::new(),
            Query(ListParams { state: Some("approved".to_string()), ..ListParams::default() }),
        )
        .await
        .expect("list");
        assert_eq!(listing.total, 1);
        assert_eq!(listing.items[0].id.0, first);
        assert_eq!(listing.items[0].equipment_code, "EQ-001");

        let (status, _) = list_requests(
            State(state),
            HeaderMap::new(),
            Query(ListParams { order_by: Some("password".to_string()), ..ListParams::default() }),
        )
        .await
        .expect_err("unknown order field");
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn stored_document_response_serializes_blob_reference() {
        let response = StoredDocumentResponse {
            blob_ref: BlobRef("mem://1".to_string()),
            filename: "acta.pdf".to_string(),
            size_bytes: 3,
            mime_category: MimeCategory::Pdf,
        };

        let json = serde_json::to_value(&response).expect("serialize");
        assert_eq!(json["blob_ref"], "mem://1");
        assert_eq!(json["size_bytes"], 3);
    }
}
