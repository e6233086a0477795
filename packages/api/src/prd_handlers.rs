// ABOUTME: HTTP request handlers for Project Requirement Document CRUD
// ABOUTME: Every query is scoped to the calling account; foreign documents read as missing

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use prdsmith_ideate::SubmitOutcome;
use prdsmith_storage::{CreateDocumentInput, Document, DocumentDetail, UpdateDocumentInput};
use tracing::info;

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::response::{ok, ApiResult};
use crate::state::AppState;

/// List the caller's documents, most recently updated first
pub async fn list_prds(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Vec<Document>> {
    let documents = state.db.documents.list_for_account(user.id()).await?;
    ok(documents)
}

pub async fn create_prd(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Result<Json<CreateDocumentInput>, JsonRejection>,
) -> ApiResult<Document> {
    let Json(input) = body?;
    let document = state.db.documents.create(user.id(), &input).await?;
    info!(document_id = %document.id, "Created PRD");
    ok(document)
}

/// Save a new document and run the intro and implementation stages on it.
///
/// Generation failures after a successful save are reported in the body
/// with a 200 status; only a failed save is an error response.
pub async fn submit_prd(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Result<Json<CreateDocumentInput>, JsonRejection>,
) -> ApiResult<SubmitOutcome> {
    let Json(input) = body?;
    let outcome = state.orchestrator.submit_document(user.id(), &input).await?;
    ok(outcome)
}

pub async fn get_prd(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(prd_id): Path<String>,
) -> ApiResult<DocumentDetail> {
    let detail = state.db.document_detail(user.id(), &prd_id).await?;
    ok(detail)
}

pub async fn update_prd(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(prd_id): Path<String>,
    body: Result<Json<UpdateDocumentInput>, JsonRejection>,
) -> ApiResult<Document> {
    let Json(input) = body?;
    if input.is_empty() {
        return Err(AppError::Validation("No fields to update".to_string()));
    }

    let document = state.db.documents.update(user.id(), &prd_id, &input).await?;
    ok(document)
}

pub async fn delete_prd(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(prd_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.db.documents.delete(user.id(), &prd_id).await?;
    info!(document_id = %prd_id, "Deleted PRD");
    Ok(StatusCode::NO_CONTENT)
}
