// ABOUTME: HTTP request handlers for the pages (sections) of a document
// ABOUTME: Batch save, reorder, delete, and batch requirement generation

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use prdsmith_ideate::BatchReport;
use prdsmith_storage::{Section, SectionInput};
use serde::Deserialize;
use tracing::info;

use crate::auth::CurrentUser;
use crate::response::{ok, ApiResult};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SavePagesRequest {
    #[serde(default)]
    pub pages: Vec<SectionInput>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderPagesRequest {
    #[serde(alias = "page_ids")]
    pub page_ids: Vec<String>,
}

/// Create pages without an id and update pages with one
pub async fn save_pages(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(prd_id): Path<String>,
    body: Result<Json<SavePagesRequest>, JsonRejection>,
) -> ApiResult<Vec<Section>> {
    let Json(request) = body?;
    let document = state.db.documents.get(user.id(), &prd_id).await?;

    let saved = state.db.sections.save_batch(&document.id, &request.pages).await?;
    info!(document_id = %document.id, pages = saved.len(), "Saved pages");
    ok(saved)
}

pub async fn reorder_pages(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(prd_id): Path<String>,
    body: Result<Json<ReorderPagesRequest>, JsonRejection>,
) -> ApiResult<Vec<Section>> {
    let Json(request) = body?;
    let document = state.db.documents.get(user.id(), &prd_id).await?;

    let sections = state.db.sections.reorder(&document.id, &request.page_ids).await?;
    ok(sections)
}

pub async fn delete_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((prd_id, page_id)): Path<(String, String)>,
) -> ApiResult<Section> {
    let document = state.db.documents.get(user.id(), &prd_id).await?;

    let deleted = state.db.sections.delete(&document.id, &page_id).await?;
    info!(document_id = %document.id, page_id = %page_id, "Deleted page");
    ok(deleted)
}

/// Generate requirements for every new or changed page.
///
/// Per-page failures are listed in the report; the response is still 200.
pub async fn generate_pages(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(prd_id): Path<String>,
) -> ApiResult<BatchReport> {
    let report = state
        .orchestrator
        .generate_sections_batch(user.id(), &prd_id)
        .await?;
    ok(report)
}
