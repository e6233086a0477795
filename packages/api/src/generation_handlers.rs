// ABOUTME: HTTP triggers for the generation stages
// ABOUTME: Intro, single page requirements, and implementation plan

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use prdsmith_ideate::{ImplementationOutcome, SectionRequirements};
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::response::{ok, ApiResult};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateIntroRequest {
    #[serde(default, alias = "prd_id")]
    pub prd_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePageRequest {
    #[serde(default, alias = "prd_id")]
    pub prd_id: Option<String>,
    #[serde(default, alias = "page_id")]
    pub page_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IntroResponse {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct PageRequirementsResponse {
    pub requirements: SectionRequirements,
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

pub async fn generate_intro(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Result<Json<GenerateIntroRequest>, JsonRejection>,
) -> ApiResult<IntroResponse> {
    let Json(request) = body?;
    let prd_id = required(request.prd_id)
        .ok_or_else(|| AppError::Validation("PRD ID is required".to_string()))?;

    let outcome = state.orchestrator.generate_intro(user.id(), &prd_id).await?;
    ok(IntroResponse {
        content: outcome.content,
    })
}

pub async fn generate_page_requirements(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Result<Json<GeneratePageRequest>, JsonRejection>,
) -> ApiResult<PageRequirementsResponse> {
    let Json(request) = body?;
    let (Some(prd_id), Some(page_id)) = (required(request.prd_id), required(request.page_id)) else {
        return Err(AppError::Validation(
            "PRD ID and Page ID are required".to_string(),
        ));
    };

    let requirements = state
        .orchestrator
        .generate_section_requirements(user.id(), &prd_id, &page_id)
        .await?;
    ok(PageRequirementsResponse { requirements })
}

pub async fn generate_implementation(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(prd_id): Path<String>,
) -> ApiResult<ImplementationOutcome> {
    let outcome = state
        .orchestrator
        .generate_implementation_plan(user.id(), &prd_id)
        .await?;
    ok(outcome)
}
