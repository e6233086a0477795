// ABOUTME: HTTP API layer for Prdsmith providing REST endpoints and routing
// ABOUTME: Integration layer over storage and the generation orchestrator

use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};

pub mod auth;
pub mod error;
pub mod generation_handlers;
pub mod health;
pub mod page_handlers;
pub mod prd_handlers;
pub mod request_context;
pub mod response;
pub mod state;
pub mod webhook;
pub mod webhook_handlers;

pub use auth::{CurrentUser, USER_ID_HEADER};
pub use error::AppError;
pub use request_context::REQUEST_ID_HEADER;
pub use response::{ApiResponse, ApiResult};
pub use state::AppState;

/// Creates the PRD API router (nested under /api/prds)
pub fn create_prds_router() -> Router<AppState> {
    Router::new()
        .route("/", get(prd_handlers::list_prds))
        .route("/", post(prd_handlers::create_prd))
        .route("/submit", post(prd_handlers::submit_prd))
        .route("/{prd_id}", get(prd_handlers::get_prd))
        .route("/{prd_id}", patch(prd_handlers::update_prd))
        .route("/{prd_id}", delete(prd_handlers::delete_prd))
        // Pages
        .route("/{prd_id}/pages", post(page_handlers::save_pages))
        .route("/{prd_id}/pages/order", put(page_handlers::reorder_pages))
        .route("/{prd_id}/pages/generate", post(page_handlers::generate_pages))
        .route("/{prd_id}/pages/{page_id}", delete(page_handlers::delete_page))
        // Implementation plan
        .route(
            "/{prd_id}/implementation",
            post(generation_handlers::generate_implementation),
        )
}

/// Creates the generation trigger router (nested under /api/generate)
pub fn create_generation_router() -> Router<AppState> {
    Router::new()
        .route("/intro", post(generation_handlers::generate_intro))
        .route(
            "/page-requirements",
            post(generation_handlers::generate_page_requirements),
        )
}

/// Creates the webhooks router (nested under /api/webhooks)
pub fn create_webhooks_router() -> Router<AppState> {
    Router::new().route("/accounts", post(webhook_handlers::account_webhook))
}

/// Full API with state applied and request ids scoped over every handler
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health::health_check))
        .nest("/api/prds", create_prds_router())
        .nest("/api/generate", create_generation_router())
        .nest("/api/webhooks", create_webhooks_router())
        .layer(middleware::from_fn(request_context::request_context))
        .with_state(state)
}
