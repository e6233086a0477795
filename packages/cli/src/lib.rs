// ABOUTME: Server assembly for Prdsmith
// ABOUTME: Wires configuration into storage, the completion client, and the HTTP router

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    http::{HeaderName, HeaderValue},
    Router,
};
use prdsmith_ai::AnthropicService;
use prdsmith_api::{create_router, request_context::request_context, AppState, REQUEST_ID_HEADER};
use prdsmith_ideate::{GenerationConfig, GenerationOrchestrator};
use prdsmith_prompts::PromptManager;
use prdsmith_storage::Database;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

pub mod config;
pub mod logging;
pub mod middleware;

use config::Config;

/// Open storage, load prompts, and build the orchestrator behind the API state
pub async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let db = Database::connect(&config.database_path)
        .await
        .with_context(|| format!("opening database at {}", config.database_path.display()))?;

    let prompts = PromptManager::new(config.prompts_dir.clone()).context("loading prompt templates")?;
    let completion = AnthropicService::new(config.anthropic_api_key.clone())
        .context("creating completion client")?
        .with_base_url(config.anthropic_base_url.clone());

    let generation = GenerationConfig {
        model: config.model.clone(),
        retry: config.retry.clone(),
        ..GenerationConfig::default()
    };
    let orchestrator = GenerationOrchestrator::new(db, Arc::new(completion), Arc::new(prompts), generation);

    Ok(AppState::new(Arc::new(orchestrator)).with_webhook_secret(config.webhook_secret.clone()))
}

/// Wrap the API router in the request-id, tracing, CORS, and panic layers
pub fn build_app(state: AppState, config: &Config) -> Router {
    with_middleware(create_router(state), config.cors_origin.clone())
}

/// Outermost first: assign the request id, open the trace span, echo the id,
/// apply CORS, scope the id for handlers, then recover panics inside that scope
pub fn with_middleware(router: Router, cors_origin: HeaderValue) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
            .layer(TraceLayer::new_for_http().make_span_with(middleware::make_request_span))
            .layer(PropagateRequestIdLayer::new(request_id))
            .layer(middleware::cors_layer(cors_origin))
            .layer(axum::middleware::from_fn(request_context))
            .layer(middleware::create_panic_handler()),
    )
}

pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let state = build_state(&config).await?;
    let app = build_app(state, &config);

    let addr = SocketAddr::new(config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    info!(%addr, cors_origin = ?config.cors_origin, "Prdsmith server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
