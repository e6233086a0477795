// ABOUTME: Shared harness for API integration tests
// ABOUTME: Builds the router over an in-memory database and a mocked completion service

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use mockall::mock;
use prdsmith_ai::{AIServiceResult, Completion, CompletionRequest, CompletionService, RetryPolicy};
use prdsmith_api::{create_router, AppState, USER_ID_HEADER};
use prdsmith_ideate::{GenerationConfig, GenerationOrchestrator};
use prdsmith_prompts::PromptManager;
use prdsmith_storage::{AccountUpsert, Database};
use serde_json::Value;
use tower::ServiceExt;

pub const OWNER: &str = "user_owner";
pub const OTHER: &str = "user_other";

mock! {
    pub CompletionService {}

    #[async_trait::async_trait]
    impl CompletionService for CompletionService {
        async fn complete(&self, request: &CompletionRequest) -> AIServiceResult<Completion>;
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: Database,
}

pub async fn test_app(mock: MockCompletionService, webhook_secret: Option<&str>) -> TestApp {
    let db = Database::in_memory().await.unwrap();
    for external_id in [OWNER, OTHER] {
        db.accounts
            .upsert(&AccountUpsert {
                external_id: external_id.to_string(),
                email: format!("{}@example.com", external_id),
                name: None,
            })
            .await
            .unwrap();
    }

    let config = GenerationConfig {
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            jitter_factor: 0.0,
        },
        ..GenerationConfig::default()
    };
    let orchestrator = Arc::new(GenerationOrchestrator::new(
        db.clone(),
        Arc::new(mock),
        Arc::new(PromptManager::new(None).unwrap()),
        config,
    ));
    let state = AppState::new(orchestrator).with_webhook_secret(webhook_secret.map(str::to_string));

    TestApp {
        router: create_router(state),
        db,
    }
}

impl TestApp {
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(USER_ID_HEADER, user);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.dispatch(request).await
    }

    pub async fn dispatch(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Create a document as OWNER and return its id
    pub async fn create_prd(&self) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/prds",
                Some(OWNER),
                Some(serde_json::json!({
                    "appName": "Acme",
                    "appDescription": "Inventory tracking for small shops",
                    "framework": "Next"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["data"]["id"].as_str().unwrap().to_string()
    }
}
