// ABOUTME: Integration tests for the account-sync webhook endpoint
// ABOUTME: Signed deliveries create, update, and delete accounts; unsigned ones are rejected

mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use chrono::Utc;
use common::{test_app, MockCompletionService, TestApp, OWNER};
use pretty_assertions::assert_eq;
use prdsmith_api::webhook;
use serde_json::{json, Value};

const SECRET: &str = "whsec_dGVzdC1zZWNyZXQta2V5";
const URI: &str = "/api/webhooks/accounts";

fn now() -> String {
    Utc::now().timestamp().to_string()
}

async fn deliver_at(app: &TestApp, payload: &Value, timestamp: &str) -> (StatusCode, Value) {
    let body = payload.to_string();
    let signature = webhook::sign(SECRET, "msg_1", timestamp, body.as_bytes()).unwrap();
    let request = Request::builder()
        .method(Method::POST)
        .uri(URI)
        .header("content-type", "application/json")
        .header(webhook::ID_HEADER, "msg_1")
        .header(webhook::TIMESTAMP_HEADER, timestamp)
        .header(webhook::SIGNATURE_HEADER, signature)
        .body(Body::from(body))
        .unwrap();
    app.dispatch(request).await
}

async fn deliver(app: &TestApp, payload: &Value) -> (StatusCode, Value) {
    deliver_at(app, payload, &now()).await
}

fn user_event(kind: &str, id: &str) -> Value {
    json!({
        "type": kind,
        "data": {
            "id": id,
            "email_addresses": [{ "email_address": "grace@example.com" }],
            "first_name": "Grace",
            "last_name": "Hopper"
        }
    })
}

#[tokio::test]
async fn test_created_event_upserts_account() {
    let app = test_app(MockCompletionService::new(), Some(SECRET)).await;

    let (status, body) = deliver(&app, &user_event("user.created", "user_new")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "User created or updated");
    let account = app.db.accounts.resolve("user_new").await.unwrap();
    assert_eq!(account.email, "grace@example.com");
    assert_eq!(account.name.as_deref(), Some("Grace Hopper"));
}

#[tokio::test]
async fn test_updated_event_refreshes_existing_account() {
    let app = test_app(MockCompletionService::new(), Some(SECRET)).await;
    let before = app.db.accounts.resolve(OWNER).await.unwrap();

    let (status, _) = deliver(&app, &user_event("user.updated", OWNER)).await;

    assert_eq!(status, StatusCode::OK);
    let after = app.db.accounts.resolve(OWNER).await.unwrap();
    assert_eq!(after.id, before.id);
    assert_eq!(after.email, "grace@example.com");
}

#[tokio::test]
async fn test_deleted_event_removes_account_and_documents() {
    let app = test_app(MockCompletionService::new(), Some(SECRET)).await;
    let prd_id = app.create_prd().await;
    let account = app.db.accounts.resolve(OWNER).await.unwrap();

    let (status, body) = deliver(&app, &json!({ "type": "user.deleted", "data": { "id": OWNER } })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "User deleted");
    assert!(app.db.accounts.resolve(OWNER).await.unwrap_err().is_not_found());
    assert!(app
        .db
        .documents
        .get(&account.id, &prd_id)
        .await
        .unwrap_err()
        .is_not_found());

    let (status, _) = deliver(&app, &json!({ "type": "user.deleted", "data": { "id": OWNER } })).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_other_events_are_acknowledged() {
    let app = test_app(MockCompletionService::new(), Some(SECRET)).await;

    let (status, body) = deliver(&app, &json!({ "type": "session.created", "data": { "id": "sess_1" } })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "Webhook received");
}

#[tokio::test]
async fn test_bad_signature_is_rejected() {
    let app = test_app(MockCompletionService::new(), Some(SECRET)).await;
    let request = Request::builder()
        .method(Method::POST)
        .uri(URI)
        .header(webhook::ID_HEADER, "msg_1")
        .header(webhook::TIMESTAMP_HEADER, now())
        .header(webhook::SIGNATURE_HEADER, "v1,bm90LWEtc2lnbmF0dXJl")
        .body(Body::from(user_event("user.created", "user_evil").to_string()))
        .unwrap();

    let (status, _) = app.dispatch(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.db.accounts.resolve("user_evil").await.is_err());
}

#[tokio::test]
async fn test_replayed_stale_delivery_is_rejected() {
    let app = test_app(MockCompletionService::new(), Some(SECRET)).await;
    let prd_id = app.create_prd().await;
    let stale = (Utc::now().timestamp() - webhook::TIMESTAMP_TOLERANCE_SECS - 60).to_string();

    let (status, body) =
        deliver_at(&app, &json!({ "type": "user.deleted", "data": { "id": OWNER } }), &stale).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"]["message"],
        "Webhook timestamp is invalid or outside the allowed window"
    );
    let account = app.db.accounts.resolve(OWNER).await.unwrap();
    assert!(app.db.documents.get(&account.id, &prd_id).await.is_ok());
}

#[tokio::test]
async fn test_non_numeric_timestamp_is_rejected() {
    let app = test_app(MockCompletionService::new(), Some(SECRET)).await;

    let (status, _) = deliver_at(&app, &user_event("user.created", "user_new"), "not-a-number").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.db.accounts.resolve("user_new").await.is_err());
}

#[tokio::test]
async fn test_missing_signature_headers_are_rejected() {
    let app = test_app(MockCompletionService::new(), Some(SECRET)).await;

    let (status, body) = app
        .send(Method::POST, URI, None, Some(user_event("user.created", "user_x")))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Missing webhook signature headers");
}

#[tokio::test]
async fn test_endpoint_disabled_without_secret() {
    let app = test_app(MockCompletionService::new(), None).await;

    let (status, _) = deliver(&app, &user_event("user.created", "user_new")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
