// ABOUTME: Account-sync webhook endpoint fed by the identity provider
// ABOUTME: Verifies the delivery signature, then upserts or deletes the local account

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use prdsmith_storage::StorageError;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::AppError;
use crate::response::{ok, ApiResult};
use crate::state::AppState;
use crate::webhook::{self, AccountEvent, SignedDelivery};

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub message: &'static str,
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

pub async fn account_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<WebhookResponse> {
    let Some(secret) = state.webhook_secret.as_deref() else {
        return Err(AppError::NotFound("Webhook".to_string()));
    };

    let delivery = SignedDelivery {
        id: header(&headers, webhook::ID_HEADER),
        timestamp: header(&headers, webhook::TIMESTAMP_HEADER),
        signatures: header(&headers, webhook::SIGNATURE_HEADER),
    };
    if let Err(err) = webhook::verify(secret, &delivery, &body) {
        warn!(delivery_id = %delivery.id, "Rejected webhook delivery: {}", err);
        return Err(AppError::Validation(err.to_string()));
    }

    let event: AccountEvent = serde_json::from_slice(&body)
        .map_err(|err| AppError::Validation(format!("Invalid webhook payload: {}", err)))?;
    info!(delivery_id = %delivery.id, event = %event.kind, "Received account webhook");

    match event.kind.as_str() {
        "user.created" | "user.updated" => {
            let account = state.db.accounts.upsert(&event.data.to_upsert()).await?;
            info!(account_id = %account.id, "Account synced");
            ok(WebhookResponse {
                message: "User created or updated",
            })
        }
        "user.deleted" => {
            match state.db.accounts.delete_by_external_id(&event.data.id).await {
                Ok(()) => {}
                Err(StorageError::NotFound(_)) => {
                    info!(external_id = %event.data.id, "Account already absent");
                }
                Err(err) => return Err(err.into()),
            }
            ok(WebhookResponse {
                message: "User deleted",
            })
        }
        _ => ok(WebhookResponse {
            message: "Webhook received",
        }),
    }
}
