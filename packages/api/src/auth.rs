// ABOUTME: Authentication context for API requests
// ABOUTME: Resolves the identity header set by the upstream identity provider to a local account

use axum::{extract::FromRequestParts, http::request::Parts};
use prdsmith_storage::Account;
use tracing::debug;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the external identity of the caller
pub const USER_ID_HEADER: &str = "x-user-id";

/// Current authenticated user
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub account: Account,
}

impl CurrentUser {
    /// Local account id used to scope every query
    pub fn id(&self) -> &str {
        &self.account.id
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let external_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(AppError::Unauthorized)?;

        let account = state.db.accounts.resolve(external_id).await?;
        debug!(account_id = %account.id, "Resolved caller");
        Ok(Self { account })
    }
}
