// ABOUTME: Implementation plan storage layer using SQLite
// ABOUTME: At most one plan per document, replaced on each generation

use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;

use crate::error::{Result, StorageError};
use crate::types::ImplementationPlan;

pub struct ImplementationPlanStorage {
    pool: SqlitePool,
}

impl ImplementationPlanStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_for_document(&self, document_id: &str) -> Result<Option<ImplementationPlan>> {
        let plan = sqlx::query_as::<_, ImplementationPlan>(
            "SELECT * FROM implementation_plans WHERE document_id = ?",
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(plan)
    }

    /// Insert the document's plan or replace the existing one, provided
    /// `account_id` owns the document.
    pub async fn upsert_generation(
        &self,
        account_id: &str,
        document_id: &str,
        response: &Value,
    ) -> Result<ImplementationPlan> {
        let now = Utc::now();
        sqlx::query_as::<_, ImplementationPlan>(
            r#"
            INSERT INTO implementation_plans (
                id, document_id, processed, llm_response, created_at, updated_at, last_processed
            )
            SELECT ?, ?, 1, ?, ?, ?, ?
            WHERE EXISTS (SELECT 1 FROM documents WHERE id = ? AND account_id = ?)
            ON CONFLICT(document_id) DO UPDATE SET
                processed = 1,
                llm_response = excluded.llm_response,
                updated_at = excluded.updated_at,
                last_processed = excluded.last_processed
            RETURNING *
            "#,
        )
        .bind(prdsmith_core::generate_id())
        .bind(document_id)
        .bind(serde_json::to_string(response)?)
        .bind(now)
        .bind(now)
        .bind(now)
        .bind(document_id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StorageError::not_found("PRD"))
    }
}
