// ABOUTME: Document (PRD) storage layer using SQLite
// ABOUTME: Owner-scoped CRUD plus recording of generated introductions

use chrono::Utc;
use serde_json::Value;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{Result, StorageError};
use crate::types::{CreateDocumentInput, Document, UpdateDocumentInput};

pub struct DocumentStorage {
    pool: SqlitePool,
}

impl DocumentStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All documents of an account, most recently updated first
    pub async fn list_for_account(&self, account_id: &str) -> Result<Vec<Document>> {
        let documents = sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE account_id = ? ORDER BY updated_at DESC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(documents)
    }

    pub async fn create(&self, account_id: &str, input: &CreateDocumentInput) -> Result<Document> {
        if input.app_name.trim().is_empty() {
            return Err(StorageError::InvalidInput("appName is required".to_string()));
        }
        if input.app_description.trim().is_empty() {
            return Err(StorageError::InvalidInput(
                "appDescription is required".to_string(),
            ));
        }

        let id = prdsmith_core::generate_id();
        let now = Utc::now();
        debug!("Creating document {} for account {}", id, account_id);

        let document = sqlx::query_as::<_, Document>(
            r#"
            INSERT INTO documents (
                id, account_id, app_name, app_description, prog_language, framework,
                styling, backend, auth, payments, other_packages, processed,
                llm_response, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, NULL, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(account_id)
        .bind(&input.app_name)
        .bind(&input.app_description)
        .bind(&input.prog_language)
        .bind(&input.framework)
        .bind(&input.styling)
        .bind(&input.backend)
        .bind(&input.auth)
        .bind(&input.payments)
        .bind(&input.other_packages)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(document)
    }

    /// Fetch a document, treating documents owned by someone else as missing
    pub async fn get(&self, account_id: &str, document_id: &str) -> Result<Document> {
        sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE id = ? AND account_id = ?")
            .bind(document_id)
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::not_found("PRD"))
    }

    /// Apply a partial update. A supplied `llm_response` is a manual edit and
    /// marks the document processed without any generation call.
    pub async fn update(
        &self,
        account_id: &str,
        document_id: &str,
        input: &UpdateDocumentInput,
    ) -> Result<Document> {
        // Column names are literals; values go through push_bind
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE documents SET updated_at = ");
        builder.push_bind(Utc::now());

        let text_fields = [
            ("app_name", &input.app_name),
            ("app_description", &input.app_description),
            ("prog_language", &input.prog_language),
            ("framework", &input.framework),
            ("styling", &input.styling),
            ("backend", &input.backend),
            ("auth", &input.auth),
            ("payments", &input.payments),
            ("other_packages", &input.other_packages),
        ];
        for (column, value) in text_fields {
            if let Some(value) = value {
                builder.push(format!(", {} = ", column));
                builder.push_bind(value.clone());
            }
        }

        if let Some(response) = &input.llm_response {
            builder.push(", llm_response = ");
            builder.push_bind(serde_json::to_string(response)?);
            builder.push(", processed = 1");
        }

        builder.push(" WHERE id = ");
        builder.push_bind(document_id);
        builder.push(" AND account_id = ");
        builder.push_bind(account_id);
        builder.push(" RETURNING *");

        builder
            .build_query_as::<Document>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::not_found("PRD"))
    }

    pub async fn delete(&self, account_id: &str, document_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ? AND account_id = ?")
            .bind(document_id)
            .bind(account_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("PRD"));
        }

        Ok(())
    }

    /// Store a generated response and set `processed` in one statement.
    /// Ownership is re-checked as part of the write.
    pub async fn record_generation(
        &self,
        account_id: &str,
        document_id: &str,
        response: &Value,
    ) -> Result<Document> {
        sqlx::query_as::<_, Document>(
            r#"
            UPDATE documents
            SET llm_response = ?, processed = 1, updated_at = ?
            WHERE id = ? AND account_id = ?
            RETURNING *
            "#,
        )
        .bind(serde_json::to_string(response)?)
        .bind(Utc::now())
        .bind(document_id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StorageError::not_found("PRD"))
    }
}
