// ABOUTME: Section storage layer using SQLite
// ABOUTME: Ordered per-document sections with digest tracking for regeneration

use std::collections::HashSet;

use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{Result, StorageError};
use crate::types::{content_digest, Section, SectionInput};

pub struct SectionStorage {
    pool: SqlitePool,
}

impl SectionStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list_for_document(&self, document_id: &str) -> Result<Vec<Section>> {
        let sections = sqlx::query_as::<_, Section>(
            "SELECT * FROM sections WHERE document_id = ? ORDER BY position ASC",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sections)
    }

    pub async fn get(&self, document_id: &str, section_id: &str) -> Result<Section> {
        sqlx::query_as::<_, Section>("SELECT * FROM sections WHERE id = ? AND document_id = ?")
            .bind(section_id)
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::not_found("Page"))
    }

    /// First free position after the document's current last section
    pub async fn next_position(&self, document_id: &str) -> Result<i64> {
        let max: Option<i64> =
            sqlx::query_scalar("SELECT MAX(position) FROM sections WHERE document_id = ?")
                .bind(document_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(max.map_or(0, |max| max + 1))
    }

    pub async fn create(
        &self,
        document_id: &str,
        name: &str,
        description: &str,
        position: i64,
    ) -> Result<Section> {
        if name.trim().is_empty() {
            return Err(StorageError::InvalidInput("Page name is required".to_string()));
        }

        let id = prdsmith_core::generate_id();
        let now = Utc::now();
        debug!("Creating section {} at position {} in {}", id, position, document_id);

        let section = sqlx::query_as::<_, Section>(
            r#"
            INSERT INTO sections (
                id, document_id, name, description, position, status, processed,
                llm_response, processed_digest, created_at, updated_at, last_processed
            ) VALUES (?, ?, ?, ?, ?, 'pending', 0, NULL, NULL, ?, ?, NULL)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(document_id)
        .bind(name)
        .bind(description)
        .bind(position)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(section)
    }

    /// Apply one section edit. Blank names and descriptions are ignored; a
    /// supplied `llm_response` marks the section processed against its
    /// resulting content.
    pub async fn update(
        &self,
        document_id: &str,
        section_id: &str,
        input: &SectionInput,
    ) -> Result<Section> {
        let current = self.get(document_id, section_id).await?;

        let name = input
            .name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&current.name);
        let description = input
            .description
            .as_deref()
            .filter(|description| !description.trim().is_empty())
            .unwrap_or(&current.description);
        let position = input.position.unwrap_or(current.position);
        if position != current.position {
            self.ensure_position_free(document_id, section_id, position).await?;
        }

        let (llm_response, processed, digest, status) = match &input.llm_response {
            Some(response) => (
                Some(serde_json::to_string(response)?),
                true,
                Some(content_digest(name, description)),
                "completed".to_string(),
            ),
            None => (
                current
                    .llm_response
                    .as_ref()
                    .map(|json| serde_json::to_string(&json.0))
                    .transpose()?,
                current.processed,
                current.processed_digest.clone(),
                current.status.clone(),
            ),
        };

        let section = sqlx::query_as::<_, Section>(
            r#"
            UPDATE sections
            SET name = ?, description = ?, position = ?, status = ?, processed = ?,
                llm_response = ?, processed_digest = ?, updated_at = ?
            WHERE id = ? AND document_id = ?
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(position)
        .bind(status)
        .bind(processed)
        .bind(llm_response)
        .bind(digest)
        .bind(Utc::now())
        .bind(section_id)
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StorageError::not_found("Page"))?;

        Ok(section)
    }

    /// Save a list of section edits as independent writes. Entries with an id
    /// update that section; entries without one are appended in list order.
    pub async fn save_batch(&self, document_id: &str, inputs: &[SectionInput]) -> Result<Vec<Section>> {
        if inputs.is_empty() {
            return Err(StorageError::InvalidInput("No pages to save".to_string()));
        }

        let mut next_position = self.next_position(document_id).await?;
        let mut saved = Vec::with_capacity(inputs.len());

        for input in inputs {
            let section = match &input.id {
                Some(id) => self.update(document_id, id, input).await?,
                None => {
                    let name = input.name.as_deref().unwrap_or_default();
                    let description = input.description.as_deref().unwrap_or_default();
                    let mut section = self
                        .create(document_id, name, description, next_position)
                        .await?;
                    next_position += 1;

                    if input.llm_response.is_some() {
                        section = self.update(document_id, &section.id, input).await?;
                    }
                    section
                }
            };
            saved.push(section);
        }

        Ok(saved)
    }

    /// Remove a section, returning what was deleted
    pub async fn delete(&self, document_id: &str, section_id: &str) -> Result<Section> {
        sqlx::query_as::<_, Section>(
            "DELETE FROM sections WHERE id = ? AND document_id = ? RETURNING *",
        )
        .bind(section_id)
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StorageError::not_found("Page"))
    }

    /// Moving onto a slot another section holds would break the unique
    /// (document_id, position) constraint; reordering goes through `reorder`.
    async fn ensure_position_free(&self, document_id: &str, section_id: &str, position: i64) -> Result<()> {
        if position < 0 {
            return Err(StorageError::InvalidInput(format!(
                "Position {} is invalid",
                position
            )));
        }

        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM sections WHERE document_id = ? AND position = ? AND id != ?)",
        )
        .bind(document_id)
        .bind(position)
        .bind(section_id)
        .fetch_one(&self.pool)
        .await?;

        if taken {
            return Err(StorageError::InvalidInput(format!(
                "Position {} is already taken; use the page order endpoint to move pages",
                position
            )));
        }
        Ok(())
    }

    /// Assign positions 0..n in the given order inside one transaction.
    ///
    /// `section_ids` must list every section of the document exactly once.
    /// Positions are first moved to negative values so the unique
    /// (document_id, position) constraint holds at every step.
    pub async fn reorder(&self, document_id: &str, section_ids: &[String]) -> Result<Vec<Section>> {
        let mut tx = self.pool.begin().await?;

        let existing: Vec<String> = sqlx::query_scalar("SELECT id FROM sections WHERE document_id = ?")
            .bind(document_id)
            .fetch_all(&mut *tx)
            .await?;
        let existing: HashSet<&str> = existing.iter().map(String::as_str).collect();

        if section_ids.iter().any(|id| !existing.contains(id.as_str())) {
            return Err(StorageError::not_found("Page"));
        }
        let listed: HashSet<&str> = section_ids.iter().map(String::as_str).collect();
        if listed.len() != section_ids.len() || listed.len() != existing.len() {
            return Err(StorageError::InvalidInput(
                "Page order must list every page of the PRD exactly once".to_string(),
            ));
        }

        for (index, id) in section_ids.iter().enumerate() {
            let result = sqlx::query(
                "UPDATE sections SET position = ? WHERE id = ? AND document_id = ?",
            )
            .bind(-(index as i64) - 1)
            .bind(id)
            .bind(document_id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                // Dropping the transaction rolls it back
                return Err(StorageError::not_found("Page"));
            }
        }

        let now = Utc::now();
        for (index, id) in section_ids.iter().enumerate() {
            sqlx::query(
                "UPDATE sections SET position = ?, updated_at = ? WHERE id = ? AND document_id = ?",
            )
            .bind(index as i64)
            .bind(now)
            .bind(id)
            .bind(document_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.list_for_document(document_id).await
    }

    /// Store a generated requirements response against the content it was
    /// generated from. The write only applies while `account_id` still owns
    /// the document.
    pub async fn record_generation(
        &self,
        account_id: &str,
        document_id: &str,
        section_id: &str,
        response: &Value,
        digest: &str,
    ) -> Result<Section> {
        let now = Utc::now();
        sqlx::query_as::<_, Section>(
            r#"
            UPDATE sections
            SET llm_response = ?, processed = 1, processed_digest = ?, status = 'completed',
                last_processed = ?, updated_at = ?
            WHERE id = ? AND document_id = ?
              AND EXISTS (SELECT 1 FROM documents WHERE id = ? AND account_id = ?)
            RETURNING *
            "#,
        )
        .bind(serde_json::to_string(response)?)
        .bind(digest)
        .bind(now)
        .bind(now)
        .bind(section_id)
        .bind(document_id)
        .bind(document_id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StorageError::not_found("Page"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountUpsert, CreateDocumentInput};
    use crate::Database;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn setup() -> (Database, String, String) {
        let db = Database::in_memory().await.unwrap();
        let account = db
            .accounts
            .upsert(&AccountUpsert {
                external_id: "user_ext".to_string(),
                email: "owner@example.com".to_string(),
                name: None,
            })
            .await
            .unwrap();
        let doc = db
            .documents
            .create(
                &account.id,
                &CreateDocumentInput {
                    app_name: "Acme".to_string(),
                    app_description: "Inventory".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        (db, account.id, doc.id)
    }

    fn new_page(name: &str) -> SectionInput {
        SectionInput {
            name: Some(name.to_string()),
            description: Some(format!("{} page", name)),
            ..Default::default()
        }
    }

    fn names(sections: &[Section]) -> Vec<&str> {
        sections.iter().map(|s| s.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_save_batch_appends_after_existing_sections() {
        let (db, _, doc_id) = setup().await;
        db.sections.create(&doc_id, "Home", "Landing", 0).await.unwrap();

        let saved = db
            .sections
            .save_batch(&doc_id, &[new_page("Login"), new_page("Settings")])
            .await
            .unwrap();

        assert_eq!(saved[0].position, 1);
        assert_eq!(saved[1].position, 2);
        let listed = db.sections.list_for_document(&doc_id).await.unwrap();
        assert_eq!(names(&listed), vec!["Home", "Login", "Settings"]);
    }

    #[tokio::test]
    async fn test_save_batch_rejects_empty_list() {
        let (db, _, doc_id) = setup().await;
        let err = db.sections.save_batch(&doc_id, &[]).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_update_ignores_blank_fields() {
        let (db, _, doc_id) = setup().await;
        let section = db.sections.create(&doc_id, "Home", "Landing", 0).await.unwrap();

        let updated = db
            .sections
            .update(
                &doc_id,
                &section.id,
                &SectionInput {
                    name: Some("   ".to_string()),
                    description: Some("New landing".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Home");
        assert_eq!(updated.description, "New landing");
        assert!(!updated.processed);
    }

    #[tokio::test]
    async fn test_manual_response_marks_section_processed() {
        let (db, _, doc_id) = setup().await;
        let section = db.sections.create(&doc_id, "Home", "Landing", 0).await.unwrap();

        let updated = db
            .sections
            .update(
                &doc_id,
                &section.id,
                &SectionInput {
                    llm_response: Some(json!({ "text": "Edited requirements" })),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(updated.processed);
        assert!(!updated.needs_generation());
    }

    #[tokio::test]
    async fn test_content_change_after_generation_needs_regeneration() {
        let (db, account_id, doc_id) = setup().await;
        let section = db.sections.create(&doc_id, "Home", "Landing", 0).await.unwrap();
        db.sections
            .record_generation(&account_id, &doc_id, &section.id, &json!({ "text": "R" }), &section.content_digest())
            .await
            .unwrap();

        let edited = db
            .sections
            .update(
                &doc_id,
                &section.id,
                &SectionInput {
                    description: Some("Landing with hero".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(edited.processed);
        assert!(edited.needs_generation());
    }

    #[tokio::test]
    async fn test_record_generation_sets_processed_and_timestamp() {
        let (db, account_id, doc_id) = setup().await;
        let section = db.sections.create(&doc_id, "Home", "Landing", 0).await.unwrap();

        let stored = db
            .sections
            .record_generation(&account_id, &doc_id, &section.id, &json!({ "text": "R" }), &section.content_digest())
            .await
            .unwrap();

        assert!(stored.processed);
        assert_eq!(stored.status, "completed");
        assert!(stored.last_processed.is_some());
        assert_eq!(stored.response(), Some(&json!({ "text": "R" })));
    }

    #[tokio::test]
    async fn test_reorder_assigns_sequential_positions() {
        let (db, _, doc_id) = setup().await;
        let a = db.sections.create(&doc_id, "A", "a", 0).await.unwrap();
        let b = db.sections.create(&doc_id, "B", "b", 1).await.unwrap();
        let c = db.sections.create(&doc_id, "C", "c", 2).await.unwrap();

        let reordered = db
            .sections
            .reorder(&doc_id, &[c.id.clone(), a.id.clone(), b.id.clone()])
            .await
            .unwrap();

        assert_eq!(names(&reordered), vec!["C", "A", "B"]);
        assert_eq!(
            reordered.iter().map(|s| s.position).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[tokio::test]
    async fn test_reorder_with_foreign_id_changes_nothing() {
        let (db, _, doc_id) = setup().await;
        let a = db.sections.create(&doc_id, "A", "a", 0).await.unwrap();
        let b = db.sections.create(&doc_id, "B", "b", 1).await.unwrap();

        let err = db
            .sections
            .reorder(&doc_id, &[b.id.clone(), "not-a-section".to_string(), a.id.clone()])
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let listed = db.sections.list_for_document(&doc_id).await.unwrap();
        assert_eq!(names(&listed), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_reorder_requires_every_section_once() {
        let (db, _, doc_id) = setup().await;
        let a = db.sections.create(&doc_id, "A", "a", 0).await.unwrap();
        let b = db.sections.create(&doc_id, "B", "b", 1).await.unwrap();
        let c = db.sections.create(&doc_id, "C", "c", 2).await.unwrap();

        let subset = db.sections.reorder(&doc_id, &[c.id.clone()]).await.unwrap_err();
        assert!(matches!(subset, StorageError::InvalidInput(_)));

        let duplicated = db
            .sections
            .reorder(&doc_id, &[c.id.clone(), c.id.clone(), a.id.clone()])
            .await
            .unwrap_err();
        assert!(matches!(duplicated, StorageError::InvalidInput(_)));

        let listed = db.sections.list_for_document(&doc_id).await.unwrap();
        assert_eq!(names(&listed), vec!["A", "B", "C"]);
        assert_eq!(listed[1].id, b.id);
    }

    #[tokio::test]
    async fn test_update_rejects_taken_position() {
        let (db, _, doc_id) = setup().await;
        db.sections.create(&doc_id, "A", "a", 0).await.unwrap();
        let b = db.sections.create(&doc_id, "B", "b", 1).await.unwrap();

        let err = db
            .sections
            .update(
                &doc_id,
                &b.id,
                &SectionInput {
                    position: Some(0),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidInput(_)));

        let moved = db
            .sections
            .update(
                &doc_id,
                &b.id,
                &SectionInput {
                    position: Some(5),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.position, 5);
    }

    #[tokio::test]
    async fn test_positions_are_unique_per_document() {
        let (db, _, doc_id) = setup().await;
        db.sections.create(&doc_id, "A", "a", 0).await.unwrap();

        let err = db.sections.create(&doc_id, "B", "b", 0).await.unwrap_err();
        assert!(matches!(err, StorageError::Sqlx(_)));
    }

    #[tokio::test]
    async fn test_delete_returns_removed_section() {
        let (db, _, doc_id) = setup().await;
        let section = db.sections.create(&doc_id, "Home", "Landing", 0).await.unwrap();

        let deleted = db.sections.delete(&doc_id, &section.id).await.unwrap();
        assert_eq!(deleted.id, section.id);
        assert!(db
            .sections
            .delete(&doc_id, &section.id)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_record_generation_rejects_non_owner() {
        let (db, _, doc_id) = setup().await;
        let section = db.sections.create(&doc_id, "Home", "Landing", 0).await.unwrap();

        let err = db
            .sections
            .record_generation("intruder", &doc_id, &section.id, &json!({ "text": "R" }), "digest")
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let stored = db.sections.get(&doc_id, &section.id).await.unwrap();
        assert!(!stored.processed);
        assert!(stored.llm_response.is_none());
    }
}
