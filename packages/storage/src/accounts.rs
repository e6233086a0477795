// ABOUTME: Account storage layer using SQLite
// ABOUTME: Maps external identity-provider IDs to local accounts

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{Result, StorageError};
use crate::types::{Account, AccountUpsert};

pub struct AccountStorage {
    pool: SqlitePool,
}

impl AccountStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Account>> {
        let account =
            sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE external_id = ?")
                .bind(external_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(account)
    }

    /// Resolve an identity to its local account, failing with NotFound when unknown
    pub async fn resolve(&self, external_id: &str) -> Result<Account> {
        self.find_by_external_id(external_id)
            .await?
            .ok_or_else(|| StorageError::not_found("User"))
    }

    /// Create the account for `external_id`, or refresh its email and name
    pub async fn upsert(&self, input: &AccountUpsert) -> Result<Account> {
        if input.external_id.trim().is_empty() {
            return Err(StorageError::InvalidInput(
                "external_id must not be empty".to_string(),
            ));
        }

        debug!("Upserting account for external id: {}", input.external_id);

        let now = Utc::now();
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (id, external_id, email, name, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(external_id) DO UPDATE SET
                email = excluded.email,
                name = excluded.name,
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(prdsmith_core::generate_id())
        .bind(&input.external_id)
        .bind(&input.email)
        .bind(&input.name)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(account)
    }

    /// Delete an account; its documents cascade
    pub async fn delete_by_external_id(&self, external_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM accounts WHERE external_id = ?")
            .bind(external_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("User"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    fn upsert_input(external_id: &str, email: &str) -> AccountUpsert {
        AccountUpsert {
            external_id: external_id.to_string(),
            email: email.to_string(),
            name: Some("Ada Lovelace".to_string()),
        }
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates_same_row() {
        let db = Database::in_memory().await.unwrap();

        let created = db
            .accounts
            .upsert(&upsert_input("user_ext_1", "ada@example.com"))
            .await
            .unwrap();
        let updated = db
            .accounts
            .upsert(&upsert_input("user_ext_1", "ada@new.example.com"))
            .await
            .unwrap();

        assert_eq!(created.id, updated.id);
        assert_eq!(updated.email, "ada@new.example.com");
    }

    #[tokio::test]
    async fn test_resolve_unknown_identity_is_not_found() {
        let db = Database::in_memory().await.unwrap();

        let err = db.accounts.resolve("missing").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "User not found");
    }

    #[tokio::test]
    async fn test_delete_by_external_id() {
        let db = Database::in_memory().await.unwrap();
        db.accounts
            .upsert(&upsert_input("user_ext_2", "b@example.com"))
            .await
            .unwrap();

        db.accounts.delete_by_external_id("user_ext_2").await.unwrap();

        assert!(db
            .accounts
            .find_by_external_id("user_ext_2")
            .await
            .unwrap()
            .is_none());
        assert!(db
            .accounts
            .delete_by_external_id("user_ext_2")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_upsert_rejects_blank_external_id() {
        let db = Database::in_memory().await.unwrap();
        let err = db
            .accounts
            .upsert(&upsert_input("  ", "c@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidInput(_)));
    }
}
