// ABOUTME: Database connection management and storage initialization
// ABOUTME: Provides shared access to the SQLite pool and the per-entity storages

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::accounts::AccountStorage;
use crate::documents::DocumentStorage;
use crate::error::Result;
use crate::implementation_plans::ImplementationPlanStorage;
use crate::sections::SectionStorage;
use crate::types::DocumentDetail;

/// Shared database state handed to the orchestrator and HTTP handlers
#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
    pub accounts: Arc<AccountStorage>,
    pub documents: Arc<DocumentStorage>,
    pub sections: Arc<SectionStorage>,
    pub implementation_plans: Arc<ImplementationPlanStorage>,
}

impl Database {
    /// Build storages over an existing pool (migrations are assumed applied)
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            accounts: Arc::new(AccountStorage::new(pool.clone())),
            documents: Arc::new(DocumentStorage::new(pool.clone())),
            sections: Arc::new(SectionStorage::new(pool.clone())),
            implementation_plans: Arc::new(ImplementationPlanStorage::new(pool.clone())),
            pool,
        }
    }

    /// Open (creating if needed) the SQLite file at `path` and run migrations
    pub async fn connect(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let database_url = format!("sqlite:{}", path.display());
        debug!("Connecting to database: {}", database_url);

        let options = SqliteConnectOptions::from_str(&database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await?;

        info!("Database connection established");

        Self::migrate(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Private in-memory database with migrations applied.
    ///
    /// Limited to one connection: every new SQLite in-memory connection is a
    /// separate empty database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Self::migrate(&pool).await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(pool: &SqlitePool) -> Result<()> {
        sqlx::migrate!("./migrations").run(pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Load a document owned by `account_id` with its sections and plan
    pub async fn document_detail(&self, account_id: &str, document_id: &str) -> Result<DocumentDetail> {
        let document = self.documents.get(account_id, document_id).await?;
        let sections = self.sections.list_for_document(document_id).await?;
        let implementation = self
            .implementation_plans
            .find_for_document(document_id)
            .await?;

        Ok(DocumentDetail {
            document,
            sections,
            implementation,
        })
    }
}
