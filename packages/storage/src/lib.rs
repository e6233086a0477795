// ABOUTME: Persistence layer for Prdsmith backed by SQLite
// ABOUTME: Accounts, documents, sections, and implementation plans with owner-scoped access

pub mod accounts;
pub mod database;
pub mod documents;
pub mod error;
pub mod implementation_plans;
pub mod sections;
pub mod types;

pub use accounts::AccountStorage;
pub use database::Database;
pub use documents::DocumentStorage;
pub use error::{Result, StorageError};
pub use implementation_plans::ImplementationPlanStorage;
pub use sections::SectionStorage;
pub use types::*;
