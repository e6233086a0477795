// ABOUTME: Core utilities shared across Prdsmith packages
// ABOUTME: ID generation, data directory resolution, and log-safe text helpers

pub mod constants;
pub mod utils;

// Re-export constants
pub use constants::{data_dir, default_database_path, APP_DIR_NAME};

// Re-export utilities
pub use utils::{generate_id, preview, ID_LENGTH};
