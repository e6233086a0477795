use std::env;
use std::path::PathBuf;

/// Name of the per-user data directory
pub const APP_DIR_NAME: &str = ".prdsmith";

/// Get the path to the Prdsmith data directory (~/.prdsmith)
pub fn data_dir() -> PathBuf {
    // HOME wins so tests can redirect the data directory
    if let Ok(home) = env::var("HOME") {
        PathBuf::from(home).join(APP_DIR_NAME)
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
    }
}

/// Get the default SQLite database location (~/.prdsmith/prdsmith.db)
pub fn default_database_path() -> PathBuf {
    data_dir().join("prdsmith.db")
}
