//! Test configuration helpers for creating SQLite-backed import managers

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wxr_import::store::sqlite::SqliteStore;
use wxr_import::{Config, ImportManager};

/// Error type for test setup
#[derive(Debug)]
pub struct SetupError(pub String);

impl std::fmt::Display for SetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Setup error: {}", self.0)
    }
}

impl std::error::Error for SetupError {}

/// Build a config rooted in the given directory with fast retry timings
///
/// Disk space admission is disabled so the tests behave the same on small
/// CI partitions.
pub fn test_config(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.upload.root_dir = dir.join("uploads");
    config.persistence.database_path = dir.join("content.db");
    config.media.max_concurrent_downloads = 2;
    config.media.download_timeout = Duration::from_secs(5);
    config.media.retry.max_attempts = 2;
    config.media.retry.initial_delay = Duration::from_millis(10);
    config.media.retry.max_delay = Duration::from_millis(50);
    config.media.retry.jitter = false;
    config.media.disk_space.enabled = false;
    config
}

/// Create an ImportManager backed by a SQLite store in a fresh temp directory
///
/// Returns the manager and temp directory (keep temp_dir alive for test duration)
pub async fn create_sqlite_manager() -> Result<(Arc<ImportManager>, TempDir), SetupError> {
    let temp_dir = tempfile::tempdir()
        .map_err(|e| SetupError(format!("Failed to create temp dir: {}", e)))?;
    let manager = open_sqlite_manager(temp_dir.path()).await?;
    Ok((manager, temp_dir))
}

/// Open an ImportManager over the database and upload tree in `dir`
///
/// Opening the same directory twice models an application restart: the second
/// manager sees everything the first one imported.
pub async fn open_sqlite_manager(dir: &std::path::Path) -> Result<Arc<ImportManager>, SetupError> {
    let config = test_config(dir);

    let store = SqliteStore::new(config.database_path())
        .await
        .map_err(|e| SetupError(format!("Failed to open store: {}", e)))?;

    let manager = ImportManager::new(Arc::new(store), config)
        .map_err(|e| SetupError(format!("Failed to create manager: {}", e)))?;

    Ok(Arc::new(manager))
}

/// Open a bare SQLite store over an existing test database for assertions
pub async fn open_store(dir: &std::path::Path) -> Result<SqliteStore, SetupError> {
    let config = test_config(dir);
    SqliteStore::new(config.database_path())
        .await
        .map_err(|e| SetupError(format!("Failed to open store: {}", e)))
}

/// Write a WXR export into the directory and return its path
pub fn write_export(dir: &std::path::Path, name: &str, xml: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, xml).expect("Failed to write export fixture");
    path
}
