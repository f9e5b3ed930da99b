//! # wxr-import
//!
//! Backend library for migrating WordPress WXR exports into a content store.
//!
//! ## Design Philosophy
//!
//! wxr-import is designed to be:
//! - **Idempotent** - Records that already exist in the target are skipped, so
//!   re-running a failed import never duplicates content
//! - **Fault-isolated** - A broken record is counted and skipped, never fatal
//!   to the rest of the run
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use wxr_import::store::memory::MemoryStore;
//! use wxr_import::{Config, ImportManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let manager = ImportManager::new(Arc::new(MemoryStore::new()), config)?;
//!
//!     // Subscribe to events
//!     let mut events = manager.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let snapshot = manager.begin("admin", "wordpress-export.xml".into()).await?;
//!     println!("Import started in state {}", snapshot.state);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Phase-ordered record import pipeline
mod importer;
/// Import job lifecycle management
pub mod job;
/// Media download and image derivative generation
pub mod media;
/// Source-to-target ID mapping for a single run
pub mod resolver;
/// Retry logic with exponential backoff
pub mod retry;
/// Content store abstraction and backends
pub mod store;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;
/// WXR document parsing
pub mod wxr;

// Re-export commonly used types
pub use config::{
    ApiConfig, Config, DiskSpaceConfig, MediaConfig, PersistenceConfig, RetryConfig, UploadConfig,
};
pub use error::{ApiError, Error, ErrorDetail, MediaError, Result, StoreError, ToHttpStatus};
pub use job::ImportManager;
pub use store::ContentStore;
pub use types::{
    Event, ImportCounts, ImportPhase, ImportStats, JobSnapshot, JobState, PostStatus,
    PreviewCounts, RecordKind, TargetId,
};

use std::sync::Arc;

/// Helper function to run the import manager with graceful signal handling.
///
/// Waits for a termination signal and then calls the manager's `shutdown()`
/// method, which requests cancellation of any running import and waits for it
/// to wind down.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use wxr_import::store::memory::MemoryStore;
/// use wxr_import::{Config, ImportManager, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let manager = Arc::new(ImportManager::new(
///         Arc::new(MemoryStore::new()),
///         Config::default(),
///     )?);
///
///     // Run with automatic signal handling
///     run_with_shutdown(manager).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(manager: Arc<ImportManager>) -> Result<()> {
    wait_for_signal().await;
    manager.shutdown().await;
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
