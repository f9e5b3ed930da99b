//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`import`]: trigger, status, cancel and preview for the single import slot
//! - [`system`]: health check and OpenAPI spec

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

mod import;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use import::*;
pub use system::*;

// ============================================================================
// Request Types (shared across handlers)
// ============================================================================

/// Request body for POST /import
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct TriggerImportRequest {
    /// Who is triggering the import; also used to derive the operator
    /// fallback author in the target store
    pub initiator: String,

    /// Path of the WXR export file on the server
    pub source_path: PathBuf,
}

/// Request body for POST /import/cancel
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CancelImportRequest {
    /// Who is requesting the cancellation
    pub initiator: String,
}

/// Request body for POST /import/preview
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct PreviewImportRequest {
    /// Path of the WXR export file on the server
    pub source_path: PathBuf,
}
