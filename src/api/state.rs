//! Application state for the API server

use crate::{Config, ImportManager};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// This struct is cloned for each request (cheap Arc clone) and provides
/// access to the import manager and configuration.
#[derive(Clone)]
pub struct AppState {
    /// The import manager owning the single job slot
    pub manager: Arc<ImportManager>,

    /// Configuration (read access; a running job carries its own copy)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(manager: Arc<ImportManager>, config: Arc<Config>) -> Self {
        Self { manager, config }
    }
}
