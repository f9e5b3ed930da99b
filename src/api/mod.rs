//! REST API server module
//!
//! Provides an OpenAPI compliant REST API for triggering WXR imports,
//! monitoring their progress, cancelling runs and previewing documents.

use crate::{Config, ImportManager, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Import Job Control
/// - `POST /api/v1/import` - Trigger an import run
/// - `GET /api/v1/import/status` - Snapshot of the current or most recent job
/// - `POST /api/v1/import/cancel` - Cancel the running import
/// - `POST /api/v1/import/preview` - Count records without importing
///
/// ## System
/// - `GET /api/v1/health` - Health check
/// - `GET /api/v1/openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
pub fn create_router(manager: Arc<ImportManager>, config: Arc<Config>) -> Router {
    let state = AppState::new(manager, config.clone());

    // Build the router with all routes
    let router = Router::new()
        // Import Job Control
        .route("/api/v1/import", post(routes::trigger_import))
        .route("/api/v1/import/status", get(routes::import_status))
        .route("/api/v1/import/cancel", post(routes::cancel_import))
        .route("/api/v1/import/preview", post(routes::preview_import))
        // System
        .route("/api/v1/health", get(routes::health_check));

    // Merge Swagger UI routes if enabled in config (before applying state).
    // SwaggerUi serves the spec itself at the url it is given, so the plain
    // handler route for /api/v1/openapi.json only exists when the UI is off.
    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api/v1/openapi.json", ApiDoc::openapi()))
    } else {
        router.route("/api/v1/openapi.json", get(routes::openapi_spec))
    };

    // Add state to all routes
    let router = router.with_state(state);

    // Request/response tracing is always on; CORS is config-gated below
    let router = router.layer(TraceLayer::new_for_http());

    // Apply CORS middleware if enabled in config
    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// # Arguments
///
/// * `origins` - List of allowed origins (supports "*" for any origin)
///
/// # Returns
///
/// A configured CorsLayer that allows the specified origins, all methods,
/// and all headers for cross-origin requests.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    // Check if "*" (all origins) is in the list
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        // Allow all origins (default for local development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        // Allow specific origins
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// This function creates a TCP listener, binds it to the configured address,
/// and starts serving the API router. It runs until the server is shut down.
///
/// # Arguments
///
/// * `manager` - Arc-wrapped ImportManager instance to handle API requests
/// * `config` - Arc-wrapped Config containing API configuration
///
/// # Returns
///
/// Returns a Result<()> that completes when the server stops, either due to
/// an error or graceful shutdown.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use wxr_import::store::memory::MemoryStore;
/// use wxr_import::{Config, ImportManager};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::default();
/// let manager = Arc::new(ImportManager::new(
///     Arc::new(MemoryStore::new()),
///     config.clone(),
/// )?);
///
/// // Start API server (blocks until shutdown)
/// wxr_import::api::start_api_server(manager, Arc::new(config)).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(manager: Arc<ImportManager>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.server.api.bind_address;

    tracing::info!(
        address = %bind_address,
        "Starting API server"
    );

    // Create the router with all routes
    let app = create_router(manager, config);

    // Bind TCP listener to the configured address
    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %bind_address,
        "API server listening"
    );

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
