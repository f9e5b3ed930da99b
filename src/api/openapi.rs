//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the wxr-import REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the wxr-import REST API
///
/// This struct is used to generate the OpenAPI specification that describes
/// all available endpoints, request/response types, and API behavior.
///
/// The spec can be accessed via:
/// - `/api/v1/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "wxr-import REST API",
        version = "0.2.0",
        description = "REST API for migrating WordPress WXR exports into a content store: trigger imports, monitor progress, cancel runs and preview documents",
        contact(
            name = "wxr-import",
            url = "https://github.com/wxr-import/wxr-import"
        ),
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8055", description = "Local development server")
    ),
    paths(
        // Import job control
        crate::api::routes::trigger_import,
        crate::api::routes::import_status,
        crate::api::routes::cancel_import,
        crate::api::routes::preview_import,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::JobState,
        crate::types::ImportPhase,
        crate::types::RecordKind,
        crate::types::PostStatus,
        crate::types::ImportCounts,
        crate::types::ImportStats,
        crate::types::JobSnapshot,
        crate::types::PreviewCounts,
        crate::types::Event,

        // Config types from config.rs
        crate::config::Config,
        crate::config::UploadConfig,
        crate::config::MediaConfig,
        crate::config::RetryConfig,
        crate::config::DiskSpaceConfig,
        crate::config::PersistenceConfig,
        crate::config::ServerIntegrationConfig,
        crate::config::ApiConfig,

        // API request types from routes.rs
        crate::api::routes::TriggerImportRequest,
        crate::api::routes::CancelImportRequest,
        crate::api::routes::PreviewImportRequest,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "import", description = "Import job control - Trigger, monitor, cancel and preview WXR imports"),
        (name = "system", description = "System endpoints - Health checks and the OpenAPI spec"),
    )
)]
pub struct ApiDoc;
