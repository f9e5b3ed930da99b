//! Import job handlers: trigger, status, cancel, preview.

use crate::Result;
use crate::api::AppState;
use crate::api::routes::{CancelImportRequest, PreviewImportRequest, TriggerImportRequest};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

/// POST /import - Trigger an import run
///
/// Admits the job if no other import is running and returns immediately;
/// the run itself continues in the background. Poll `GET /import/status`
/// for progress.
#[utoipa::path(
    post,
    path = "/api/v1/import",
    tag = "import",
    request_body = TriggerImportRequest,
    responses(
        (status = 202, description = "Import admitted and started", body = crate::types::JobSnapshot),
        (status = 409, description = "Another import is already in progress", body = crate::error::ApiError),
        (status = 422, description = "Source file missing or not a regular file", body = crate::error::ApiError),
        (status = 507, description = "Not enough free disk space under the upload root", body = crate::error::ApiError)
    )
)]
pub async fn trigger_import(
    State(state): State<AppState>,
    Json(payload): Json<TriggerImportRequest>,
) -> Result<impl IntoResponse> {
    let snapshot = state
        .manager
        .begin(&payload.initiator, payload.source_path)
        .await?;

    Ok((StatusCode::ACCEPTED, Json(snapshot)))
}

/// GET /import/status - Current or most recent import job
#[utoipa::path(
    get,
    path = "/api/v1/import/status",
    tag = "import",
    responses(
        (status = 200, description = "Snapshot of the current or most recent job", body = crate::types::JobSnapshot),
        (status = 404, description = "No import job has been started yet", body = crate::error::ApiError)
    )
)]
pub async fn import_status(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let snapshot = state.manager.status().await?;

    Ok(Json(snapshot))
}

/// POST /import/cancel - Cancel the running import
///
/// Cancellation is cooperative: the run stops between records, so the
/// returned snapshot may still show counters moving for a moment.
#[utoipa::path(
    post,
    path = "/api/v1/import/cancel",
    tag = "import",
    request_body = CancelImportRequest,
    responses(
        (status = 200, description = "Cancellation requested", body = crate::types::JobSnapshot),
        (status = 404, description = "No running import job to cancel", body = crate::error::ApiError)
    )
)]
pub async fn cancel_import(
    State(state): State<AppState>,
    Json(payload): Json<CancelImportRequest>,
) -> Result<impl IntoResponse> {
    let snapshot = state.manager.cancel(&payload.initiator).await?;

    Ok(Json(snapshot))
}

/// POST /import/preview - Count records without importing
///
/// Parses the document and reports what a real import would process.
/// Creates nothing, downloads nothing and leaves the source file in place.
#[utoipa::path(
    post,
    path = "/api/v1/import/preview",
    tag = "import",
    request_body = PreviewImportRequest,
    responses(
        (status = 200, description = "Record counts the import would process", body = crate::types::PreviewCounts),
        (status = 422, description = "Source file missing or not parseable", body = crate::error::ApiError)
    )
)]
pub async fn preview_import(
    State(state): State<AppState>,
    Json(payload): Json<PreviewImportRequest>,
) -> Result<impl IntoResponse> {
    let counts = state.manager.preview(&payload.source_path).await?;

    Ok(Json(counts))
}
