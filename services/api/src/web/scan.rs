//! services/api/src/web/scan.rs
//!
//! Handlers for the scan flow: upload an image, analyze it, and read the
//! published result exactly once.

use crate::web::middleware::SessionId;
use crate::web::protocol::{
    failure, handoff_failure, scan_failure, ErrorBody, HandlerError, ResultSummaryDto,
};
use crate::web::state::AppState;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Redirect},
    Extension,
};
use skincheck_core::error::ScanError;
use skincheck_core::results::ResultSummary;
use skincheck_core::UploadedFile;
use std::sync::Arc;
use tracing::{info, warn};

const IMAGE_FIELD: &str = "file";

/// Upload an image and analyze it.
///
/// Accepts a multipart/form-data request whose `file` part holds the image.
/// On success the result is published for `/api/results` and the client is
/// redirected to the results view.
#[utoipa::path(
    post,
    path = "/api/scan",
    request_body(content_type = "multipart/form-data", description = "The image to analyze."),
    responses(
        (status = 303, description = "Analysis published; continue to the results view"),
        (status = 400, description = "Missing session header or file", body = ErrorBody),
        (status = 409, description = "An analysis is already in flight", body = ErrorBody),
        (status = 413, description = "Image too large", body = ErrorBody),
        (status = 415, description = "Not an image", body = ErrorBody),
        (status = 502, description = "Analysis service rejected the image", body = ErrorBody),
        (status = 503, description = "Analysis service unreachable", body = ErrorBody),
        (status = 504, description = "Analysis timed out", body = ErrorBody)
    ),
    params(
        ("x-session-id" = String, Header, description = "The client's session id, a UUID.")
    )
)]
pub async fn scan_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    mut multipart: Multipart,
) -> Result<Redirect, HandlerError> {
    let file = read_image_field(&mut multipart).await?;

    let shared = app_state.scan_session(session_id);
    let mut session = shared.try_lock().map_err(|_| analysis_in_flight())?;

    session.upload(file).map_err(|e| scan_failure(&e))?;
    let outcome = session.analyze().await.map_err(|e| scan_failure(&e))?;
    info!("Session {} scanned: {} risk", session_id, outcome.result.risk_level);
    Ok(Redirect::to(outcome.next_route))
}

/// Resubmit the image kept from a failed analysis, without uploading it again.
#[utoipa::path(
    post,
    path = "/api/scan/retry",
    responses(
        (status = 303, description = "Analysis published; continue to the results view"),
        (status = 400, description = "No image to retry", body = ErrorBody),
        (status = 409, description = "An analysis is already in flight", body = ErrorBody),
        (status = 504, description = "Analysis timed out", body = ErrorBody)
    ),
    params(
        ("x-session-id" = String, Header, description = "The client's session id, a UUID.")
    )
)]
pub async fn retry_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(SessionId(session_id)): Extension<SessionId>,
) -> Result<Redirect, HandlerError> {
    let shared = app_state
        .existing_scan_session(session_id)
        .ok_or_else(|| scan_failure(&ScanError::NoImage))?;
    let mut session = shared.try_lock().map_err(|_| analysis_in_flight())?;

    let outcome = session.analyze().await.map_err(|e| scan_failure(&e))?;
    info!("Session {} retry succeeded", session_id);
    Ok(Redirect::to(outcome.next_route))
}

/// Discard the image kept by this session and close the session.
#[utoipa::path(
    delete,
    path = "/api/scan",
    responses(
        (status = 204, description = "Image discarded"),
        (status = 409, description = "An analysis is already in flight", body = ErrorBody)
    ),
    params(
        ("x-session-id" = String, Header, description = "The client's session id, a UUID.")
    )
)]
pub async fn reset_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(SessionId(session_id)): Extension<SessionId>,
) -> Result<StatusCode, HandlerError> {
    if let Some(shared) = app_state.existing_scan_session(session_id) {
        shared.try_lock().map_err(|_| analysis_in_flight())?.reset();
        app_state.close_scan_session(session_id);
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Read the published analysis result. The result is removed as it is read.
#[utoipa::path(
    get,
    path = "/api/results",
    responses(
        (status = 200, description = "The result summary", body = ResultSummaryDto),
        (status = 404, description = "No result to show; restart the scan", body = ErrorBody),
        (status = 422, description = "Stored result unreadable; restart the scan", body = ErrorBody)
    ),
    params(
        ("x-session-id" = String, Header, description = "The client's session id, a UUID.")
    )
)]
pub async fn results_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(SessionId(session_id)): Extension<SessionId>,
) -> Result<impl IntoResponse, HandlerError> {
    let result = app_state
        .mailbox(session_id)
        .consume()
        .map_err(|e| {
            warn!("Session {} has no readable result: {}", session_id, e);
            handoff_failure(&e)
        })?;
    Ok(Json(ResultSummaryDto::from(ResultSummary::from(&result))))
}

//=========================================================================================
// Helper Functions
//=========================================================================================

fn analysis_in_flight() -> HandlerError {
    failure(StatusCode::CONFLICT, "An analysis is already in progress")
}

/// Reads the `file` part, or failing that the first part that carries a filename.
async fn read_image_field(multipart: &mut Multipart) -> Result<UploadedFile, HandlerError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| {
            failure(
                e.status(),
                format!("Failed to read multipart data: {}", e.body_text()),
            )
        })?
    {
        if field.name() != Some(IMAGE_FIELD) && field.file_name().is_none() {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| {
                failure(e.status(), format!("Failed to read file bytes: {}", e.body_text()))
            })?;
        return Ok(UploadedFile {
            file_name,
            content_type,
            bytes,
        });
    }
    Err(failure(StatusCode::BAD_REQUEST, "Multipart form must include a file"))
}
