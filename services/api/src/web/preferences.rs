//! services/api/src/web/preferences.rs
//!
//! Handlers for the small per-session flags: photo tips, the check-up
//! reminder, and dismissed tooltips.

use crate::web::middleware::SessionId;
use crate::web::protocol::{
    failure, port_failure, ErrorBody, HandlerError, PreferencesResponse, ReminderDto,
    ReminderRequest,
};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use skincheck_core::ReminderInterval;
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/api/preferences",
    responses((status = 200, description = "Current preferences", body = PreferencesResponse)),
    params(("x-session-id" = String, Header, description = "The client's session id, a UUID."))
)]
pub async fn get_preferences_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(SessionId(session_id)): Extension<SessionId>,
) -> Result<Json<PreferencesResponse>, HandlerError> {
    let prefs = app_state.preferences(session_id);
    Ok(Json(PreferencesResponse {
        has_seen_photo_tips: prefs.has_seen_photo_tips().map_err(|e| port_failure(&e))?,
        reminder: prefs
            .active_reminder()
            .map_err(|e| port_failure(&e))?
            .map(ReminderDto::from),
        seen_tooltips: prefs.seen_tooltips().map_err(|e| port_failure(&e))?,
    }))
}

/// Set the check-up reminder, replacing any previous one.
#[utoipa::path(
    put,
    path = "/api/preferences/reminder",
    request_body = ReminderRequest,
    responses(
        (status = 200, description = "Reminder saved", body = ReminderDto),
        (status = 400, description = "Unknown interval", body = ErrorBody)
    ),
    params(("x-session-id" = String, Header, description = "The client's session id, a UUID."))
)]
pub async fn set_reminder_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    Json(request): Json<ReminderRequest>,
) -> Result<Json<ReminderDto>, HandlerError> {
    let interval = request
        .interval
        .parse::<ReminderInterval>()
        .map_err(|e| failure(StatusCode::BAD_REQUEST, e))?;
    let schedule = app_state
        .preferences(session_id)
        .set_reminder(interval)
        .map_err(|e| port_failure(&e))?;
    Ok(Json(ReminderDto::from(schedule)))
}

#[utoipa::path(
    delete,
    path = "/api/preferences/reminder",
    responses((status = 204, description = "Reminder cleared")),
    params(("x-session-id" = String, Header, description = "The client's session id, a UUID."))
)]
pub async fn clear_reminder_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(SessionId(session_id)): Extension<SessionId>,
) -> Result<StatusCode, HandlerError> {
    app_state
        .preferences(session_id)
        .clear_reminder()
        .map_err(|e| port_failure(&e))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/preferences/photo-tips",
    responses((status = 204, description = "Photo tips marked as seen")),
    params(("x-session-id" = String, Header, description = "The client's session id, a UUID."))
)]
pub async fn photo_tips_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(SessionId(session_id)): Extension<SessionId>,
) -> Result<StatusCode, HandlerError> {
    app_state
        .preferences(session_id)
        .mark_photo_tips_seen()
        .map_err(|e| port_failure(&e))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/preferences/tooltips/{id}",
    responses((status = 204, description = "Tooltip marked as seen")),
    params(
        ("id" = String, Path, description = "Tooltip id."),
        ("x-session-id" = String, Header, description = "The client's session id, a UUID.")
    )
)]
pub async fn tooltip_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    Path(id): Path<String>,
) -> Result<StatusCode, HandlerError> {
    app_state
        .preferences(session_id)
        .mark_tooltip_seen(&id)
        .map_err(|e| port_failure(&e))?;
    Ok(StatusCode::NO_CONTENT)
}
