//! services/api/src/web/middleware.rs
//!
//! Session middleware for the routes that act on one client's scan state.

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::web::protocol::ErrorBody;

pub const SESSION_HEADER: &str = "x-session-id";

/// The client session a request belongs to, inserted by `require_session`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionId(pub Uuid);

/// Middleware that reads the `x-session-id` header.
///
/// If valid, inserts a `SessionId` into request extensions for handlers to use.
/// If invalid or missing, returns 400 Bad Request.
pub async fn require_session(mut req: Request, next: Next) -> Response {
    let parsed = req
        .headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| Uuid::parse_str(v.trim()));

    let session_id = match parsed {
        Some(Ok(id)) => id,
        Some(Err(_)) => return bad_request("Invalid x-session-id format"),
        None => return bad_request("x-session-id header is required"),
    };

    req.extensions_mut().insert(SessionId(session_id));
    next.run(req).await
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorBody::new(message))).into_response()
}
