//! services/api/src/web/router.rs
//!
//! Assembles the full Axum application: public routes, session-scoped routes,
//! shared layers, and the Swagger UI.

use crate::config::ConfigError;
use crate::error::ApiError;
use crate::web::{
    middleware::{require_session, SESSION_HEADER},
    preferences::{
        clear_reminder_handler, get_preferences_handler, photo_tips_handler, set_reminder_handler,
        tooltip_handler,
    },
    rest::{health_handler, places_handler, uv_handler, ApiDoc},
    scan::{reset_handler, results_handler, retry_handler, scan_handler},
    state::AppState,
};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, CONTENT_TYPE, LOCATION},
        HeaderName, HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Room left in the request body limit for multipart boundaries and headers.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn app_router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let config = app_state.config.clone();

    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string())
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT, HeaderName::from_static(SESSION_HEADER)])
        .expose_headers([LOCATION]);

    // Public routes (no session required)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/api/places", get(places_handler))
        .route("/api/uv", get(uv_handler));

    // Session routes (x-session-id required)
    let session_routes = Router::new()
        .route("/api/scan", post(scan_handler).delete(reset_handler))
        .route("/api/scan/retry", post(retry_handler))
        .route("/api/results", get(results_handler))
        .route("/api/preferences", get(get_preferences_handler))
        .route(
            "/api/preferences/reminder",
            put(set_reminder_handler).delete(clear_reminder_handler),
        )
        .route("/api/preferences/photo-tips", post(photo_tips_handler))
        .route("/api/preferences/tooltips/{id}", post(tooltip_handler))
        .layer(axum_middleware::from_fn(require_session));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}
