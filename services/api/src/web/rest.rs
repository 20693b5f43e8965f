//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the public REST endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::protocol::{
    failure, AdviceDto, CoordinatesQuery, ErrorBody, HandlerError, HealthResponse, ImageInfoDto,
    LocationDto, PlacesResponse, PreferencesResponse, ProviderDto, ReminderDto, ReminderRequest,
    ResultSummaryDto, UvQuery, UvResponse,
};
use crate::web::state::AppState;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::FixedOffset;
use skincheck_core::error::LookupError;
use skincheck_core::uv::protection_advice;
use skincheck_core::Coordinates;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::OpenApi;

const MAX_UTC_OFFSET_MINUTES: i32 = 18 * 60;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        places_handler,
        uv_handler,
        crate::web::scan::scan_handler,
        crate::web::scan::retry_handler,
        crate::web::scan::reset_handler,
        crate::web::scan::results_handler,
        crate::web::preferences::get_preferences_handler,
        crate::web::preferences::set_reminder_handler,
        crate::web::preferences::clear_reminder_handler,
        crate::web::preferences::photo_tips_handler,
        crate::web::preferences::tooltip_handler,
    ),
    components(
        schemas(
            ErrorBody, HealthResponse, LocationDto, ProviderDto, PlacesResponse, AdviceDto,
            UvResponse, ImageInfoDto, ResultSummaryDto, ReminderDto, ReminderRequest,
            PreferencesResponse
        )
    ),
    tags(
        (name = "Skin Check API", description = "Lesion screening, dermatologists and UV index.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// REST API Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// Find dermatologists near a location, nearest first.
#[utoipa::path(
    get,
    path = "/api/places",
    params(
        ("lat" = f64, Query, description = "Latitude in degrees."),
        ("lng" = f64, Query, description = "Longitude in degrees.")
    ),
    responses(
        (status = 200, description = "Providers sorted by distance", body = PlacesResponse),
        (status = 400, description = "Missing or invalid coordinates", body = ErrorBody),
        (status = 500, description = "Places service failure", body = ErrorBody)
    )
)]
pub async fn places_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<CoordinatesQuery>,
) -> Result<Json<PlacesResponse>, HandlerError> {
    let origin = parse_coordinates(&query)?;

    let lookup = app_state.providers.as_ref().ok_or_else(|| {
        error!("GOOGLE_MAPS_API_KEY is not configured");
        failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch places")
    })?;

    match lookup.lookup(origin).await {
        Ok(providers) => {
            info!("Returning {} nearby providers", providers.len());
            Ok(Json(PlacesResponse {
                results: providers.into_iter().map(ProviderDto::from).collect(),
            }))
        }
        Err(LookupError::LocationUnavailable) => Err(invalid_coordinates()),
        Err(e) => {
            error!("Error fetching places: {}", e);
            Err(failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch places"))
        }
    }
}

/// Estimate the current UV index. Never fails because of the weather service;
/// the client should poll again once `Cache-Control: max-age` has elapsed.
///
/// The time of day is taken at the location: from the weather service when it
/// reports an offset, else from `utcOffset`, else from solar time.
#[utoipa::path(
    get,
    path = "/api/uv",
    params(
        ("lat" = f64, Query, description = "Latitude in degrees."),
        ("lng" = f64, Query, description = "Longitude in degrees."),
        ("utcOffset" = Option<i32>, Query, description = "Client clock, minutes east of UTC.")
    ),
    responses(
        (status = 200, description = "UV estimate with protection advice", body = UvResponse),
        (status = 400, description = "Missing or invalid coordinates or offset", body = ErrorBody)
    )
)]
pub async fn uv_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<UvQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let at = parse_coordinates(&query.coordinates)?;
    let utc_offset = parse_utc_offset(query.utc_offset.as_deref())?;
    let reading = app_state.uv.lookup_in(at, utc_offset).await.map_err(|e| match e {
        LookupError::LocationUnavailable => invalid_coordinates(),
        other => failure(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    })?;

    let advice = protection_advice(reading.index);
    let max_age = format!("max-age={}", app_state.config.uv_refresh.as_secs());
    Ok((
        [(header::CACHE_CONTROL, max_age)],
        Json(UvResponse::new(reading, advice)),
    ))
}

//=========================================================================================
// Helper Functions
//=========================================================================================

fn parse_coordinates(query: &CoordinatesQuery) -> Result<Coordinates, HandlerError> {
    let present = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    let (Some(lat), Some(lng)) = (present(&query.lat), present(&query.lng)) else {
        return Err(failure(StatusCode::BAD_REQUEST, "Missing latitude or longitude"));
    };

    let (Ok(lat), Ok(lng)) = (lat.parse::<f64>(), lng.parse::<f64>()) else {
        return Err(invalid_coordinates());
    };
    Coordinates::new(lat, lng).ok_or_else(invalid_coordinates)
}

/// Minutes east of UTC, within the +/-18 hour range clocks can use.
fn parse_utc_offset(raw: Option<&str>) -> Result<Option<FixedOffset>, HandlerError> {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    raw.parse::<i32>()
        .ok()
        .filter(|minutes| minutes.abs() <= MAX_UTC_OFFSET_MINUTES)
        .and_then(|minutes| FixedOffset::east_opt(minutes * 60))
        .map(Some)
        .ok_or_else(|| failure(StatusCode::BAD_REQUEST, "Invalid utcOffset"))
}

fn invalid_coordinates() -> HandlerError {
    failure(StatusCode::BAD_REQUEST, "Invalid latitude or longitude")
}
