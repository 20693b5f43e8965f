//! services/api/src/web/protocol.rs
//!
//! Defines the JSON bodies exchanged between the browser client and the API
//! server, and how core errors are rendered as HTTP responses.

use axum::{http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skincheck_core::error::{AnalysisError, CaptureError, HandoffError, ImageError, ScanError};
use skincheck_core::handoff::SCAN_ROUTE;
use skincheck_core::ports::PortError;
use skincheck_core::results::ResultSummary;
use skincheck_core::uv::ProtectionAdvice;
use skincheck_core::{NearbyProvider, ReminderSchedule, UvCategory, UvReading};
use std::collections::BTreeMap;
use tracing::error;
use utoipa::ToSchema;

//=========================================================================================
// Error Bodies
//=========================================================================================

/// Every error response carries this body. `restart` names the route the client
/// should go back to when the failure cannot be fixed in place.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<String>,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            restart: None,
        }
    }

    pub fn with_restart(mut self, route: &str) -> Self {
        self.restart = Some(route.to_string());
        self
    }
}

pub type HandlerError = (StatusCode, Json<ErrorBody>);

pub fn failure(status: StatusCode, message: impl Into<String>) -> HandlerError {
    (status, Json(ErrorBody::new(message)))
}

pub fn scan_failure(e: &ScanError) -> HandlerError {
    match e {
        ScanError::NoImage => failure(StatusCode::BAD_REQUEST, e.to_string()),
        ScanError::Capture(CaptureError::NotReady) => failure(StatusCode::CONFLICT, e.to_string()),
        ScanError::Capture(_) => failure(StatusCode::BAD_REQUEST, e.to_string()),
        ScanError::Image(ImageError::UnsupportedType(_)) => {
            failure(StatusCode::UNSUPPORTED_MEDIA_TYPE, e.to_string())
        }
        ScanError::Image(ImageError::TooLarge { .. }) => {
            failure(StatusCode::PAYLOAD_TOO_LARGE, e.to_string())
        }
        ScanError::Image(ImageError::Empty) => failure(StatusCode::BAD_REQUEST, e.to_string()),
        ScanError::Analysis(AnalysisError::Timeout) => failure(
            StatusCode::GATEWAY_TIMEOUT,
            "Analysis took too long. Please try again.",
        ),
        ScanError::Analysis(AnalysisError::Rejected { .. })
        | ScanError::Analysis(AnalysisError::Malformed(_)) => {
            failure(StatusCode::BAD_GATEWAY, e.to_string())
        }
        ScanError::Analysis(AnalysisError::Unreachable(_)) => failure(
            StatusCode::SERVICE_UNAVAILABLE,
            "Analysis service is unreachable. Please try again.",
        ),
        ScanError::Handoff(handoff) => handoff_failure(handoff),
    }
}

pub fn handoff_failure(e: &HandoffError) -> HandlerError {
    match e {
        HandoffError::NoResultAvailable => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody::new("No analysis results found").with_restart(SCAN_ROUTE)),
        ),
        HandoffError::CorruptResult(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(
                ErrorBody::new("Stored analysis result could not be read")
                    .with_restart(SCAN_ROUTE),
            ),
        ),
        HandoffError::Storage(port) => port_failure(port),
    }
}

pub fn port_failure(e: &PortError) -> HandlerError {
    error!("Storage failure: {}", e);
    failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal storage error")
}

//=========================================================================================
// Health
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

//=========================================================================================
// Places
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, ToSchema)]
pub struct LocationDto {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDto {
    pub id: String,
    pub name: String,
    pub address: String,
    pub location: LocationDto,
    pub rating: f64,
    pub total_ratings: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_now: Option<bool>,
    #[serde(default)]
    pub opening_hours: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub distance_miles: f64,
}

impl From<NearbyProvider> for ProviderDto {
    fn from(p: NearbyProvider) -> Self {
        Self {
            id: p.id,
            name: p.name,
            address: p.address,
            location: LocationDto {
                lat: p.coordinates.lat,
                lng: p.coordinates.lng,
            },
            rating: p.rating,
            total_ratings: p.rating_count,
            phone: p.phone,
            website: p.website,
            open_now: p.open_now,
            opening_hours: p.weekly_hours,
            photo_url: p.photo_ref,
            distance_miles: p.distance_miles,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct PlacesResponse {
    pub results: Vec<ProviderDto>,
}

/// Coordinates arrive as raw strings so that a missing or garbled value can be
/// answered with the JSON error body instead of the framework's plain text.
#[derive(Deserialize, Debug, Default)]
pub struct CoordinatesQuery {
    pub lat: Option<String>,
    pub lng: Option<String>,
}

/// Coordinates plus the client's clock offset, in minutes east of UTC.
#[derive(Deserialize, Debug, Default)]
pub struct UvQuery {
    #[serde(flatten)]
    pub coordinates: CoordinatesQuery,
    #[serde(rename = "utcOffset")]
    pub utc_offset: Option<String>,
}

//=========================================================================================
// UV
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct AdviceDto {
    pub title: String,
    pub description: String,
}

impl From<ProtectionAdvice> for AdviceDto {
    fn from(a: ProtectionAdvice) -> Self {
        Self {
            title: a.title.to_string(),
            description: a.description.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UvResponse {
    pub uv_index: u8,
    pub location: String,
    /// Unix seconds.
    pub timestamp: i64,
    pub category: String,
    pub advice: Vec<AdviceDto>,
}

impl UvResponse {
    pub fn new(reading: UvReading, advice: Vec<ProtectionAdvice>) -> Self {
        Self {
            uv_index: reading.index,
            location: reading.location_label,
            timestamp: reading.observed_at.timestamp(),
            category: UvCategory::for_index(reading.index).label().to_string(),
            advice: advice.into_iter().map(AdviceDto::from).collect(),
        }
    }
}

//=========================================================================================
// Scan and Results
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, ToSchema)]
pub struct ImageInfoDto {
    pub width: u32,
    pub height: u32,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummaryDto {
    pub risk_level: String,
    pub headline: String,
    pub description: String,
    pub confidence_percent: u8,
    pub condition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub recommendations: Vec<String>,
    pub captured_at: DateTime<Utc>,
    pub image_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_info: Option<ImageInfoDto>,
}

impl From<ResultSummary> for ResultSummaryDto {
    fn from(s: ResultSummary) -> Self {
        Self {
            risk_level: s.risk_level.as_str().to_string(),
            headline: s.headline,
            description: s.description,
            confidence_percent: s.confidence_percent,
            condition: s.condition,
            warning: s.warning,
            recommendations: s.recommendations.into_iter().map(str::to_string).collect(),
            captured_at: s.captured_at,
            image_ref: s.image_ref,
            image_info: s.image_dimensions.map(|d| ImageInfoDto {
                width: d.width,
                height: d.height,
            }),
        }
    }
}

//=========================================================================================
// Preferences
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReminderDto {
    /// One of `1week`, `2weeks`, `1month`, `3months`.
    pub interval: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub next_due: DateTime<Utc>,
}

impl From<ReminderSchedule> for ReminderDto {
    fn from(r: ReminderSchedule) -> Self {
        Self {
            interval: r.interval.tag().to_string(),
            label: r.interval.label().to_string(),
            created_at: r.created_at,
            next_due: r.next_due(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ReminderRequest {
    pub interval: String,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesResponse {
    pub has_seen_photo_tips: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder: Option<ReminderDto>,
    pub seen_tooltips: BTreeMap<String, bool>,
}
