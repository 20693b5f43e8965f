//! crates/skincheck_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the camera, the storage medium and the remote services.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};

use crate::domain::{CapturedImage, Classification, Coordinates};
use crate::error::AnalysisError;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., storage, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Slot Storage
//=========================================================================================

/// A string key/value store with page-local persistence semantics.
///
/// `take` must read and remove in one step so a value is observed by at most
/// one reader, and `set` must replace the whole value so no reader ever sees a
/// partially written record.
pub trait SlotStore: Send + Sync {
    fn get(&self, key: &str) -> PortResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> PortResult<()>;
    fn take(&self, key: &str) -> PortResult<Option<String>>;
    fn remove(&self, key: &str) -> PortResult<()>;
}

//=========================================================================================
// Camera Devices
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    /// Front camera.
    User,
    /// Rear camera.
    Environment,
}

/// Requested stream shape. Width and height are hints, not requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConstraints {
    pub facing: FacingMode,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl StreamConstraints {
    pub fn facing(facing: FacingMode) -> Self {
        Self {
            facing,
            ..Self::default()
        }
    }
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self {
            facing: FacingMode::Environment,
            ideal_width: 1920,
            ideal_height: 1080,
        }
    }
}

/// How much media a stream has buffered, mirroring the HTML media ready states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

/// One decoded video frame as tightly packed RGB8.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

/// Why a device refused to hand out a stream.
#[derive(Debug, thiserror::Error)]
pub enum MediaAccessError {
    #[error("access to the camera was not allowed")]
    NotAllowed,
    #[error("no camera matches the requested constraints")]
    NotFound,
    #[error("camera error: {0}")]
    Other(String),
}

/// A live video stream bound to a surface.
pub trait MediaStream: Send {
    fn ready_state(&self) -> ReadyState;

    /// Native resolution of the stream, once metadata has loaded.
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// Grabs the current frame at native resolution.
    fn grab_frame(&mut self) -> PortResult<RawFrame>;

    /// Stops every track. Must be safe to call more than once.
    fn stop_all_tracks(&mut self);

    fn active_tracks(&self) -> usize;
}

#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Requests a live video stream matching the constraints.
    async fn get_user_media(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn MediaStream>, MediaAccessError>;
}

//=========================================================================================
// Remote Services
//=========================================================================================

#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Submits an image to the classifier and returns its validated verdict.
    async fn classify(&self, image: &CapturedImage) -> Result<Classification, AnalysisError>;
}

/// A search hit before its details are fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceCandidate {
    pub place_id: String,
    pub location: Coordinates,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceDetails {
    pub name: String,
    pub address: String,
    pub rating: Option<f64>,
    pub total_ratings: Option<u32>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub open_now: Option<bool>,
    pub weekday_text: Vec<String>,
    pub photo_url: Option<String>,
}

#[async_trait]
pub trait PlacesService: Send + Sync {
    /// Finds dermatology providers within `radius_meters` of `center`.
    async fn nearby_dermatologists(
        &self,
        center: Coordinates,
        radius_meters: u32,
    ) -> PortResult<Vec<PlaceCandidate>>;

    async fn place_details(&self, place_id: &str) -> PortResult<PlaceDetails>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherConditions {
    /// Cloud cover percentage, `0..=100`.
    pub cloud_cover: f64,
    pub location_name: Option<String>,
    pub observed_at: DateTime<Utc>,
    /// The location's offset from UTC, when the provider reports one.
    pub utc_offset: Option<FixedOffset>,
}

#[async_trait]
pub trait WeatherService: Send + Sync {
    /// Reads current conditions. `PortError::Unauthorized` signals a rejected key.
    async fn current_conditions(&self, at: Coordinates) -> PortResult<WeatherConditions>;
}
