//! In-memory fakes for every port, shared by the unit tests of this crate.

use async_trait::async_trait;
use chrono::{FixedOffset, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::domain::{CapturedImage, Classification, Coordinates, RiskLevel};
use crate::error::AnalysisError;
use crate::ports::{
    AnalysisService, MediaAccessError, MediaDevices, MediaStream, PlaceCandidate, PlaceDetails,
    PlacesService, PortError, PortResult, RawFrame, ReadyState, StreamConstraints,
    WeatherConditions, WeatherService,
};

//=========================================================================================
// Camera
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraOutcome {
    Grant,
    Deny,
    Missing,
}

/// How the fake stream misbehaves when a frame is grabbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFault {
    GrabFails,
    /// The pixel buffer is shorter than the reported dimensions.
    Truncated,
}

pub struct FakeCamera {
    pub outcome: CameraOutcome,
    pub ready: ReadyState,
    pub frame_fault: Option<FrameFault>,
    pub width: u32,
    pub height: u32,
    pub live_tracks: Arc<AtomicUsize>,
    pub requests: Arc<Mutex<Vec<StreamConstraints>>>,
}

impl FakeCamera {
    pub fn granting() -> Self {
        Self {
            outcome: CameraOutcome::Grant,
            ready: ReadyState::HaveEnoughData,
            frame_fault: None,
            width: 64,
            height: 48,
            live_tracks: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_outcome(outcome: CameraOutcome) -> Self {
        Self {
            outcome,
            ..Self::granting()
        }
    }

    pub fn with_ready_state(ready: ReadyState) -> Self {
        Self {
            ready,
            ..Self::granting()
        }
    }

    pub fn with_frame_fault(fault: FrameFault) -> Self {
        Self {
            frame_fault: Some(fault),
            ..Self::granting()
        }
    }

    pub fn live_tracks(&self) -> Arc<AtomicUsize> {
        self.live_tracks.clone()
    }
}

struct FakeStream {
    ready: ReadyState,
    frame_fault: Option<FrameFault>,
    width: u32,
    height: u32,
    tracks: usize,
    live_tracks: Arc<AtomicUsize>,
}

impl MediaStream for FakeStream {
    fn ready_state(&self) -> ReadyState {
        self.ready
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        (self.ready >= ReadyState::HaveMetadata).then_some((self.width, self.height))
    }

    fn grab_frame(&mut self) -> PortResult<RawFrame> {
        if self.tracks == 0 {
            return Err(PortError::Unexpected("stream stopped".to_string()));
        }
        if self.frame_fault == Some(FrameFault::GrabFails) {
            return Err(PortError::Unexpected("device disconnected".to_string()));
        }
        let mut rgb = Vec::with_capacity((self.width * self.height * 3) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                rgb.extend_from_slice(&[(x * 4) as u8, (y * 5) as u8, 128]);
            }
        }
        if self.frame_fault == Some(FrameFault::Truncated) {
            rgb.truncate(rgb.len() / 2);
        }
        Ok(RawFrame {
            width: self.width,
            height: self.height,
            rgb,
        })
    }

    fn stop_all_tracks(&mut self) {
        if self.tracks > 0 {
            self.live_tracks.fetch_sub(self.tracks, Ordering::SeqCst);
            self.tracks = 0;
        }
    }

    fn active_tracks(&self) -> usize {
        self.tracks
    }
}

#[async_trait]
impl MediaDevices for FakeCamera {
    async fn get_user_media(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn MediaStream>, MediaAccessError> {
        self.requests.lock().unwrap().push(*constraints);
        match self.outcome {
            CameraOutcome::Deny => Err(MediaAccessError::NotAllowed),
            CameraOutcome::Missing => Err(MediaAccessError::NotFound),
            CameraOutcome::Grant => {
                self.live_tracks.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(FakeStream {
                    ready: self.ready,
                    frame_fault: self.frame_fault,
                    width: self.width,
                    height: self.height,
                    tracks: 1,
                    live_tracks: self.live_tracks.clone(),
                }))
            }
        }
    }
}

//=========================================================================================
// Analysis
//=========================================================================================

pub fn classification(risk_level: RiskLevel, confidence: f64, condition: &str) -> Classification {
    Classification {
        risk_level,
        confidence,
        predicted_condition: condition.to_string(),
        warning: None,
    }
}

/// Replays queued outcomes in order, then falls back to a high-risk verdict.
#[derive(Default)]
pub struct ScriptedAnalysis {
    responses: Mutex<VecDeque<Result<Classification, AnalysisError>>>,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
    pub seen_sizes: Mutex<Vec<usize>>,
}

impl ScriptedAnalysis {
    pub fn new(responses: Vec<Result<Classification, AnalysisError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisService for ScriptedAnalysis {
    async fn classify(&self, image: &CapturedImage) -> Result<Classification, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_sizes.lock().unwrap().push(image.len());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(classification(RiskLevel::High, 0.87, "Melanoma")))
    }
}

//=========================================================================================
// Places
//=========================================================================================

#[derive(Default)]
pub struct FakePlaces {
    pub candidates: Vec<PlaceCandidate>,
    pub details: HashMap<String, PlaceDetails>,
    pub search_fails: bool,
}

impl FakePlaces {
    pub fn add(&mut self, id: &str, lat: f64, lng: f64) {
        self.candidates.push(PlaceCandidate {
            place_id: id.to_string(),
            location: Coordinates { lat, lng },
        });
        self.details.insert(
            id.to_string(),
            PlaceDetails {
                name: format!("Clinic {}", id),
                address: format!("{} Main St", id),
                rating: Some(4.5),
                total_ratings: Some(10),
                ..PlaceDetails::default()
            },
        );
    }

    /// Adds a candidate whose detail lookup fails.
    pub fn add_broken(&mut self, id: &str, lat: f64, lng: f64) {
        self.candidates.push(PlaceCandidate {
            place_id: id.to_string(),
            location: Coordinates { lat, lng },
        });
    }
}

#[async_trait]
impl PlacesService for FakePlaces {
    async fn nearby_dermatologists(
        &self,
        _center: Coordinates,
        _radius_meters: u32,
    ) -> PortResult<Vec<PlaceCandidate>> {
        if self.search_fails {
            return Err(PortError::Unexpected("search failed".to_string()));
        }
        Ok(self.candidates.clone())
    }

    async fn place_details(&self, place_id: &str) -> PortResult<PlaceDetails> {
        self.details
            .get(place_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(place_id.to_string()))
    }
}

//=========================================================================================
// Weather
//=========================================================================================

pub enum WeatherOutcome {
    Clouds(f64),
    Unauthorized,
    Failing,
}

pub struct FakeWeather {
    pub outcome: WeatherOutcome,
    pub utc_offset: Option<FixedOffset>,
    pub calls: AtomicUsize,
}

impl FakeWeather {
    pub fn new(outcome: WeatherOutcome) -> Self {
        Self {
            outcome,
            utc_offset: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = Some(offset);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherService for FakeWeather {
    async fn current_conditions(&self, _at: Coordinates) -> PortResult<WeatherConditions> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.outcome {
            WeatherOutcome::Clouds(cloud_cover) => Ok(WeatherConditions {
                cloud_cover,
                location_name: Some("Springfield".to_string()),
                observed_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
                utc_offset: self.utc_offset,
            }),
            WeatherOutcome::Unauthorized => Err(PortError::Unauthorized),
            WeatherOutcome::Failing => Err(PortError::Unexpected("503".to_string())),
        }
    }
}
