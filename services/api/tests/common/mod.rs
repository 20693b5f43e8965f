//! Shared helpers for the service integration tests.
#![allow(dead_code)]

use api_lib::config::Config;
use api_lib::web::{app_router, AppState};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use skincheck_core::domain::{CapturedImage, Classification, Coordinates, RiskLevel};
use skincheck_core::error::AnalysisError;
use skincheck_core::ports::{PlaceCandidate, PlaceDetails, PlacesService, PortError, PortResult};
use skincheck_core::{
    AnalysisClient, AnalysisService, MemoryStore, NearbyProviderLookup, UvIndexLookup,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use uuid::Uuid;

pub const BOUNDARY: &str = "skincheck-test-boundary";
pub const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xFF, 0xD9];

//=========================================================================================
// Upstreams and App Assembly
//=========================================================================================

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn_upstream(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub state: Arc<AppState>,
}

pub fn app(analysis: Arc<dyn AnalysisService>) -> TestApp {
    app_with(Config::default(), analysis, None)
}

pub fn app_with(
    config: Config,
    analysis: Arc<dyn AnalysisService>,
    places: Option<Arc<dyn PlacesService>>,
) -> TestApp {
    let config = Arc::new(config);
    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(AppState::new(
        config.clone(),
        store.clone(),
        AnalysisClient::new(analysis, config.analysis_timeout),
        places.map(|p| NearbyProviderLookup::new(p, config.places_radius_meters)),
        UvIndexLookup::default(),
    ));
    let router = app_router(state.clone()).unwrap();
    TestApp {
        router,
        store,
        state,
    }
}

//=========================================================================================
// Requests and Responses
//=========================================================================================

pub fn multipart_body(field: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(
    session: Uuid,
    file_name: &str,
    content_type: &str,
    bytes: &[u8],
) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/scan")
        .header("x-session-id", session.to_string())
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body("file", file_name, content_type, bytes)))
        .unwrap()
}

pub fn session_request(method: Method, uri: &str, session: Uuid) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-session-id", session.to_string())
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(
    method: Method,
    uri: &str,
    session: Uuid,
    json: serde_json::Value,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-session-id", session.to_string())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

//=========================================================================================
// Port Fakes
//=========================================================================================

pub fn classification(risk_level: RiskLevel, confidence: f64, condition: &str) -> Classification {
    Classification {
        risk_level,
        confidence,
        predicted_condition: condition.to_string(),
        warning: None,
    }
}

/// Holds analysis calls until the test releases them.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

/// Answers from a queue, then with a high-risk melanoma verdict. The first
/// `stalls` calls hang for a minute so the client deadline fires first.
#[derive(Default)]
pub struct StubAnalysis {
    replies: Mutex<VecDeque<Result<Classification, AnalysisError>>>,
    stalls: AtomicUsize,
    calls: AtomicUsize,
    seen_sizes: Mutex<Vec<usize>>,
    gate: Option<Arc<Gate>>,
}

impl StubAnalysis {
    pub fn replying(replies: Vec<Result<Classification, AnalysisError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    pub fn stalling(stalls: usize) -> Self {
        Self {
            stalls: AtomicUsize::new(stalls),
            ..Self::default()
        }
    }

    pub fn gated(gate: Arc<Gate>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_sizes(&self) -> Vec<usize> {
        self.seen_sizes.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisService for StubAnalysis {
    async fn classify(&self, image: &CapturedImage) -> Result<Classification, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_sizes.lock().unwrap().push(image.len());

        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        let stalled = self
            .stalls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if stalled {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }

        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(classification(RiskLevel::High, 0.87, "Melanoma")))
    }
}

/// A places service backed by a fixed table. Ids listed in `broken` fail their
/// detail lookup.
#[derive(Default)]
pub struct TablePlaces {
    pub places: Vec<(PlaceCandidate, PlaceDetails)>,
    pub broken: Vec<String>,
}

impl TablePlaces {
    pub fn with(mut self, id: &str, name: &str, lat: f64, lng: f64) -> Self {
        self.places.push((
            PlaceCandidate {
                place_id: id.to_string(),
                location: Coordinates::new(lat, lng).unwrap(),
            },
            PlaceDetails {
                name: name.to_string(),
                address: format!("{} Main St", name),
                rating: Some(4.5),
                total_ratings: Some(12),
                ..PlaceDetails::default()
            },
        ));
        self
    }

    pub fn broken(mut self, id: &str) -> Self {
        self.broken.push(id.to_string());
        self
    }
}

#[async_trait]
impl PlacesService for TablePlaces {
    async fn nearby_dermatologists(
        &self,
        _center: Coordinates,
        _radius: u32,
    ) -> PortResult<Vec<PlaceCandidate>> {
        Ok(self.places.iter().map(|(c, _)| c.clone()).collect())
    }

    async fn place_details(&self, place_id: &str) -> PortResult<PlaceDetails> {
        if self.broken.iter().any(|b| b == place_id) {
            return Err(PortError::Unexpected("details unavailable".to_string()));
        }
        let table: HashMap<&str, &PlaceDetails> = self
            .places
            .iter()
            .map(|(c, d)| (c.place_id.as_str(), d))
            .collect();
        table
            .get(place_id)
            .map(|d| (*d).clone())
            .ok_or_else(|| PortError::NotFound(place_id.to_string()))
    }
}
