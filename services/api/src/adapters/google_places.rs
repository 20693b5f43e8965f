//! services/api/src/adapters/google_places.rs
//!
//! This module contains the adapter for the Google Places web service.
//! It implements the `PlacesService` port from the `core` crate.

use async_trait::async_trait;
use serde::Deserialize;
use skincheck_core::domain::Coordinates;
use skincheck_core::ports::{PlaceCandidate, PlaceDetails, PlacesService, PortError, PortResult};
use tracing::{debug, warn};

pub const GOOGLE_PLACES_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";

const DETAIL_FIELDS: &str = "name,formatted_address,formatted_phone_number,website,\
                             opening_hours,photos,rating,user_ratings_total,geometry";
const PHOTO_MAX_WIDTH: u32 = 400;

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Debug, Deserialize)]
struct NearbySearchResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    place_id: String,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    result: Option<DetailsResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DetailsResult {
    name: String,
    formatted_address: String,
    formatted_phone_number: Option<String>,
    website: Option<String>,
    opening_hours: Option<OpeningHours>,
    photos: Vec<Photo>,
    rating: Option<f64>,
    user_ratings_total: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OpeningHours {
    open_now: Option<bool>,
    weekday_text: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    photo_reference: String,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct GooglePlacesAdapter {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GooglePlacesAdapter {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: GOOGLE_PLACES_BASE_URL.to_string(),
        }
    }

    /// Points the adapter at another host, e.g. a local stand-in.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn photo_url(&self, photo_reference: &str) -> String {
        format!(
            "{}/photo?maxwidth={}&photo_reference={}&key={}",
            self.base_url, PHOTO_MAX_WIDTH, photo_reference, self.api_key
        )
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> PortResult<T> {
        let response = self
            .client
            .get(format!("{}/{}", self.base_url, path))
            .query(query)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.without_url().to_string()))?
            .error_for_status()
            .map_err(|e| PortError::Unexpected(e.without_url().to_string()))?;

        response
            .json::<T>()
            .await
            .map_err(|e| PortError::Unexpected(e.without_url().to_string()))
    }
}

//=========================================================================================
// `PlacesService` Trait Implementation
//=========================================================================================

#[async_trait]
impl PlacesService for GooglePlacesAdapter {
    async fn nearby_dermatologists(
        &self,
        center: Coordinates,
        radius_meters: u32,
    ) -> PortResult<Vec<PlaceCandidate>> {
        debug!("Searching for dermatologists within {}m", radius_meters);
        let body: NearbySearchResponse = self
            .get_json(
                "nearbysearch/json",
                &[
                    ("location", format!("{},{}", center.lat, center.lng)),
                    ("radius", radius_meters.to_string()),
                    ("type", "doctor".to_string()),
                    ("keyword", "dermatologist".to_string()),
                    ("key", self.api_key.clone()),
                ],
            )
            .await?;

        match body.status.as_str() {
            "OK" | "ZERO_RESULTS" => {}
            "REQUEST_DENIED" => return Err(PortError::Unauthorized),
            other => {
                return Err(PortError::Unexpected(format!(
                    "nearby search returned {}: {}",
                    other,
                    body.error_message.unwrap_or_default()
                )))
            }
        }

        Ok(body
            .results
            .into_iter()
            .filter_map(|hit| {
                let point = &hit.geometry.location;
                let location = Coordinates::new(point.lat, point.lng);
                if location.is_none() {
                    warn!("Dropping place {} with invalid coordinates", hit.place_id);
                }
                location.map(|location| PlaceCandidate {
                    place_id: hit.place_id,
                    location,
                })
            })
            .collect())
    }

    async fn place_details(&self, place_id: &str) -> PortResult<PlaceDetails> {
        debug!("Fetching details for place {}", place_id);
        let body: DetailsResponse = self
            .get_json(
                "details/json",
                &[
                    ("place_id", place_id.to_string()),
                    ("fields", DETAIL_FIELDS.to_string()),
                    ("key", self.api_key.clone()),
                ],
            )
            .await?;

        match body.status.as_str() {
            "OK" => {}
            "NOT_FOUND" | "INVALID_REQUEST" => {
                return Err(PortError::NotFound(place_id.to_string()))
            }
            "REQUEST_DENIED" => return Err(PortError::Unauthorized),
            other => {
                return Err(PortError::Unexpected(format!(
                    "place details returned {}: {}",
                    other,
                    body.error_message.unwrap_or_default()
                )))
            }
        }

        let result = body
            .result
            .ok_or_else(|| PortError::NotFound(place_id.to_string()))?;
        let hours = result.opening_hours.unwrap_or_default();

        Ok(PlaceDetails {
            photo_url: result.photos.first().map(|p| self.photo_url(&p.photo_reference)),
            name: result.name,
            address: result.formatted_address,
            rating: result.rating,
            total_ratings: result.user_ratings_total,
            phone: result.formatted_phone_number,
            website: result.website,
            open_now: hours.open_now,
            weekday_text: hours.weekday_text,
        })
    }
}
