//! crates/skincheck_core/src/providers.rs
//!
//! Finds dermatology providers near a location, ranks them by great-circle
//! distance and pages through the ranked list on the client side.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{Coordinates, NearbyProvider};
use crate::error::LookupError;
use crate::geo::{haversine_miles, round_tenth};
use crate::ports::{PlaceCandidate, PlaceDetails, PlacesService};

pub const DEFAULT_SEARCH_RADIUS_METERS: u32 = 5000;
pub const PROVIDERS_PER_PAGE: usize = 5;

#[derive(Clone)]
pub struct NearbyProviderLookup {
    places: Arc<dyn PlacesService>,
    radius_meters: u32,
}

impl NearbyProviderLookup {
    pub fn new(places: Arc<dyn PlacesService>, radius_meters: u32) -> Self {
        Self {
            places,
            radius_meters,
        }
    }

    /// Returns providers sorted by ascending distance from `origin`.
    ///
    /// Detail lookups run concurrently. A failing detail lookup drops only that
    /// provider; the batch fails when the search fails or no detail succeeds.
    pub async fn lookup(&self, origin: Coordinates) -> Result<Vec<NearbyProvider>, LookupError> {
        let origin =
            Coordinates::new(origin.lat, origin.lng).ok_or(LookupError::LocationUnavailable)?;

        let candidates = self
            .places
            .nearby_dermatologists(origin, self.radius_meters)
            .await
            .map_err(|e| LookupError::UpstreamUnavailable(e.to_string()))?;
        if candidates.is_empty() {
            info!("No dermatologists found within {}m", self.radius_meters);
            return Ok(Vec::new());
        }

        let details = join_all(
            candidates
                .iter()
                .map(|candidate| self.places.place_details(&candidate.place_id)),
        )
        .await;

        let total = candidates.len();
        let mut providers: Vec<NearbyProvider> = candidates
            .into_iter()
            .zip(details)
            .filter_map(|(candidate, details)| match details {
                Ok(details) => Some(build_provider(origin, candidate, details)),
                Err(e) => {
                    warn!("Skipping place {}: {}", candidate.place_id, e);
                    None
                }
            })
            .collect();

        if providers.is_empty() {
            return Err(LookupError::UpstreamUnavailable(format!(
                "all {} place detail lookups failed",
                total
            )));
        }

        sort_by_distance(&mut providers);
        info!("Found {} of {} nearby dermatologists", providers.len(), total);
        Ok(providers)
    }
}

fn build_provider(
    origin: Coordinates,
    candidate: PlaceCandidate,
    details: PlaceDetails,
) -> NearbyProvider {
    NearbyProvider {
        distance_miles: round_tenth(haversine_miles(origin, candidate.location)),
        id: candidate.place_id,
        name: details.name,
        address: details.address,
        coordinates: candidate.location,
        rating: details.rating.unwrap_or(0.0),
        rating_count: details.total_ratings.unwrap_or(0),
        phone: details.phone,
        website: details.website,
        open_now: details.open_now,
        weekly_hours: details.weekday_text,
        photo_ref: details.photo_url,
    }
}

/// Stable ascending sort; NaN distances sink to the end.
pub fn sort_by_distance(providers: &mut [NearbyProvider]) {
    providers.sort_by(|a, b| {
        a.distance_miles
            .partial_cmp(&b.distance_miles)
            .unwrap_or_else(|| a.distance_miles.is_nan().cmp(&b.distance_miles.is_nan()))
    });
}

//=========================================================================================
// Client-side Pagination
//=========================================================================================

/// A fully materialised provider list revealed a page at a time.
#[derive(Debug, Clone)]
pub struct ProviderListing {
    providers: Vec<NearbyProvider>,
    page_size: usize,
    display_count: usize,
}

impl ProviderListing {
    pub fn new(providers: Vec<NearbyProvider>) -> Self {
        Self::with_page_size(providers, PROVIDERS_PER_PAGE)
    }

    pub fn with_page_size(providers: Vec<NearbyProvider>, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        Self {
            providers,
            page_size,
            display_count: page_size,
        }
    }

    pub fn visible(&self) -> &[NearbyProvider] {
        &self.providers[..self.display_count.min(self.providers.len())]
    }

    pub fn has_more(&self) -> bool {
        self.display_count < self.providers.len()
    }

    pub fn show_more(&mut self) -> &[NearbyProvider] {
        if self.has_more() {
            self.display_count += self.page_size;
        }
        self.visible()
    }

    pub fn total(&self) -> usize {
        self.providers.len()
    }

    /// Replaces the list wholesale and collapses back to the first page.
    pub fn refresh(&mut self, providers: Vec<NearbyProvider>) {
        self.providers = providers;
        self.display_count = self.page_size;
    }
}
