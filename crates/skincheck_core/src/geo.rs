//! crates/skincheck_core/src/geo.rs

use crate::domain::Coordinates;

/// Mean Earth radius in miles.
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Great-circle distance between two points using the Haversine formula.
pub fn haversine_miles(from: Coordinates, to: Coordinates) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + from.lat.to_radians().cos() * to.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_MILES * c
}

/// Rounds a distance to one decimal place for display and ranking.
pub fn round_tenth(miles: f64) -> f64 {
    (miles * 10.0).round() / 10.0
}
