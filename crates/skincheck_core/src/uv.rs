//! crates/skincheck_core/src/uv.rs
//!
//! Estimates the current UV index from cloud cover and time of day, falling
//! back to a time-of-day heuristic whenever live weather is unavailable.

use chrono::{DateTime, FixedOffset, Offset, Timelike, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{Coordinates, UvCategory, UvReading};
use crate::error::LookupError;
use crate::ports::{PortError, WeatherService};

pub const MAX_UV_INDEX: u8 = 11;
pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(30 * 60);
const FALLBACK_LOCATION: &str = "Current Location";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayPart {
    Peak,
    Shoulder,
    Off,
}

fn day_part(hour: u32) -> DayPart {
    match hour {
        10..=16 => DayPart::Peak,
        7..=9 | 17..=19 => DayPart::Shoulder,
        _ => DayPart::Off,
    }
}

/// UV estimate scaled by cloud cover (percent, clamped to `0..=100`).
pub fn estimate_with_clouds(hour: u32, cloud_cover: f64) -> u8 {
    let base = match day_part(hour) {
        DayPart::Peak => 10.0,
        DayPart::Shoulder => 5.0,
        DayPart::Off => return 0,
    };
    let cover = if cloud_cover.is_finite() {
        cloud_cover.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let estimate = (base * (1.0 - cover / 100.0)).round();
    estimate.clamp(0.0, MAX_UV_INDEX as f64) as u8
}

/// UV estimate from the time of day alone.
pub fn estimate_from_time(hour: u32) -> u8 {
    match day_part(hour) {
        DayPart::Peak => 7,
        DayPart::Shoulder => 4,
        DayPart::Off => 0,
    }
}

//=========================================================================================
// Protection Advice
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtectionAdvice {
    pub title: &'static str,
    pub description: &'static str,
}

const PEAK_HOURS_ADVICE: ProtectionAdvice = ProtectionAdvice {
    title: "Peak Hours",
    description: "Limit sun exposure between 10am and 4pm",
};
const SUNSCREEN_ADVICE: ProtectionAdvice = ProtectionAdvice {
    title: "Sunscreen",
    description: "Apply SPF 30+ sunscreen every 2 hours",
};
const CLOTHING_ADVICE: ProtectionAdvice = ProtectionAdvice {
    title: "Protection",
    description: "Wear protective clothing, hat, and sunglasses",
};

pub fn protection_advice(index: u8) -> Vec<ProtectionAdvice> {
    match UvCategory::for_index(index) {
        UvCategory::Low => vec![SUNSCREEN_ADVICE],
        UvCategory::Moderate => vec![SUNSCREEN_ADVICE, CLOTHING_ADVICE],
        _ => vec![PEAK_HOURS_ADVICE, SUNSCREEN_ADVICE, CLOTHING_ADVICE],
    }
}

//=========================================================================================
// Lookup
//=========================================================================================

#[derive(Clone, Default)]
pub struct UvIndexLookup {
    weather: Option<Arc<dyn WeatherService>>,
}

impl UvIndexLookup {
    /// `None` means no weather provider is configured; every lookup uses the fallback.
    pub fn new(weather: Option<Arc<dyn WeatherService>>) -> Self {
        Self { weather }
    }

    /// Estimates the UV index at `at` right now, on the location's own clock.
    pub async fn lookup(&self, at: Coordinates) -> Result<UvReading, LookupError> {
        self.lookup_at(at, Utc::now(), None).await
    }

    /// Like [`lookup`](Self::lookup), with the caller's UTC offset used when
    /// the weather provider does not report one.
    pub async fn lookup_in(
        &self,
        at: Coordinates,
        utc_offset: Option<FixedOffset>,
    ) -> Result<UvReading, LookupError> {
        self.lookup_at(at, Utc::now(), utc_offset).await
    }

    /// Estimates the UV index at `at` for the instant `now`. Weather failures
    /// degrade to the time-of-day estimate and never surface.
    ///
    /// The hour of day is read at the offset the weather provider reports for
    /// the location, else at `utc_offset`, else at solar time for `at.lng`.
    pub async fn lookup_at(
        &self,
        at: Coordinates,
        now: DateTime<Utc>,
        utc_offset: Option<FixedOffset>,
    ) -> Result<UvReading, LookupError> {
        let at = Coordinates::new(at.lat, at.lng).ok_or(LookupError::LocationUnavailable)?;
        let fallback_offset = utc_offset.unwrap_or_else(|| solar_offset(at.lng));

        let Some(weather) = &self.weather else {
            debug!("No weather provider configured, using time-of-day UV estimate");
            return Ok(fallback_reading(now, fallback_offset));
        };

        match weather.current_conditions(at).await {
            Ok(conditions) => {
                let offset = conditions.utc_offset.unwrap_or(fallback_offset);
                let hour = now.with_timezone(&offset).hour();
                let index = estimate_with_clouds(hour, conditions.cloud_cover);
                info!(
                    "UV index {} from {:.0}% cloud cover at local hour {}",
                    index, conditions.cloud_cover, hour
                );
                Ok(UvReading {
                    index,
                    location_label: conditions
                        .location_name
                        .filter(|name| !name.trim().is_empty())
                        .unwrap_or_else(|| FALLBACK_LOCATION.to_string()),
                    observed_at: conditions.observed_at,
                })
            }
            Err(PortError::Unauthorized) => {
                warn!("Weather API key not authorized, using fallback UV estimate");
                Ok(fallback_reading(now, fallback_offset))
            }
            Err(e) => {
                warn!("Weather lookup failed, using fallback UV estimate: {}", e);
                Ok(fallback_reading(now, fallback_offset))
            }
        }
    }
}

/// Mean solar time offset for a longitude, 15 degrees per hour.
pub fn solar_offset(lng: f64) -> FixedOffset {
    let seconds = (lng.clamp(-180.0, 180.0) / 15.0 * 3600.0).round() as i32;
    FixedOffset::east_opt(seconds).unwrap_or_else(|| Utc.fix())
}

fn fallback_reading(now: DateTime<Utc>, offset: FixedOffset) -> UvReading {
    UvReading {
        index: estimate_from_time(now.with_timezone(&offset).hour()),
        location_label: FALLBACK_LOCATION.to_string(),
        observed_at: now,
    }
}

//=========================================================================================
// Periodic Refresh
//=========================================================================================

/// Re-runs a UV lookup on a fixed period while alive. Dropping it stops the task.
pub struct UvMonitor {
    readings: watch::Receiver<Option<UvReading>>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl UvMonitor {
    pub fn spawn(lookup: UvIndexLookup, at: Coordinates, period: Duration) -> Self {
        let (tx, readings) = watch::channel(None);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => match lookup.lookup(at).await {
                        Ok(reading) => {
                            tx.send_replace(Some(reading));
                        }
                        Err(e) => warn!("UV refresh failed: {}", e),
                    },
                }
            }
            debug!("UV monitor stopped");
        });

        Self {
            readings,
            cancel,
            task,
        }
    }

    /// The most recent reading, if any lookup has completed.
    pub fn latest(&self) -> Option<UvReading> {
        self.readings.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<UvReading>> {
        self.readings.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for UvMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeWeather, WeatherOutcome};
    use chrono::TimeZone;

    const HOME: Coordinates = Coordinates { lat: 34.0, lng: -118.0 };

    fn pacific() -> FixedOffset {
        FixedOffset::west_opt(7 * 3600).unwrap()
    }

    /// The instant a Pacific wall clock reads `hour`:15.
    fn at_hour(hour: u32) -> DateTime<Utc> {
        pacific()
            .with_ymd_and_hms(2024, 7, 1, hour, 15, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn cloud_adjusted_estimates() {
        assert_eq!(estimate_with_clouds(12, 0.0), 10);
        assert_eq!(estimate_with_clouds(12, 75.0), 3);
        assert_eq!(estimate_with_clouds(8, 0.0), 5);
        assert_eq!(estimate_with_clouds(18, 50.0), 3);
        assert_eq!(estimate_with_clouds(22, 0.0), 0);
    }

    #[test]
    fn time_of_day_estimates() {
        assert_eq!(estimate_from_time(10), 7);
        assert_eq!(estimate_from_time(16), 7);
        assert_eq!(estimate_from_time(7), 4);
        assert_eq!(estimate_from_time(19), 4);
        assert_eq!(estimate_from_time(20), 0);
        assert_eq!(estimate_from_time(3), 0);
    }

    #[test]
    fn estimates_stay_in_range_for_any_input() {
        for hour in 0..24 {
            assert!(estimate_from_time(hour) <= MAX_UV_INDEX);
            for cover in [-50.0, 0.0, 33.0, 100.0, 250.0, f64::NAN, f64::INFINITY] {
                assert!(estimate_with_clouds(hour, cover) <= MAX_UV_INDEX);
            }
        }
    }

    #[test]
    fn advice_grows_with_index() {
        assert_eq!(protection_advice(1), vec![SUNSCREEN_ADVICE]);
        assert_eq!(protection_advice(4).len(), 2);
        assert_eq!(protection_advice(9)[0].title, "Peak Hours");
    }

    #[tokio::test]
    async fn uses_live_cloud_cover() {
        let weather = FakeWeather::new(WeatherOutcome::Clouds(20.0));
        let lookup = UvIndexLookup::new(Some(Arc::new(weather)));

        let reading = lookup.lookup_at(HOME, at_hour(13), Some(pacific())).await.unwrap();
        assert_eq!(reading.index, 8);
        assert_eq!(reading.location_label, "Springfield");
    }

    #[tokio::test]
    async fn unauthorized_key_falls_back_to_time_of_day() {
        let weather = FakeWeather::new(WeatherOutcome::Unauthorized);
        let lookup = UvIndexLookup::new(Some(Arc::new(weather)));

        let reading = lookup.lookup_at(HOME, at_hour(13), Some(pacific())).await.unwrap();
        assert_eq!(reading.index, 7);
        assert_eq!(reading.location_label, "Current Location");
    }

    #[tokio::test]
    async fn upstream_failure_and_missing_provider_fall_back() {
        let failing = UvIndexLookup::new(Some(Arc::new(FakeWeather::new(WeatherOutcome::Failing))));
        assert_eq!(failing.lookup_at(HOME, at_hour(8), Some(pacific())).await.unwrap().index, 4);

        let unconfigured = UvIndexLookup::default();
        let reading = unconfigured.lookup_at(HOME, at_hour(23), Some(pacific())).await.unwrap();
        assert_eq!(reading.index, 0);
        assert_eq!(reading.observed_at, at_hour(23));
    }

    #[tokio::test]
    async fn invalid_coordinates_are_location_unavailable() {
        let err = UvIndexLookup::default()
            .lookup_at(Coordinates { lat: 120.0, lng: 0.0 }, at_hour(12), None)
            .await
            .unwrap_err();
        assert!(matches!(err, LookupError::LocationUnavailable));
    }

    #[tokio::test]
    async fn hour_comes_from_the_location_not_the_server() {
        const TOKYO: Coordinates = Coordinates { lat: 35.68, lng: 139.69 };
        const LOS_ANGELES: Coordinates = Coordinates { lat: 34.05, lng: -118.24 };
        let now = Utc.with_ymd_and_hms(2024, 7, 1, 2, 4, 0).unwrap();
        let lookup = UvIndexLookup::default();

        // 11:22 solar time in Tokyo, 18:11 the previous evening in Los Angeles.
        assert_eq!(lookup.lookup_at(TOKYO, now, None).await.unwrap().index, 7);
        assert_eq!(lookup.lookup_at(LOS_ANGELES, now, None).await.unwrap().index, 4);

        // A caller-supplied offset wins over solar time.
        let utc = FixedOffset::east_opt(0).unwrap();
        assert_eq!(lookup.lookup_at(TOKYO, now, Some(utc)).await.unwrap().index, 0);
    }

    #[tokio::test]
    async fn weather_reported_offset_wins() {
        let jst = FixedOffset::east_opt(9 * 3600).unwrap();
        let weather = FakeWeather::new(WeatherOutcome::Clouds(0.0)).with_utc_offset(jst);
        let lookup = UvIndexLookup::new(Some(Arc::new(weather)));
        let now = Utc.with_ymd_and_hms(2024, 7, 1, 2, 4, 0).unwrap();

        let reading = lookup.lookup_at(HOME, now, Some(pacific())).await.unwrap();
        assert_eq!(reading.index, 10);
    }

    #[test]
    fn solar_offsets_follow_longitude() {
        assert_eq!(solar_offset(0.0).local_minus_utc(), 0);
        assert_eq!(solar_offset(135.0).local_minus_utc(), 9 * 3600);
        assert_eq!(solar_offset(-75.0).local_minus_utc(), -5 * 3600);
        assert_eq!(solar_offset(180.0).local_minus_utc(), 12 * 3600);
    }

    #[tokio::test(start_paused = true)]
    async fn monitor_refreshes_on_its_period_until_dropped() {
        let weather = Arc::new(FakeWeather::new(WeatherOutcome::Clouds(0.0)));
        let lookup = UvIndexLookup::new(Some(weather.clone()));
        let monitor = UvMonitor::spawn(lookup, HOME, DEFAULT_REFRESH_PERIOD);
        let mut readings = monitor.subscribe();
        let started = tokio::time::Instant::now();

        readings.changed().await.unwrap();
        assert_eq!(weather.calls(), 1);
        assert!(monitor.latest().is_some());

        readings.changed().await.unwrap();
        assert_eq!(weather.calls(), 2);
        assert!(started.elapsed() >= DEFAULT_REFRESH_PERIOD);

        drop(monitor);
        tokio::time::sleep(DEFAULT_REFRESH_PERIOD * 4).await;
        assert_eq!(weather.calls(), 2);
    }
}
