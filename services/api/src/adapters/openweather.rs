//! services/api/src/adapters/openweather.rs
//!
//! This module contains the adapter for the OpenWeather current-weather API.
//! It implements the `WeatherService` port from the `core` crate. Only cloud
//! cover, the place name and the location's UTC offset are read; the UV
//! estimate itself lives in core.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use skincheck_core::domain::Coordinates;
use skincheck_core::ports::{PortError, PortResult, WeatherConditions, WeatherService};
use tracing::debug;

pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    #[serde(default)]
    clouds: Option<Clouds>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    dt: Option<i64>,
    /// Shift from UTC in seconds at the requested location.
    #[serde(default)]
    timezone: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct Clouds {
    #[serde(default)]
    all: f64,
}

#[derive(Clone)]
pub struct OpenWeatherAdapter {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenWeatherAdapter {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: OPENWEATHER_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl WeatherService for OpenWeatherAdapter {
    async fn current_conditions(&self, at: Coordinates) -> PortResult<WeatherConditions> {
        let response = self
            .client
            .get(format!("{}/weather", self.base_url))
            .query(&[
                ("lat", at.lat.to_string()),
                ("lon", at.lng.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.without_url().to_string()))?;

        // A freshly issued key answers 401 until it is activated.
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(PortError::Unauthorized);
        }
        if !response.status().is_success() {
            return Err(PortError::Unexpected(format!(
                "Weather API request failed: {}",
                response.status().as_u16()
            )));
        }

        let body: CurrentWeather = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.without_url().to_string()))?;
        debug!("Weather for {:?}: {:?}", body.name, body.clouds);

        Ok(WeatherConditions {
            cloud_cover: body.clouds.map_or(0.0, |c| c.all).clamp(0.0, 100.0),
            location_name: body.name,
            observed_at: body
                .dt
                .and_then(|dt| DateTime::from_timestamp(dt, 0))
                .unwrap_or_else(Utc::now),
            utc_offset: body.timezone.and_then(FixedOffset::east_opt),
        })
    }
}
