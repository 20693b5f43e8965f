//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub analysis_endpoint: String,
    pub analysis_timeout: Duration,
    pub max_upload_bytes: usize,
    pub google_maps_api_key: Option<String>,
    pub openweather_api_key: Option<String>,
    pub places_radius_meters: u32,
    pub uv_refresh: Duration,
    /// Scan sessions unused for this long are dropped with their held image.
    pub session_idle_timeout: Duration,
    pub storage_path: Option<PathBuf>,
    pub cors_origin: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            log_level: Level::INFO,
            analysis_endpoint: "http://localhost:8000/analyze".to_string(),
            analysis_timeout: Duration::from_millis(15_000),
            max_upload_bytes: 10 * 1024 * 1024,
            google_maps_api_key: None,
            openweather_api_key: None,
            places_radius_meters: 5000,
            uv_refresh: Duration::from_secs(30 * 60),
            session_idle_timeout: Duration::from_secs(30 * 60),
            storage_path: None,
            cors_origin: "http://localhost:3000".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // --- Server Settings ---
        let bind_address = parse_or(&var, "BIND_ADDRESS", defaults.bind_address)?;

        let log_level = match var("RUST_LOG") {
            Some(raw) => raw.parse::<Level>().map_err(|_| {
                ConfigError::InvalidValue(
                    "RUST_LOG".to_string(),
                    format!("'{}' is not a valid log level", raw),
                )
            })?,
            None => defaults.log_level,
        };

        // --- Analysis Endpoint ---
        let analysis_endpoint = var("ANALYSIS_ENDPOINT").unwrap_or(defaults.analysis_endpoint);
        if !analysis_endpoint.starts_with("http://") && !analysis_endpoint.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "ANALYSIS_ENDPOINT".to_string(),
                format!("'{}' is not an http(s) URL", analysis_endpoint),
            ));
        }
        let timeout_ms: u64 = parse_or(&var, "ANALYSIS_TIMEOUT_MS", 15_000)?;
        let max_upload_bytes = parse_or(&var, "MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?;

        // --- Load API Keys (as optional) ---
        let google_maps_api_key = var("GOOGLE_MAPS_API_KEY");
        let openweather_api_key = var("OPENWEATHER_API_KEY");

        // --- Lookup Settings ---
        let places_radius_meters =
            parse_or(&var, "PLACES_RADIUS_METERS", defaults.places_radius_meters)?;
        let uv_refresh_minutes: u64 = parse_or(&var, "UV_REFRESH_MINUTES", 30)?;
        if uv_refresh_minutes == 0 {
            return Err(ConfigError::InvalidValue(
                "UV_REFRESH_MINUTES".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        // --- Session Settings ---
        let session_idle_minutes: u64 = parse_or(&var, "SESSION_IDLE_MINUTES", 30)?;
        if session_idle_minutes == 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_IDLE_MINUTES".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let storage_path = var("STORAGE_PATH").map(PathBuf::from);
        let cors_origin = var("CORS_ORIGIN").unwrap_or(defaults.cors_origin);

        Ok(Self {
            bind_address,
            log_level,
            analysis_endpoint,
            analysis_timeout: Duration::from_millis(timeout_ms),
            max_upload_bytes,
            google_maps_api_key,
            openweather_api_key,
            places_radius_meters,
            uv_refresh: Duration::from_secs(uv_refresh_minutes * 60),
            session_idle_timeout: Duration::from_secs(session_idle_minutes * 60),
            storage_path,
            cors_origin,
        })
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}
