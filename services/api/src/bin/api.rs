//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{GooglePlacesAdapter, HttpAnalysisAdapter, JsonFileStore, OpenWeatherAdapter},
    config::Config,
    error::ApiError,
    web::{app_router, AppState},
};
use skincheck_core::{
    AnalysisClient, MemoryStore, NearbyProviderLookup, PlacesService, SlotStore, UvIndexLookup,
    WeatherService,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Open Slot Storage ---
    let store: Arc<dyn SlotStore> = match &config.storage_path {
        Some(path) => {
            info!("Persisting slots to {}", path.display());
            Arc::new(JsonFileStore::open(path)?)
        }
        None => {
            info!("No STORAGE_PATH set, slots are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };

    // --- 3. Initialize Service Adapters ---
    let http = reqwest::Client::builder().build()?;

    let analysis_adapter = Arc::new(HttpAnalysisAdapter::new(
        http.clone(),
        config.analysis_endpoint.clone(),
    ));
    let analysis = AnalysisClient::new(analysis_adapter, config.analysis_timeout);
    info!("Analysis endpoint: {}", config.analysis_endpoint);

    let providers = match &config.google_maps_api_key {
        Some(key) => {
            let places: Arc<dyn PlacesService> =
                Arc::new(GooglePlacesAdapter::new(http.clone(), key.clone()));
            Some(NearbyProviderLookup::new(places, config.places_radius_meters))
        }
        None => {
            warn!("GOOGLE_MAPS_API_KEY is not set; /api/places will answer 500");
            None
        }
    };

    let weather = config.openweather_api_key.as_ref().map(|key| {
        Arc::new(OpenWeatherAdapter::new(http.clone(), key.clone())) as Arc<dyn WeatherService>
    });
    if weather.is_none() {
        warn!("OPENWEATHER_API_KEY is not set; UV index uses the time-of-day estimate");
    }
    let uv = UvIndexLookup::new(weather);

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(config.clone(), store, analysis, providers, uv));

    // --- 5. Create the Web Router ---
    let app = app_router(app_state)?;

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .map_err(|source| ApiError::Bind {
            address: config.bind_address.to_string(),
            source,
        })?;
    axum::serve(listener, app).await?;

    Ok(())
}
