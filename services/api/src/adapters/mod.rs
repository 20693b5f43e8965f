pub mod analysis_http;
pub mod file_store;
pub mod google_places;
pub mod openweather;

pub use analysis_http::HttpAnalysisAdapter;
pub use file_store::JsonFileStore;
pub use google_places::GooglePlacesAdapter;
pub use openweather::OpenWeatherAdapter;
