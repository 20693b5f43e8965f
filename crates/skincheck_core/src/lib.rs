pub mod analysis;
pub mod capture;
pub mod domain;
pub mod error;
pub mod geo;
pub mod handoff;
pub mod image_source;
pub mod ports;
pub mod preferences;
pub mod providers;
pub mod results;
pub mod scan;
pub mod store;
pub mod uv;

#[cfg(test)]
pub(crate) mod test_support;

pub use analysis::AnalysisClient;
pub use capture::{CaptureState, MediaCaptureController};
pub use domain::{
    AnalysisResult, CapturedImage, Classification, Coordinates, ImageDimensions, ImageOrigin,
    NearbyProvider, ReminderInterval, ReminderSchedule, RiskLevel, UvCategory, UvReading,
};
pub use error::{AnalysisError, CaptureError, HandoffError, ImageError, LookupError, ScanError};
pub use handoff::ResultMailbox;
pub use image_source::{ImageSource, UploadedFile};
pub use ports::{
    AnalysisService, MediaDevices, PlacesService, PortError, PortResult, SlotStore, WeatherService,
};
pub use preferences::Preferences;
pub use providers::{NearbyProviderLookup, ProviderListing};
pub use results::ResultSummary;
pub use scan::{ScanOutcome, ScanSession};
pub use store::{MemoryStore, NamespacedStore};
pub use uv::{UvIndexLookup, UvMonitor};
