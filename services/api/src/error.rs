//! services/api/src/error.rs
//!
//! Startup and top-level failures of the screening API service. Request-level
//! failures never reach this type; handlers map them to HTTP responses.

use crate::config::ConfigError;
use skincheck_core::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The slot store could not be opened or read at startup.
    #[error("Storage error: {0}")]
    Storage(#[from] PortError),

    /// The shared outbound client could not be built (TLS backend init).
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}
