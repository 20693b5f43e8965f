//! crates/skincheck_core/src/error.rs
//!
//! The error taxonomy surfaced to callers. Every variant is local and
//! recoverable by a user retry; none of them is fatal to the process.

use crate::ports::PortError;

/// Camera lifecycle failures.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Camera access was denied")]
    PermissionDenied,
    #[error("Camera is unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("Camera stream is not ready")]
    NotReady,
    #[error("Failed to encode the captured frame: {0}")]
    Encode(String),
}

/// Failures of the call to the external classifier.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Analysis took too long")]
    Timeout,
    /// The endpoint answered with a non-2xx status.
    #[error("{}", rejected_message(.status, .message))]
    Rejected { status: u16, message: Option<String> },
    #[error("Analysis service is unreachable: {0}")]
    Unreachable(String),
    /// The endpoint answered 2xx but the body did not match the expected schema.
    #[error("Analysis service returned an invalid response: {0}")]
    Malformed(String),
}

fn rejected_message(status: &u16, message: &Option<String>) -> String {
    match message {
        Some(message) => message.clone(),
        None => format!("HTTP error! status: {}", status),
    }
}

/// Failures when the results view reads the handoff slot.
#[derive(Debug, thiserror::Error)]
pub enum HandoffError {
    #[error("No analysis result is available")]
    NoResultAvailable,
    #[error("Stored analysis result is corrupt: {0}")]
    CorruptResult(String),
    #[error(transparent)]
    Storage(#[from] PortError),
}

/// Failures of the provider and weather lookups.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Location is unavailable")]
    LocationUnavailable,
    #[error("Upstream service is unavailable: {0}")]
    UpstreamUnavailable(String),
}

/// Rejections when normalizing an image from either origin.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Unsupported file type '{0}'; only images are accepted")]
    UnsupportedType(String),
    #[error("Image is {size} bytes, above the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },
    #[error("Image is empty")]
    Empty,
}

/// Everything a scan session can report back to the user.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("No image captured")]
    NoImage,
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Handoff(#[from] HandoffError),
}
