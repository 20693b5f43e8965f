//! crates/skincheck_core/src/analysis.rs
//!
//! Submits a captured image to the classifier with a client-side deadline.
//! There are no automatic retries; the caller decides whether to resubmit.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::domain::{CapturedImage, Classification};
use crate::error::AnalysisError;
use crate::ports::AnalysisService;

/// Deadline applied when none is configured.
pub const DEFAULT_ANALYSIS_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone)]
pub struct AnalysisClient {
    service: Arc<dyn AnalysisService>,
    timeout: Duration,
}

impl AnalysisClient {
    pub fn new(service: Arc<dyn AnalysisService>, timeout: Duration) -> Self {
        Self { service, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Classifies `image`, cancelling the in-flight request once the deadline passes.
    pub async fn analyze(&self, image: &CapturedImage) -> Result<Classification, AnalysisError> {
        info!(
            "Submitting {} for analysis ({} bytes, timeout {:?})",
            image.reference(),
            image.len(),
            self.timeout
        );

        let outcome = match tokio::time::timeout(self.timeout, self.service.classify(image)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(AnalysisError::Timeout),
        };

        match &outcome {
            Ok(c) => info!(
                "Analysis finished: {} risk, {:.2} confidence ({})",
                c.risk_level, c.confidence, c.predicted_condition
            ),
            Err(e) => warn!("Analysis of {} failed: {}", image.reference(), e),
        }
        outcome
    }
}
