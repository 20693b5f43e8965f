//! crates/skincheck_core/src/handoff.rs
//!
//! The one-shot mailbox that carries an analysis outcome from the scan flow to
//! the results view. At most one record is pending; publishing overwrites it
//! and consuming removes it, so a refresh never replays a stale result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{AnalysisResult, ImageDimensions, RiskLevel};
use crate::error::HandoffError;
use crate::ports::SlotStore;

pub const LAST_ANALYSIS_KEY: &str = "lastAnalysis";
pub const RESULTS_ROUTE: &str = "/results";
pub const SCAN_ROUTE: &str = "/scan";

//=========================================================================================
// "Impure" Stored Record
//=========================================================================================

/// The serialized slot contents. Every field is optional on read so that a
/// damaged record is reported as corrupt instead of failing to parse silently.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredAnalysis {
    risk_level: Option<String>,
    confidence: Option<f64>,
    prediction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
    #[serde(default)]
    image_info: Option<StoredImageInfo>,
    timestamp: Option<DateTime<Utc>>,
    image_ref: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredImageInfo {
    width: u32,
    height: u32,
}

impl StoredAnalysis {
    fn from_domain(result: &AnalysisResult) -> Self {
        Self {
            risk_level: Some(result.risk_level.as_str().to_string()),
            confidence: Some(result.confidence),
            prediction: Some(result.predicted_condition.clone()),
            warning: result.warning.clone(),
            image_info: result.image_dimensions.map(|d| StoredImageInfo {
                width: d.width,
                height: d.height,
            }),
            timestamp: Some(result.captured_at),
            image_ref: Some(result.origin_image_ref.clone()),
        }
    }

    fn to_domain(self) -> Result<AnalysisResult, HandoffError> {
        let risk_level = self
            .risk_level
            .ok_or_else(|| HandoffError::CorruptResult("missing risk level".to_string()))?
            .parse::<RiskLevel>()
            .map_err(HandoffError::CorruptResult)?;

        let confidence = self
            .confidence
            .ok_or_else(|| HandoffError::CorruptResult("missing confidence".to_string()))?;
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(HandoffError::CorruptResult(format!(
                "confidence {} is outside [0, 1]",
                confidence
            )));
        }

        let image_dimensions = self
            .image_info
            .filter(|info| info.width > 0 && info.height > 0)
            .map(|info| ImageDimensions {
                width: info.width,
                height: info.height,
            });

        Ok(AnalysisResult {
            risk_level,
            confidence,
            predicted_condition: self.prediction.unwrap_or_default(),
            warning: self.warning.filter(|w| !w.trim().is_empty()),
            captured_at: self.timestamp.unwrap_or_else(Utc::now),
            origin_image_ref: self.image_ref.unwrap_or_default(),
            image_dimensions,
        })
    }
}

//=========================================================================================
// The Mailbox
//=========================================================================================

/// A single-slot, single-writer/single-reader mailbox over a `SlotStore`.
#[derive(Clone)]
pub struct ResultMailbox {
    store: Arc<dyn SlotStore>,
}

impl ResultMailbox {
    pub fn new(store: Arc<dyn SlotStore>) -> Self {
        Self { store }
    }

    /// Writes `result` as the pending record, replacing any unread one.
    /// Returns the route the caller should navigate to.
    pub fn publish(&self, result: &AnalysisResult) -> Result<&'static str, HandoffError> {
        let record = serde_json::to_string(&StoredAnalysis::from_domain(result))
            .map_err(|e| HandoffError::CorruptResult(e.to_string()))?;
        self.store.set(LAST_ANALYSIS_KEY, &record)?;
        info!(
            "Published {} risk result for {}",
            result.risk_level, result.origin_image_ref
        );
        Ok(RESULTS_ROUTE)
    }

    /// Reads and clears the pending record.
    ///
    /// The slot is cleared even when the record turns out to be corrupt, so a
    /// damaged record is reported once and never replayed.
    pub fn consume(&self) -> Result<AnalysisResult, HandoffError> {
        let raw = self
            .store
            .take(LAST_ANALYSIS_KEY)?
            .ok_or(HandoffError::NoResultAvailable)?;

        let stored: StoredAnalysis = serde_json::from_str(&raw).map_err(|e| {
            warn!("Discarding unreadable analysis record: {}", e);
            HandoffError::CorruptResult(e.to_string())
        })?;

        stored.to_domain().inspect_err(|e| {
            warn!("Discarding invalid analysis record: {}", e);
        })
    }

    /// Whether a record is waiting, without consuming it.
    pub fn has_pending(&self) -> Result<bool, HandoffError> {
        Ok(self.store.get(LAST_ANALYSIS_KEY)?.is_some())
    }
}
