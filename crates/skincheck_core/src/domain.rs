//! crates/skincheck_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any transport or storage format; the
//! serialized shapes live next to the adapters and the mailbox that own them.

use bytes::Bytes;
use chrono::{DateTime, Duration, Months, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Captured Images
//=========================================================================================

/// Where a still image came from. Downstream code never branches on this;
/// it is kept for logging and the result record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOrigin {
    Capture,
    Upload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Encoded still image bytes owned by exactly one scan session.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub id: Uuid,
    pub bytes: Bytes,
    pub content_type: String,
    pub dimensions: Option<ImageDimensions>,
    pub origin: ImageOrigin,
    pub created_at: DateTime<Utc>,
}

impl CapturedImage {
    /// The opaque reference handed to the results view.
    pub fn reference(&self) -> String {
        format!("image:{}", self.id)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

//=========================================================================================
// Analysis
//=========================================================================================

/// Coarse three-bucket classification returned by the external classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    /// Capitalised label, e.g. `High`.
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            other => Err(format!("unknown risk level '{}'", other)),
        }
    }
}

/// A validated classification as received from the analysis endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub risk_level: RiskLevel,
    /// Always finite and within `[0, 1]`.
    pub confidence: f64,
    pub predicted_condition: String,
    pub warning: Option<String>,
}

/// The outcome of one scan, as handed from the scan flow to the results view.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub predicted_condition: String,
    pub warning: Option<String>,
    pub captured_at: DateTime<Utc>,
    pub origin_image_ref: String,
    pub image_dimensions: Option<ImageDimensions>,
}

impl AnalysisResult {
    pub fn from_classification(classification: Classification, image: &CapturedImage) -> Self {
        Self {
            risk_level: classification.risk_level,
            confidence: classification.confidence,
            predicted_condition: classification.predicted_condition,
            warning: classification.warning,
            captured_at: Utc::now(),
            origin_image_ref: image.reference(),
            image_dimensions: image.dimensions,
        }
    }
}

//=========================================================================================
// Reminders
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderInterval {
    OneWeek,
    TwoWeeks,
    OneMonth,
    ThreeMonths,
}

impl ReminderInterval {
    pub const ALL: [ReminderInterval; 4] = [
        ReminderInterval::OneWeek,
        ReminderInterval::TwoWeeks,
        ReminderInterval::OneMonth,
        ReminderInterval::ThreeMonths,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            ReminderInterval::OneWeek => "1week",
            ReminderInterval::TwoWeeks => "2weeks",
            ReminderInterval::OneMonth => "1month",
            ReminderInterval::ThreeMonths => "3months",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReminderInterval::OneWeek => "1 Week",
            ReminderInterval::TwoWeeks => "2 Weeks",
            ReminderInterval::OneMonth => "1 Month",
            ReminderInterval::ThreeMonths => "3 Months",
        }
    }

    /// Adds this interval to `from`. Calendar months clamp to the end of the month.
    pub fn add_to(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        let shifted = match self {
            ReminderInterval::OneWeek => from.checked_add_signed(Duration::weeks(1)),
            ReminderInterval::TwoWeeks => from.checked_add_signed(Duration::weeks(2)),
            ReminderInterval::OneMonth => from.checked_add_months(Months::new(1)),
            ReminderInterval::ThreeMonths => from.checked_add_months(Months::new(3)),
        };
        shifted.unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl FromStr for ReminderInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReminderInterval::ALL
            .into_iter()
            .find(|interval| interval.tag() == s)
            .ok_or_else(|| format!("unknown reminder interval '{}'", s))
    }
}

/// The single active reminder. Setting a new one replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderSchedule {
    pub interval: ReminderInterval,
    pub created_at: DateTime<Utc>,
}

impl ReminderSchedule {
    pub fn next_due(&self) -> DateTime<Utc> {
        self.interval.add_to(self.created_at)
    }
}

//=========================================================================================
// Location, Providers and UV
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Returns `None` unless both components are finite and within WGS84 bounds.
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        valid.then_some(Self { lat, lng })
    }
}

/// A nearby dermatology provider. Read-only once built; refreshed wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyProvider {
    pub id: String,
    pub name: String,
    pub address: String,
    pub coordinates: Coordinates,
    pub rating: f64,
    pub rating_count: u32,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub open_now: Option<bool>,
    pub weekly_hours: Vec<String>,
    pub photo_ref: Option<String>,
    pub distance_miles: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UvReading {
    /// Always within `0..=11`.
    pub index: u8,
    pub location_label: String,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UvCategory {
    Low,
    Moderate,
    High,
    VeryHigh,
    Extreme,
}

impl UvCategory {
    pub fn for_index(index: u8) -> Self {
        match index {
            0..=2 => UvCategory::Low,
            3..=5 => UvCategory::Moderate,
            6..=7 => UvCategory::High,
            8..=10 => UvCategory::VeryHigh,
            _ => UvCategory::Extreme,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UvCategory::Low => "Low",
            UvCategory::Moderate => "Moderate",
            UvCategory::High => "High",
            UvCategory::VeryHigh => "Very High",
            UvCategory::Extreme => "Extreme",
        }
    }
}
