//! crates/skincheck_core/src/results.rs
//!
//! What the results view renders for a consumed analysis result.

use chrono::{DateTime, Utc};

use crate::domain::{AnalysisResult, ImageDimensions, RiskLevel};

#[derive(Debug, Clone, PartialEq)]
pub struct ResultSummary {
    pub risk_level: RiskLevel,
    /// e.g. `High Risk`.
    pub headline: String,
    pub description: String,
    /// Confidence rounded to a whole percentage.
    pub confidence_percent: u8,
    pub condition: String,
    pub warning: Option<String>,
    pub recommendations: Vec<&'static str>,
    pub captured_at: DateTime<Utc>,
    pub image_ref: String,
    pub image_dimensions: Option<ImageDimensions>,
}

impl From<&AnalysisResult> for ResultSummary {
    fn from(result: &AnalysisResult) -> Self {
        Self {
            risk_level: result.risk_level,
            headline: format!("{} Risk", result.risk_level.label()),
            description: format!("{} risk of skin cancer", result.risk_level.label()),
            confidence_percent: confidence_percent(result.confidence),
            condition: result.predicted_condition.clone(),
            warning: result.warning.clone(),
            recommendations: recommendations(result.risk_level).to_vec(),
            captured_at: result.captured_at,
            image_ref: result.origin_image_ref.clone(),
            image_dimensions: result.image_dimensions,
        }
    }
}

pub fn confidence_percent(confidence: f64) -> u8 {
    (confidence.clamp(0.0, 1.0) * 100.0).round() as u8
}

pub fn recommendations(level: RiskLevel) -> &'static [&'static str] {
    match level {
        RiskLevel::Low => &["No specific recommendations for low risk"],
        RiskLevel::Medium => &["Consider regular monitoring", "Consult a dermatologist"],
        RiskLevel::High => &["Immediate medical attention", "Consult a dermatologist"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(level: RiskLevel, confidence: f64) -> AnalysisResult {
        AnalysisResult {
            risk_level: level,
            confidence,
            predicted_condition: "Melanoma".to_string(),
            warning: None,
            captured_at: Utc::now(),
            origin_image_ref: "image:1".to_string(),
            image_dimensions: None,
        }
    }

    #[test]
    fn high_risk_summary() {
        let summary = ResultSummary::from(&result(RiskLevel::High, 0.87));

        assert_eq!(summary.headline, "High Risk");
        assert_eq!(summary.description, "High risk of skin cancer");
        assert_eq!(summary.confidence_percent, 87);
        assert!(summary
            .recommendations
            .iter()
            .any(|r| r.eq_ignore_ascii_case("consult a dermatologist")));
    }

    #[test]
    fn every_level_has_recommendations() {
        for level in [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High] {
            assert!(!recommendations(level).is_empty());
        }
    }

    #[test]
    fn confidence_rounds_half_up() {
        assert_eq!(confidence_percent(0.125), 13);
        assert_eq!(confidence_percent(0.0), 0);
        assert_eq!(confidence_percent(1.0), 100);
    }
}
