//! services/api/src/adapters/analysis_http.rs
//!
//! This module contains the adapter for the remote skin-lesion classifier.
//! It implements the `AnalysisService` port from the `core` crate.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use skincheck_core::domain::{CapturedImage, Classification, RiskLevel};
use skincheck_core::error::AnalysisError;
use skincheck_core::ports::AnalysisService;
use tracing::debug;

/// Name of the multipart field carrying the image.
pub const IMAGE_FIELD: &str = "file";
/// Filename sent with every upload, whatever the origin.
pub const IMAGE_FILE_NAME: &str = "image.jpg";

//=========================================================================================
// Wire Types
//=========================================================================================

/// The classifier's success body. Both the snake_case and camelCase spellings
/// seen in the wild are accepted.
#[derive(Debug, Deserialize)]
struct AnalysisResponse {
    #[serde(default, alias = "riskLevel")]
    risk_level: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default, alias = "condition")]
    prediction: Option<String>,
    #[serde(default)]
    warning: Option<String>,
}

/// The classifier's error body. FastAPI puts its message under `detail`.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    detail: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorResponse {
    fn message(self) -> Option<String> {
        let detail = self.detail.map(|detail| match detail {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });
        detail.or(self.error).filter(|m| !m.trim().is_empty())
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct HttpAnalysisAdapter {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAnalysisAdapter {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisAdapter {
    async fn classify(&self, image: &CapturedImage) -> Result<Classification, AnalysisError> {
        let form = Form::new().part(IMAGE_FIELD, image_part(image));

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        debug!("Analysis endpoint answered {}", status);

        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let message = serde_json::from_slice::<ErrorResponse>(&body)
                .ok()
                .and_then(ErrorResponse::message);
            return Err(AnalysisError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await.map_err(map_send_error)?;
        let parsed = serde_json::from_slice::<AnalysisResponse>(&body)
            .map_err(|e| AnalysisError::Malformed(e.to_string()))?;
        into_classification(parsed)
    }
}

//=========================================================================================
// Helper Functions
//=========================================================================================

fn image_part(image: &CapturedImage) -> Part {
    let bytes = image.bytes.to_vec();
    match Part::bytes(bytes.clone())
        .file_name(IMAGE_FILE_NAME)
        .mime_str(&image.content_type)
    {
        Ok(part) => part,
        Err(_) => Part::bytes(bytes).file_name(IMAGE_FILE_NAME),
    }
}

fn map_send_error(e: reqwest::Error) -> AnalysisError {
    if e.is_timeout() {
        AnalysisError::Timeout
    } else {
        AnalysisError::Unreachable(e.to_string())
    }
}

/// Validates the boundary schema. A missing prediction is reported as `Unknown`.
fn into_classification(body: AnalysisResponse) -> Result<Classification, AnalysisError> {
    let risk_level = body
        .risk_level
        .ok_or_else(|| AnalysisError::Malformed("missing risk_level".to_string()))?
        .parse::<RiskLevel>()
        .map_err(AnalysisError::Malformed)?;

    let confidence = body
        .confidence
        .ok_or_else(|| AnalysisError::Malformed("missing confidence".to_string()))?;
    if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
        return Err(AnalysisError::Malformed(format!(
            "confidence {} is outside [0, 1]",
            confidence
        )));
    }

    let predicted_condition = body
        .prediction
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    Ok(Classification {
        risk_level,
        confidence,
        predicted_condition,
        warning: body.warning.filter(|w| !w.trim().is_empty()),
    })
}
