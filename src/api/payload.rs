//! Request and response bodies of the backend services
//!
//! Every service answers with a `success` flag and either its payload or an
//! `error` string. Responses are decoded leniently (all fields optional) and
//! then folded into a `Result` by [`ServiceResponse::into_result`].

use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};

/// Fallback messages when the service fails without saying why
const PREVIEW_FAILED: &str = "Preview generation failed";
const UPLOAD_FAILED: &str = "File upload failed";
const CONVERT_FAILED: &str = "Conversion failed";
const RECOGNIZE_FAILED: &str = "Formula recognition failed";

/// Body of `POST /api/preview`
#[derive(Debug, Serialize)]
pub struct PreviewRequest<'a> {
    pub content: &'a str,
}

/// Body of `POST /api/convert`
#[derive(Debug, Serialize)]
pub struct ConvertRequest<'a> {
    pub content: &'a str,
    pub filename: &'a str,
}

/// Fold a `{success, ... | error}` envelope into a typed result
pub trait ServiceResponse {
    type Output;

    fn into_result(self) -> ApiResult<Self::Output>;
}

fn service_failure(error: Option<String>, fallback: &str, suggestions: Vec<String>) -> ApiError {
    ApiError::Service {
        message: error
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string()),
        suggestions,
    }
}

#[derive(Debug, Deserialize)]
pub struct PreviewResponse {
    #[serde(default)]
    pub success: bool,
    pub html: Option<String>,
    pub error: Option<String>,
}

impl ServiceResponse for PreviewResponse {
    type Output = String;

    fn into_result(self) -> ApiResult<String> {
        match (self.success, self.html) {
            (true, Some(html)) => Ok(html),
            _ => Err(service_failure(self.error, PREVIEW_FAILED, Vec::new())),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    pub content: Option<String>,
    pub error: Option<String>,
}

impl ServiceResponse for UploadResponse {
    type Output = String;

    fn into_result(self) -> ApiResult<String> {
        match (self.success, self.content) {
            (true, Some(content)) => Ok(content),
            _ => Err(service_failure(self.error, UPLOAD_FAILED, Vec::new())),
        }
    }
}

/// Reference to a generated Word document held by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedDocument {
    /// Opaque identifier for `GET /api/download/{id}`
    pub download_id: String,
    /// File name suggested by the server
    pub filename: String,
}

#[derive(Debug, Deserialize)]
pub struct ConvertResponse {
    #[serde(default)]
    pub success: bool,
    pub download_id: Option<String>,
    pub filename: Option<String>,
    pub error: Option<String>,
}

impl ServiceResponse for ConvertResponse {
    type Output = ConvertedDocument;

    fn into_result(self) -> ApiResult<ConvertedDocument> {
        match (self.success, self.download_id) {
            (true, Some(download_id)) => Ok(ConvertedDocument {
                filename: self
                    .filename
                    .unwrap_or_else(|| format!("{}.docx", download_id)),
                download_id,
            }),
            _ => Err(service_failure(self.error, CONVERT_FAILED, Vec::new())),
        }
    }
}

/// Coarse accuracy bucket reported by the recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceTier {
    High,
    Medium,
}

impl ConfidenceTier {
    /// Map the service's confidence string onto a tier
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "high" | "very_high" => ConfidenceTier::High,
            _ => ConfidenceTier::Medium,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ConfidenceTier::High => "High accuracy",
            ConfidenceTier::Medium => "Medium accuracy",
        }
    }
}

/// A successfully recognized formula
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub method: String,
    pub confidence: ConfidenceTier,
    pub confidence_score: Option<f64>,
    pub latex: String,
}

#[derive(Debug, Deserialize)]
pub struct RecognizeResponse {
    #[serde(default)]
    pub success: bool,
    pub method: Option<String>,
    pub confidence: Option<String>,
    pub confidence_score: Option<f64>,
    pub latex: Option<String>,
    pub error: Option<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl ServiceResponse for RecognizeResponse {
    type Output = Recognition;

    fn into_result(self) -> ApiResult<Recognition> {
        match (self.success, self.latex) {
            (true, Some(latex)) if !latex.trim().is_empty() => Ok(Recognition {
                method: self.method.unwrap_or_else(|| "unknown".to_string()),
                confidence: ConfidenceTier::from_label(self.confidence.as_deref().unwrap_or("")),
                confidence_score: self.confidence_score,
                latex: latex.trim().to_string(),
            }),
            _ => Err(service_failure(
                self.error,
                RECOGNIZE_FAILED,
                self.suggestions,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_success() {
        let resp: PreviewResponse =
            serde_json::from_str(r#"{"success": true, "html": "<p>hi</p>"}"#).unwrap();
        assert_eq!(resp.into_result().unwrap(), "<p>hi</p>");
    }

    #[test]
    fn test_preview_failure_uses_service_message() {
        let resp: PreviewResponse =
            serde_json::from_str(r#"{"success": false, "error": "render crashed"}"#).unwrap();
        let err = resp.into_result().unwrap_err();
        assert_eq!(err.to_string(), "render crashed");
    }

    #[test]
    fn test_convert_failure_without_message_falls_back() {
        let resp: ConvertResponse = serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert_eq!(resp.into_result().unwrap_err().to_string(), CONVERT_FAILED);
    }

    #[test]
    fn test_convert_success() {
        let resp: ConvertResponse = serde_json::from_str(
            r#"{"success": true, "download_id": "abc123", "filename": "document.docx"}"#,
        )
        .unwrap();
        let doc = resp.into_result().unwrap();
        assert_eq!(doc.download_id, "abc123");
        assert_eq!(doc.filename, "document.docx");
    }

    #[test]
    fn test_recognize_success_with_extra_fields() {
        let resp: RecognizeResponse = serde_json::from_str(
            r#"{"success": true, "latex": " \\frac{a}{b} ", "method": "vision",
                "confidence": "very_high", "confidence_score": 95, "model": "m", "raw_text": "x"}"#,
        )
        .unwrap();
        let rec = resp.into_result().unwrap();
        assert_eq!(rec.latex, "\\frac{a}{b}");
        assert_eq!(rec.confidence, ConfidenceTier::High);
        assert_eq!(rec.confidence_score, Some(95.0));
    }

    #[test]
    fn test_recognize_failure_carries_suggestions() {
        let resp: RecognizeResponse = serde_json::from_str(
            r#"{"success": false, "error": "blurry", "suggestions": ["use a sharper image"]}"#,
        )
        .unwrap();
        match resp.into_result() {
            Err(ApiError::Service {
                message,
                suggestions,
            }) => {
                assert_eq!(message, "blurry");
                assert_eq!(suggestions, vec!["use a sharper image".to_string()]);
            }
            other => panic!("expected a service failure, got {:?}", other),
        }
    }

    #[test]
    fn test_confidence_tiers() {
        assert_eq!(ConfidenceTier::from_label("high"), ConfidenceTier::High);
        assert_eq!(ConfidenceTier::from_label("medium"), ConfidenceTier::Medium);
        assert_eq!(ConfidenceTier::from_label(""), ConfidenceTier::Medium);
    }
}
