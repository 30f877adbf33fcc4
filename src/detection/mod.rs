//! Upstream sources of raw ingredient detections.
//!
//! Everything here sits at the boundary: replies are cleaned up and confidences clamped
//! before detections reach [`aggregate`](crate::ingredients::aggregate).

pub mod connection;
pub mod endpoints;
pub mod vision;

use std::future::Future;

use crate::error::DetectionError;
use crate::ingredients::RawDetection;

pub use endpoints::Provider;
pub use vision::VisionDetectionSource;

/// Confidence given to each item typed by a user.
pub const TEXT_CONFIDENCE: f64 = 1.0;

/// Produces zero or more `(label, confidence)` observations per call.
pub trait DetectionSource {
    fn detect(&self) -> impl Future<Output = Result<Vec<RawDetection>, DetectionError>> + Send;
}

/// Comma or newline separated ingredient names typed by a user.
#[derive(Debug, Clone)]
pub struct TextDetectionSource {
    text: String,
}

impl TextDetectionSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn detections(&self) -> Vec<RawDetection> {
        self.text
            .split([',', '\n'])
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .map(|piece| RawDetection::clamped(piece, TEXT_CONFIDENCE))
            .collect()
    }
}

impl DetectionSource for TextDetectionSource {
    fn detect(&self) -> impl Future<Output = Result<Vec<RawDetection>, DetectionError>> + Send {
        let detections = self.detections();
        async move { Ok(detections) }
    }
}

/// Ingredient names from a model reply.
///
/// Accepts a JSON array (optionally wrapped in a markdown code fence) and falls back to
/// a comma separated list. Names are trimmed and lowercased; empty names are dropped.
pub fn parse_ingredient_list(text: &str) -> Vec<String> {
    let text = strip_code_fence(text.trim());

    if text.starts_with('[') {
        if let Ok(values) = serde_json::from_str::<Vec<serde_json::Value>>(text) {
            return values
                .into_iter()
                .map(|value| match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .map(|name| name.trim().to_lowercase())
                .filter(|name| !name.is_empty())
                .collect();
        }
    }

    text.split(',')
        .map(|part| part.trim().to_lowercase())
        .filter(|part| !part.is_empty())
        .collect()
}

pub(crate) fn strip_code_fence(text: &str) -> &str {
    if text.starts_with("```") && text.ends_with("```") && text.len() >= 6 {
        let inner = &text[3..text.len() - 3];
        inner.strip_prefix("json").unwrap_or(inner).trim()
    } else {
        text
    }
}
