use std::future::Future;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose, Engine as _};
use tracing::{debug, info, warn};

use super::endpoints::{
    ChatCompletionRequest, ChatMessage, ContentPart, ImageUrl, MessageContent, Provider,
};
use super::{parse_ingredient_list, DetectionSource};
use crate::error::DetectionError;
use crate::ingredients::RawDetection;

/// The model reports names only; every name gets this confidence.
pub const VISION_CONFIDENCE: f64 = 0.8;

const VISION_PROMPT: &str = "Identify visible food ingredients in this image.
Respond ONLY with a JSON array of lowercase, singular ingredient names.
Example: [\"egg\", \"spinach\", \"tomato\"]";

/// Detects ingredients in a photo with a multimodal chat model.
#[derive(Debug, Clone)]
pub struct VisionDetectionSource {
    provider: Provider,
    model: String,
    image_path: PathBuf,
}

impl VisionDetectionSource {
    pub fn new(provider: Provider, model: impl Into<String>, image_path: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            model: model.into(),
            image_path: image_path.into(),
        }
    }

    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    /// The request sent for `image_bytes` of the given MIME type.
    pub fn build_request(&self, image_bytes: &[u8], mime_type: &str) -> ChatCompletionRequest {
        let data_url = format!(
            "data:{};base64,{}",
            mime_type,
            general_purpose::STANDARD.encode(image_bytes)
        );
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: MessageContent::Parts(vec![
                    ContentPart::Text {
                        text: VISION_PROMPT.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                ]),
            }],
            temperature: Some(0.0),
            max_tokens: Some(512),
        }
    }

    async fn run(&self) -> Result<Vec<RawDetection>, DetectionError> {
        match self.provider.supports_images(&self.model) {
            Some(false) => return Err(DetectionError::TextOnlyModel(self.model.clone())),
            None => warn!(model = %self.model, "Vision model not in the known model list"),
            Some(true) => {}
        }
        let mime_type = image_mime_type(&self.image_path)?;
        let image_bytes = tokio::fs::read(&self.image_path)
            .await
            .map_err(|source| DetectionError::Image {
                path: self.image_path.clone(),
                source,
            })?;
        debug!(path = %self.image_path.display(), bytes = image_bytes.len(), "Sending image for detection");

        let request = self.build_request(&image_bytes, mime_type);
        let response = self.provider.call_chat_completion(&request).await?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .map(str::trim)
            .filter(|content| !content.is_empty())
            .ok_or(DetectionError::EmptyResponse)?;

        let detections: Vec<RawDetection> = parse_ingredient_list(content)
            .into_iter()
            .map(|name| RawDetection::clamped(name, VISION_CONFIDENCE))
            .collect();
        info!(count = detections.len(), model = %self.model, "Vision model returned ingredients");
        Ok(detections)
    }
}

impl DetectionSource for VisionDetectionSource {
    fn detect(&self) -> impl Future<Output = Result<Vec<RawDetection>, DetectionError>> + Send {
        self.run()
    }
}

/// JPEG and PNG only, judged by file extension.
pub fn image_mime_type(path: &Path) -> Result<&'static str, DetectionError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "png" => Ok("image/png"),
        _ => Err(DetectionError::UnsupportedImage(path.display().to_string())),
    }
}
