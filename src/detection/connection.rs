use dotenv::dotenv;
use reqwest::Client;
use std::env;
use tracing::debug;

use super::endpoints::{
    ChatCompletionRequest, ChatCompletionResponse, OpenRouterAvailableModel, Provider,
    OPENROUTER_CHAT_URL, OPENROUTER_MODELS,
};
use crate::error::DetectionError;

impl Provider {
    pub fn openrouter(api_key_env_var: &str) -> Self {
        Self::OpenRouter {
            api_key_env_var: api_key_env_var.to_string(),
            base_url: OPENROUTER_CHAT_URL.to_string(),
        }
    }

    pub fn available_models(&self) -> Vec<OpenRouterAvailableModel> {
        match self {
            Provider::OpenRouter { .. } => OPENROUTER_MODELS.to_vec(),
        }
    }

    /// Whether `model` accepts image input. `None` for models this provider does not list.
    pub fn supports_images(&self, model: &str) -> Option<bool> {
        self.available_models()
            .iter()
            .find(|m| m.model_name == model)
            .map(|m| m.supports_images)
    }

    pub async fn call_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, DetectionError> {
        match self {
            Provider::OpenRouter {
                api_key_env_var,
                base_url,
            } => {
                dotenv().ok();
                let api_key = env::var(api_key_env_var)
                    .map_err(|_| DetectionError::MissingApiKey(api_key_env_var.clone()))?;

                let site_url = env::var("SITE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
                let app_name = env::var("APP_NAME").unwrap_or_else(|_| "RecipeMatch".to_string());

                debug!(model = %request.model, url = %base_url, "Calling chat completion");
                let response = Client::new()
                    .post(base_url)
                    .bearer_auth(api_key)
                    .header("HTTP-Referer", site_url)
                    .header("X-Title", app_name)
                    .json(request)
                    .send()
                    .await?;

                if response.status().is_success() {
                    Ok(response.json::<ChatCompletionResponse>().await?)
                } else {
                    let status = response.status();
                    let error_body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Failed to read error body".to_string());
                    Err(DetectionError::Api { status, error_body })
                }
            }
        }
    }
}
