//! `generateContent` calls against the Gemini API

use super::config::GeminiConfig;
use super::types::{GeminiContent, GeminiError, GeminiRequest, GeminiResponse, GenerationConfig};
use crate::error::{ProviderError, ProviderFailure, Result};
use crate::provider::{Generation, TextProvider};
use crate::util::{is_valid_model_name, sanitize_error_for_user};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const PROVIDER_NAME: &str = "gemini";

/// Gemini cloud provider
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    ///
    /// Fails with `NotConfigured` when the API key is blank.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderError::not_configured(PROVIDER_NAME));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                ProviderError::new(PROVIDER_NAME, ProviderFailure::Backend(e.to_string()))
            })?;

        Ok(Self { client, config })
    }

    fn error(&self, cause: ProviderFailure) -> ProviderError {
        ProviderError::new(PROVIDER_NAME, cause)
    }

    async fn send_request(&self, model: &str, request: &GeminiRequest) -> Result<GeminiResponse> {
        // Model is interpolated into the URL path
        if !is_valid_model_name(model) {
            warn!("Rejecting Gemini model name with disallowed characters");
            return Err(self.error(ProviderFailure::InvalidModel(
                crate::util::truncate_safe(model, 64).to_string(),
            )));
        }

        // SECURITY: key goes in a header, never in the URL
        let url = format!("{}/models/{}:generateContent", self.config.base_url, model);
        debug!("Sending request to Gemini model: {}", model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(PROVIDER_NAME, &e, self.config.timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::from_transport(PROVIDER_NAME, &e, self.config.timeout))?;

        if !status.is_success() {
            warn!(status = %status, "Gemini API error response");
            let message = match serde_json::from_str::<GeminiError>(&body) {
                Ok(error) => sanitize_error_for_user(&error.error.message),
                Err(_) => format!("HTTP {}", status),
            };
            return Err(self.error(ProviderFailure::Status {
                status: status.as_u16(),
                message,
            }));
        }

        serde_json::from_str(&body).map_err(|e| self.error(ProviderFailure::Malformed(e.to_string())))
    }
}

#[async_trait::async_trait]
impl TextProvider for GeminiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    fn timeout(&self) -> Duration {
        self.config.timeout
    }

    #[instrument(skip(self, prompt), fields(provider = PROVIDER_NAME))]
    async fn generate(&self, prompt: &str, model: Option<&str>) -> Result<Generation> {
        let model = model
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.config.default_model);

        let request = GeminiRequest {
            contents: vec![GeminiContent::user_text(prompt)],
            generation_config: self.config.max_output_tokens.map(|n| GenerationConfig {
                max_output_tokens: Some(n),
            }),
        };

        let response = self.send_request(model, &request).await?;
        let text = response.first_text().ok_or_else(|| {
            self.error(ProviderFailure::Malformed("no candidate text".to_string()))
        })?;

        Ok(Generation::new(text, model))
    }
}
