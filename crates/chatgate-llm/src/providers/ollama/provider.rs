//! Ollama provider implementation

use crate::error::{ProviderError, ProviderFailure, Result};
use crate::provider::{Generation, TextProvider};
use crate::providers::ollama::{
    security,
    types::{OllamaConfig, OllamaError, OllamaGenerateRequest, OllamaGenerateResponse, OllamaOptions},
};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

const PROVIDER_NAME: &str = "ollama";

/// Ollama local provider
pub struct OllamaProvider {
    client: Client,
    config: OllamaConfig,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    pub fn new(config: OllamaConfig) -> Result<Self> {
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

    /// Send request to Ollama API
    async fn send_request(&self, request: OllamaGenerateRequest) -> Result<OllamaGenerateResponse> {
        let url = format!("{}/api/generate", self.config.base_url);

        debug!("Sending request to Ollama: {}", request.model);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(PROVIDER_NAME, &e, self.config.timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::from_transport(PROVIDER_NAME, &e, self.config.timeout))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<OllamaError>(&body) {
                Ok(error) => security::sanitize_api_error(&error.error),
                // SECURITY: Don't expose raw HTTP response body
                Err(_) => security::sanitize_api_error(&format!("HTTP {}", status)),
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
impl TextProvider for OllamaProvider {
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

        let request = OllamaGenerateRequest {
            model: model.to_string(),
            prompt: prompt.to_string(),
            stream: false,
            options: self.config.max_tokens.map(|n| OllamaOptions {
                num_predict: Some(n),
            }),
        };

        let response = self.send_request(request).await?;

        if response.response.trim().is_empty() {
            return Err(self.error(ProviderFailure::Malformed(
                "empty response text".to_string(),
            )));
        }

        Ok(Generation::new(response.response, model))
    }
}
