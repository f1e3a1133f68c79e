//! Hugging Face text-generation-inference client

use super::types::{HuggingFaceConfig, TgiError, TgiParameters, TgiRequest, TgiResponse};
use crate::error::{ProviderError, ProviderFailure, Result};
use crate::provider::{Generation, TextProvider};
use crate::util::sanitize_error_for_user;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

const PROVIDER_NAME: &str = "huggingface";

/// Local Hugging Face inference provider
pub struct HuggingFaceProvider {
    client: Client,
    config: HuggingFaceConfig,
}

impl HuggingFaceProvider {
    /// Create a new provider
    pub fn new(config: HuggingFaceConfig) -> Result<Self> {
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
}

#[async_trait::async_trait]
impl TextProvider for HuggingFaceProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn default_model(&self) -> &str {
        &self.config.model
    }

    fn timeout(&self) -> Duration {
        self.config.timeout
    }

    #[instrument(skip(self, prompt), fields(provider = PROVIDER_NAME))]
    async fn generate(&self, prompt: &str, model: Option<&str>) -> Result<Generation> {
        if let Some(requested) = model.filter(|m| *m != self.config.model) {
            debug!(requested = %requested, served = %self.config.model, "Ignoring model hint");
        }

        let request = TgiRequest {
            inputs: prompt.to_string(),
            parameters: TgiParameters {
                max_new_tokens: self.config.max_new_tokens,
                temperature: self.config.temperature,
                do_sample: true,
                return_full_text: false,
            },
        };

        let url = format!("{}/generate", self.config.base_url);
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
            let message = match serde_json::from_str::<TgiError>(&body) {
                Ok(error) => sanitize_error_for_user(&error.error),
                Err(_) => format!("HTTP {}", status),
            };
            return Err(self.error(ProviderFailure::Status {
                status: status.as_u16(),
                message,
            }));
        }

        let parsed: TgiResponse = serde_json::from_str(&body)
            .map_err(|e| self.error(ProviderFailure::Malformed(e.to_string())))?;

        let text = parsed
            .into_text()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| self.error(ProviderFailure::Malformed("empty generation".to_string())))?;

        Ok(Generation::new(text, self.config.model.clone()))
    }
}
