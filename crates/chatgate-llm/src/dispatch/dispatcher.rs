//! Fallback dispatcher
//!
//! Tries providers in priority order and returns the first success. The
//! dispatcher holds no per-request state; attempts are accumulated in the
//! loop and handed back with the result.

use super::hint::{ModelHint, KNOWN_PROVIDERS};
use crate::error::{ProviderError, ProviderFailure};
use crate::provider::{Generation, TextProvider};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// One provider call made while serving a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchAttempt {
    /// Provider name
    pub provider: String,
    /// Whether the call produced text
    pub success: bool,
    /// Wall-clock time spent on the call
    pub latency: Duration,
    /// Failure cause, when `success` is false
    pub error: Option<ProviderFailure>,
}

/// Successful dispatch
#[derive(Debug, Clone)]
pub struct Dispatched {
    /// Generated text
    pub text: String,
    /// `"{provider}:{model}"` of the provider that answered
    pub provider_used: String,
    /// Every call made, in order, ending with the successful one
    pub attempts: Vec<DispatchAttempt>,
}

/// Terminal dispatch failure
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// The explicitly requested provider failed
    #[error("{error}")]
    Provider {
        /// Failure of the requested provider
        error: ProviderError,
        /// Calls made; empty when the provider is not in the chain
        attempts: Vec<DispatchAttempt>,
    },

    /// Every provider in the chain failed
    #[error("all providers exhausted ({} attempted)", .causes.len())]
    AllProvidersExhausted {
        /// One error per attempted provider, in chain order
        causes: Vec<ProviderError>,
        /// Calls made, in chain order
        attempts: Vec<DispatchAttempt>,
    },
}

impl DispatchError {
    /// Provider errors carried by this failure, in attempt order
    #[must_use]
    pub fn causes(&self) -> &[ProviderError] {
        match self {
            Self::Provider { error, .. } => std::slice::from_ref(error),
            Self::AllProvidersExhausted { causes, .. } => causes,
        }
    }

    /// Provider calls made before giving up
    #[must_use]
    pub fn attempts(&self) -> &[DispatchAttempt] {
        match self {
            Self::Provider { attempts, .. } | Self::AllProvidersExhausted { attempts, .. } => {
                attempts
            }
        }
    }
}

/// Ordered fallback over text providers
pub struct Dispatcher {
    chain: Vec<Arc<dyn TextProvider>>,
    known: Vec<String>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Create an empty dispatcher that recognizes the built-in provider names
    #[must_use]
    pub fn new() -> Self {
        Self {
            chain: Vec::new(),
            known: KNOWN_PROVIDERS.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Append a provider to the end of the chain
    pub fn register(&mut self, provider: Arc<dyn TextProvider>) {
        let name = provider.name().to_string();
        debug!(provider = %name, position = self.chain.len(), "Registering text provider");
        if !self.known.contains(&name) {
            self.known.push(name);
        }
        self.chain.push(provider);
    }

    /// Builder form of [`register`](Self::register)
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn TextProvider>) -> Self {
        self.register(provider);
        self
    }

    /// Provider names in chain order
    #[must_use]
    pub fn chain(&self) -> Vec<&str> {
        self.chain.iter().map(|p| p.name()).collect()
    }

    /// Whether no provider is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Parse a raw client hint against the names this dispatcher knows
    #[must_use]
    pub fn parse_hint(&self, raw: Option<&str>) -> ModelHint {
        let known: Vec<&str> = self.known.iter().map(String::as_str).collect();
        ModelHint::parse(raw, &known)
    }

    fn find(&self, name: &str) -> Option<&Arc<dyn TextProvider>> {
        self.chain.iter().find(|p| p.name() == name)
    }

    /// Dispatch a prompt according to the hint
    #[instrument(skip(self, prompt, hint), fields(hint = %hint))]
    pub async fn dispatch(
        &self,
        prompt: &str,
        hint: &ModelHint,
    ) -> Result<Dispatched, DispatchError> {
        match hint {
            ModelHint::Explicit { provider, model } => {
                self.dispatch_explicit(prompt, provider, model.as_deref())
                    .await
            }
            ModelHint::Auto => self.dispatch_chain(prompt).await,
        }
    }

    async fn dispatch_explicit(
        &self,
        prompt: &str,
        name: &str,
        model: Option<&str>,
    ) -> Result<Dispatched, DispatchError> {
        let provider = self.find(name).ok_or_else(|| DispatchError::Provider {
            error: ProviderError::not_configured(name),
            attempts: Vec::new(),
        })?;

        let (attempt, result) = call(provider.as_ref(), prompt, model).await;
        match result {
            Ok(generation) => Ok(served(provider.as_ref(), generation, vec![attempt])),
            Err(error) => {
                warn!(provider = %name, error = %error.cause, "Explicitly requested provider failed");
                Err(DispatchError::Provider {
                    error,
                    attempts: vec![attempt],
                })
            }
        }
    }

    async fn dispatch_chain(&self, prompt: &str) -> Result<Dispatched, DispatchError> {
        let mut attempts = Vec::with_capacity(self.chain.len());
        let mut causes = Vec::new();

        for provider in &self.chain {
            let (attempt, result) = call(provider.as_ref(), prompt, None).await;
            attempts.push(attempt);

            match result {
                Ok(generation) => {
                    if !causes.is_empty() {
                        info!(
                            provider = %provider.name(),
                            failed = causes.len(),
                            "Served by fallback provider"
                        );
                    }
                    return Ok(served(provider.as_ref(), generation, attempts));
                }
                Err(err) => {
                    warn!(provider = %provider.name(), error = %err.cause, "Provider failed, trying next");
                    causes.push(err);
                }
            }
        }

        warn!(attempted = causes.len(), "All providers exhausted");
        Err(DispatchError::AllProvidersExhausted { causes, attempts })
    }
}

async fn call(
    provider: &dyn TextProvider,
    prompt: &str,
    model: Option<&str>,
) -> (DispatchAttempt, crate::Result<Generation>) {
    let budget = provider.timeout();
    let started = Instant::now();

    let result = match tokio::time::timeout(budget, provider.generate(prompt, model)).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::new(
            provider.name(),
            ProviderFailure::Timeout(budget.as_millis() as u64),
        )),
    };

    let attempt = DispatchAttempt {
        provider: provider.name().to_string(),
        success: result.is_ok(),
        latency: started.elapsed(),
        error: result.as_ref().err().map(|e| e.cause.clone()),
    };
    (attempt, result)
}

fn served(
    provider: &dyn TextProvider,
    generation: Generation,
    attempts: Vec<DispatchAttempt>,
) -> Dispatched {
    Dispatched {
        text: generation.text,
        provider_used: format!("{}:{}", provider.name(), generation.model),
        attempts,
    }
}
