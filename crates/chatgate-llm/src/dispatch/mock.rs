//! Scripted provider for testing
//!
//! Plays back a queue of outcomes, then repeats a fallback outcome.

use crate::error::{ProviderError, ProviderFailure, Result};
use crate::provider::{Generation, TextProvider};

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One scripted outcome
#[derive(Debug, Clone)]
pub enum Step {
    /// Answer with this text
    Reply(String),
    /// Fail with this cause
    Fail(ProviderFailure),
    /// Never answer
    Hang,
}

/// A provider that returns scripted outcomes
pub struct ScriptedProvider {
    name: String,
    model: String,
    timeout: Duration,
    steps: Mutex<VecDeque<Step>>,
    fallback: Step,
    calls: AtomicUsize,
    models_seen: Mutex<Vec<Option<String>>>,
}

impl ScriptedProvider {
    /// Provider that always replies with `text`
    #[must_use]
    pub fn replying(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with_fallback(name, Step::Reply(text.into()))
    }

    /// Provider that always fails with `cause`
    #[must_use]
    pub fn failing(name: impl Into<String>, cause: ProviderFailure) -> Self {
        Self::with_fallback(name, Step::Fail(cause))
    }

    /// Provider that never answers
    #[must_use]
    pub fn hanging(name: impl Into<String>) -> Self {
        Self::with_fallback(name, Step::Hang)
    }

    fn with_fallback(name: impl Into<String>, fallback: Step) -> Self {
        Self {
            name: name.into(),
            model: "scripted".to_string(),
            timeout: Duration::from_secs(5),
            steps: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicUsize::new(0),
            models_seen: Mutex::new(Vec::new()),
        }
    }

    /// Set the default model name
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the advertised timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Queue an outcome ahead of the fallback
    pub fn push(&self, step: Step) {
        self.steps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(step);
    }

    /// Number of `generate` calls so far
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Model argument of every call, in order
    #[must_use]
    pub fn models_seen(&self) -> Vec<Option<String>> {
        self.models_seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait::async_trait]
impl TextProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn generate(&self, _prompt: &str, model: Option<&str>) -> Result<Generation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.models_seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(model.map(str::to_string));

        let step = self
            .steps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match step {
            Step::Reply(text) => Ok(Generation::new(text, model.unwrap_or(&self.model))),
            Step::Fail(cause) => Err(ProviderError::new(self.name.clone(), cause)),
            Step::Hang => std::future::pending().await,
        }
    }
}
