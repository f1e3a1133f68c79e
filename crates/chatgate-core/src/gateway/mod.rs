//! Gateway - the request pipeline
//!
//! One request moves through:
//!
//! ```text
//! RECEIVED -> ADMITTED -> DISPATCHING -> FULFILLED -> RECORDED
//!          \-> DENIED                 \-> EXHAUSTED
//! ```
//!
//! DENIED and EXHAUSTED are terminal and write no usage record. A failed
//! record write is reported on the response but does not undo FULFILLED.

#[cfg(test)]
mod tests;

use crate::keys::ResolvedCaller;
use crate::metrics::GatewayMetrics;
use crate::quota::{AdmissionGate, Remaining};
use crate::usage::{UsageRecord, UsageRecorder};
use chatgate_llm::util::mask_api_key;
use chatgate_llm::{DispatchAttempt, DispatchError, Dispatcher};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// An authenticated generate request
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Resolved caller
    pub caller: ResolvedCaller,
    /// Prompt text
    pub prompt: String,
    /// Optional model hint (`"ollama:mistral"`, `"gemini"`, `"auto"`)
    pub model: Option<String>,
    /// Client address
    pub source_address: String,
}

/// A fulfilled request
#[derive(Debug, Clone)]
pub struct Served {
    /// Generated text
    pub text: String,
    /// `"{provider}:{model}"`
    pub provider_used: String,
    /// Quota left after this request
    pub remaining: Remaining,
    /// Provider calls made
    pub attempts: Vec<DispatchAttempt>,
    /// Whether the usage record was written
    pub recorded: bool,
}

/// Why a request was not fulfilled
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Daily quota used up
    #[error("daily quota exceeded")]
    QuotaDenied,

    /// Generation failed
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// A rejected request, with the caller's remaining quota
#[derive(Debug, Clone)]
pub struct Rejection {
    /// Failure
    pub error: GatewayError,
    /// Quota left (a request that passed admission has consumed a slot)
    pub remaining: Remaining,
}

/// Quota snapshot for one caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaStatus {
    /// Daily limit
    pub limit: u64,
    /// Requests counted today, if the store answered
    pub used: Option<u64>,
    /// Requests left today, if known
    pub remaining: Remaining,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Received,
    Admitted,
    Denied,
    Dispatching,
    Fulfilled,
    Exhausted,
    Recorded,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "RECEIVED",
            Self::Admitted => "ADMITTED",
            Self::Denied => "DENIED",
            Self::Dispatching => "DISPATCHING",
            Self::Fulfilled => "FULFILLED",
            Self::Exhausted => "EXHAUSTED",
            Self::Recorded => "RECORDED",
        };
        f.write_str(name)
    }
}

/// Decrements the in-flight gauge when the request finishes or is dropped
struct InFlight<'a>(&'a GatewayMetrics);

impl<'a> InFlight<'a> {
    fn enter(metrics: &'a GatewayMetrics) -> Self {
        metrics.in_flight.inc();
        Self(metrics)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.dec();
    }
}

/// Admission, dispatch and recording for generate requests
pub struct Gateway {
    gate: AdmissionGate,
    dispatcher: Arc<Dispatcher>,
    recorder: Arc<dyn UsageRecorder>,
    metrics: GatewayMetrics,
}

impl Gateway {
    /// Assemble a gateway from its collaborators
    #[must_use]
    pub fn new(
        gate: AdmissionGate,
        dispatcher: Arc<Dispatcher>,
        recorder: Arc<dyn UsageRecorder>,
        metrics: GatewayMetrics,
    ) -> Self {
        Self {
            gate,
            dispatcher,
            recorder,
            metrics,
        }
    }

    /// Admission gate
    #[must_use]
    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// Provider dispatcher
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Metric handles
    #[must_use]
    pub fn metrics(&self) -> &GatewayMetrics {
        &self.metrics
    }

    /// Handle one request end to end
    pub async fn handle(&self, request: GenerateRequest) -> Result<Served, Rejection> {
        let request_id = Uuid::new_v4();
        let caller = mask_api_key(&request.caller.identity);
        let _in_flight = InFlight::enter(&self.metrics);
        let step = |state: State| debug!(%request_id, caller = %caller, state = %state, "Request state");

        step(State::Received);

        let admission = self
            .gate
            .admit(
                &request.caller.identity,
                request.caller.daily_limit,
                &request.source_address,
            )
            .await;

        if !admission.allowed {
            step(State::Denied);
            self.metrics.requests.inc(&[("outcome", "denied")]);
            info!(%request_id, caller = %caller, limit = request.caller.daily_limit, "Request denied: daily quota exceeded");
            return Err(Rejection {
                error: GatewayError::QuotaDenied,
                remaining: admission.remaining,
            });
        }
        step(State::Admitted);

        let hint = self.dispatcher.parse_hint(request.model.as_deref());
        step(State::Dispatching);

        let dispatched = match self.dispatcher.dispatch(&request.prompt, &hint).await {
            Ok(dispatched) => dispatched,
            Err(err) => {
                step(State::Exhausted);
                for attempt in err.attempts() {
                    self.metrics.observe_attempt(attempt);
                }
                let outcome = match &err {
                    DispatchError::Provider { .. } => "provider_failed",
                    DispatchError::AllProvidersExhausted { .. } => "exhausted",
                };
                self.metrics.requests.inc(&[("outcome", outcome)]);
                warn!(%request_id, caller = %caller, hint = %hint, error = %err, "Request failed");
                return Err(Rejection {
                    error: GatewayError::Dispatch(err),
                    remaining: admission.remaining,
                });
            }
        };
        step(State::Fulfilled);

        for attempt in &dispatched.attempts {
            self.metrics.observe_attempt(attempt);
        }

        let record = UsageRecord {
            identity: request.caller.identity.clone(),
            timestamp: self.gate.now(),
            message: request.prompt,
            response: dispatched.text.clone(),
            provider_used: dispatched.provider_used.clone(),
            source_address: request.source_address,
        };

        let recorded = match self.recorder.record(&record).await {
            Ok(()) => {
                step(State::Recorded);
                true
            }
            Err(err) => {
                self.metrics.usage_record_failures.inc();
                error!(%request_id, caller = %caller, error = %err, "Failed to write usage record");
                false
            }
        };

        self.metrics.requests.inc(&[("outcome", "served")]);
        info!(
            %request_id,
            caller = %caller,
            provider = %dispatched.provider_used,
            attempts = dispatched.attempts.len(),
            "Request served"
        );

        Ok(Served {
            text: dispatched.text,
            provider_used: dispatched.provider_used,
            remaining: admission.remaining,
            attempts: dispatched.attempts,
            recorded,
        })
    }

    /// Quota snapshot without consuming a slot
    pub async fn quota(&self, caller: &ResolvedCaller) -> QuotaStatus {
        match self.gate.used_today(&caller.identity).await {
            Ok(used) => QuotaStatus {
                limit: caller.daily_limit,
                used: Some(used),
                remaining: Remaining::Known(caller.daily_limit.saturating_sub(used)),
            },
            Err(err) => {
                warn!(caller = %mask_api_key(&caller.identity), error = %err, "Quota store unavailable for quota lookup");
                QuotaStatus {
                    limit: caller.daily_limit,
                    used: None,
                    remaining: Remaining::Unknown,
                }
            }
        }
    }
}
