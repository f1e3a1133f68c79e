//! JSON error envelope
//!
//! Every failure renders as `{ "success": false, "error", "code", ...details }`.
//! Provider faults map to 502/503, never 500.

use super::{RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chatgate_core::{GatewayError, Rejection, Remaining};
use chatgate_llm::util::sanitize_error_for_user;
use chatgate_llm::{DispatchError, ProviderError};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// An error response
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    details: Map<String, Value>,
    headers: HeaderMap,
}

#[derive(Debug, Serialize)]
struct ProviderCause {
    provider: String,
    cause: String,
}

impl From<&ProviderError> for ProviderCause {
    fn from(err: &ProviderError) -> Self {
        Self {
            provider: err.provider.clone(),
            cause: sanitize_error_for_user(&err.cause.to_string()),
        }
    }
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: Map::new(),
            headers: HeaderMap::new(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message)
    }

    fn detail(mut self, key: &str, value: Value) -> Self {
        self.details.insert(key.to_string(), value);
        self
    }

    /// Attach rate limit headers; `remaining` is omitted when unknown
    pub fn with_quota(mut self, limit: u64, remaining: Remaining) -> Self {
        self.headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(limit));
        if let Remaining::Known(n) = remaining {
            self.headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(n));
        }
        self
    }

    /// Map a gateway rejection
    pub fn from_rejection(rejection: Rejection, limit: u64) -> Self {
        let Rejection { error, remaining } = rejection;
        let err = match error {
            GatewayError::QuotaDenied => Self::new(
                StatusCode::TOO_MANY_REQUESTS,
                "QUOTA_EXCEEDED",
                "Daily request limit exceeded",
            )
            .detail("remaining", json!(0)),
            GatewayError::Dispatch(DispatchError::Provider { error, .. }) => {
                let cause = ProviderCause::from(&error);
                Self::new(
                    StatusCode::BAD_GATEWAY,
                    "PROVIDER_FAILED",
                    format!("Provider '{}' failed", cause.provider),
                )
                .detail("provider", json!(cause.provider))
                .detail("cause", json!(cause.cause))
            }
            GatewayError::Dispatch(DispatchError::AllProvidersExhausted { causes, .. }) => {
                let attempts: Vec<ProviderCause> = causes.iter().map(ProviderCause::from).collect();
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "ALL_PROVIDERS_EXHAUSTED",
                    "No text provider could serve the request",
                )
                .detail("attempts", json!(attempts))
            }
        };
        err.with_quota(limit, remaining)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = Map::new();
        body.insert("success".to_string(), json!(false));
        body.insert("error".to_string(), json!(self.message));
        body.insert("code".to_string(), json!(self.code));
        body.extend(self.details);

        (self.status, self.headers, Json(Value::Object(body))).into_response()
    }
}
