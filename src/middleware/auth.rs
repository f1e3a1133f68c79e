//! Caller authentication for Axum
//!
//! Resolves the presented API key through the key directory held in
//! [`AppState`]. Handlers take [`RequireCaller`] to get the resolved caller.

use crate::server::AppState;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chatgate_core::{KeyDirectory, KeyError, ResolvedCaller};
use chatgate_llm::util::mask_api_key;
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct AuthErrorResponse {
    success: bool,
    error: String,
    code: &'static str,
}

/// Auth rejection
#[derive(Debug)]
pub struct AuthRejection {
    status: StatusCode,
    body: AuthErrorResponse,
}

impl AuthRejection {
    fn new(status: StatusCode, error: impl Into<String>, code: &'static str) -> Self {
        Self {
            status,
            body: AuthErrorResponse {
                success: false,
                error: error.into(),
                code,
            },
        }
    }

    fn missing() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "Authentication required. Provide X-API-Key or Authorization: Bearer <key> header.",
            "INVALID_CREDENTIAL",
        )
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<KeyError> for AuthRejection {
    fn from(err: KeyError) -> Self {
        match err {
            KeyError::Invalid => {
                Self::new(StatusCode::UNAUTHORIZED, "Invalid API key", "INVALID_CREDENTIAL")
            }
            KeyError::Unavailable(_) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "Key directory unavailable, try again later",
                "KEY_DIRECTORY_UNAVAILABLE",
            ),
        }
    }
}

/// Axum extractor that requires a valid API key.
///
/// Looks at, in order:
/// 1. `X-API-Key: <key>`
/// 2. `Authorization: Bearer <key>`
pub struct RequireCaller(pub ResolvedCaller);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for RequireCaller
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let state = parts.extensions.get::<AppState>().ok_or_else(|| {
            AuthRejection::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Key directory not configured",
                "INTERNAL_ERROR",
            )
        })?;

        let raw = extract_key(parts).ok_or_else(AuthRejection::missing)?;

        match state.keys.resolve(&raw).await {
            Ok(caller) => Ok(RequireCaller(caller)),
            Err(err) => {
                match &err {
                    KeyError::Invalid => debug!(caller = %mask_api_key(&raw), "Rejected unknown API key"),
                    KeyError::Unavailable(reason) => warn!(error = %reason, "Key directory unavailable"),
                }
                Err(err.into())
            }
        }
    }
}

fn extract_key(parts: &Parts) -> Option<String> {
    let from_header = parts
        .headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(key) = from_header {
        return Some(key.to_string());
    }

    parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
