//! Text generation endpoint
//!
//! `POST /api/chat` and its alias `POST /api/v1/generate`.

use super::error::ApiError;
use super::{RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING};
use crate::middleware::RequireCaller;
use crate::server::AppState;
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Extension, Json, Router};
use chatgate_core::{GenerateRequest, Remaining};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Request body
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// `"auto"`, `"<provider>"` or `"<provider>:<model>"`
    #[serde(default)]
    pub model: Option<String>,
}

/// Success body
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    /// `"{provider}:{model}"` that produced the text
    pub model: String,
}

async fn generate(
    Extension(state): Extension<AppState>,
    RequireCaller(caller): RequireCaller,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Json(body): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    if body.message.trim().is_empty() {
        return Err(ApiError::bad_request("message must not be empty"));
    }

    let limit = caller.daily_limit;
    let source_address = connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let request = GenerateRequest {
        caller,
        prompt: body.message,
        model: body.model,
        source_address,
    };

    match state.gateway.handle(request).await {
        Ok(served) => {
            let mut headers = HeaderMap::new();
            headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(limit));
            if let Remaining::Known(n) = served.remaining {
                headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(n));
            }
            let body = ChatResponse {
                response: served.text,
                model: served.provider_used,
            };
            Ok((headers, Json(body)).into_response())
        }
        Err(rejection) => Err(ApiError::from_rejection(rejection, limit)),
    }
}

/// Create the generation routes
pub fn generate_routes() -> Router {
    Router::new()
        .route("/api/chat", post(generate))
        .route("/api/v1/generate", post(generate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::router;
    use crate::api::test_support::{json_body, post_json, state, state_with, KEY};
    use axum::http::StatusCode;
    use chatgate_core::{QuotaStore, RedisQuotaConfig, RedisQuotaStore};
    use chatgate_llm::{Dispatcher, ProviderFailure, ScriptedProvider};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn chain() -> Dispatcher {
        Dispatcher::new()
            .with_provider(Arc::new(ScriptedProvider::failing(
                "ollama",
                ProviderFailure::Connect("connection refused".to_string()),
            )))
            .with_provider(Arc::new(
                ScriptedProvider::replying("huggingface", "Hello there").with_model("dialogpt"),
            ))
    }

    fn app(state: AppState) -> Router {
        router(state, &["http://localhost:3000".to_string()])
    }

    #[tokio::test]
    async fn test_generate_falls_back_and_sets_headers() {
        let state = state(chain(), 5).await;
        let storage = state.storage.clone();

        let response = app(state)
            .oneshot(post_json("/api/chat", Some(KEY), json!({"message": "Hi"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-remaining"], "4");
        assert_eq!(response.headers()["x-ratelimit-limit"], "5");
        let body = json_body(response).await;
        assert_eq!(body, json!({"response": "Hello there", "model": "huggingface:dialogpt"}));

        let records = storage.recent_usage(KEY, 10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].provider_used, "huggingface:dialogpt");
        assert_eq!(records[0].source_address, "unknown");
    }

    #[tokio::test]
    async fn test_generate_alias_route() {
        let response = app(state(chain(), 5).await)
            .oneshot(post_json("/api/v1/generate", Some(KEY), json!({"message": "Hi", "model": "auto"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_and_unknown_keys_rejected() {
        let app = app(state(chain(), 5).await);

        let missing = app
            .clone()
            .oneshot(post_json("/api/chat", None, json!({"message": "Hi"})))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(missing).await["code"], "INVALID_CREDENTIAL");

        let unknown = app
            .oneshot(post_json("/api/chat", Some("ak_nobody_knows_me"), json!({"message": "Hi"})))
            .await
            .unwrap();
        assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_quota_exceeded_is_429() {
        let app = app(state(chain(), 1).await);

        let first = app
            .clone()
            .oneshot(post_json("/api/chat", Some(KEY), json!({"message": "Hi"})))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()["x-ratelimit-remaining"], "0");

        let second = app
            .oneshot(post_json("/api/chat", Some(KEY), json!({"message": "Hi"})))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(second.headers()["x-ratelimit-remaining"], "0");
        let body = json_body(second).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "QUOTA_EXCEEDED");
        assert_eq!(body["remaining"], 0);
    }

    #[tokio::test]
    async fn test_explicit_provider_failure_is_502() {
        let response = app(state(chain(), 5).await)
            .oneshot(post_json(
                "/api/chat",
                Some(KEY),
                json!({"message": "Hi", "model": "ollama:mistral"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(response.headers()["x-ratelimit-remaining"], "4");
        let body = json_body(response).await;
        assert_eq!(body["code"], "PROVIDER_FAILED");
        assert_eq!(body["provider"], "ollama");
    }

    #[tokio::test]
    async fn test_exhausted_chain_is_503() {
        let dispatcher = Dispatcher::new()
            .with_provider(Arc::new(ScriptedProvider::failing(
                "ollama",
                ProviderFailure::Connect("connection refused".to_string()),
            )))
            .with_provider(Arc::new(ScriptedProvider::failing(
                "huggingface",
                ProviderFailure::Status {
                    status: 503,
                    message: "model loading".to_string(),
                },
            )));
        let state = state(dispatcher, 5).await;
        let storage = state.storage.clone();

        let response = app(state)
            .oneshot(post_json("/api/chat", Some(KEY), json!({"message": "Hi"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert_eq!(body["code"], "ALL_PROVIDERS_EXHAUSTED");
        assert_eq!(body["attempts"].as_array().unwrap().len(), 2);
        assert_eq!(storage.usage_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_blank_message_does_not_consume_quota() {
        let state = state(chain(), 1).await;
        let app = app(state);

        let blank = app
            .clone()
            .oneshot(post_json("/api/chat", Some(KEY), json!({"message": "   "})))
            .await
            .unwrap();
        assert_eq!(blank.status(), StatusCode::BAD_REQUEST);

        let real = app
            .oneshot(post_json("/api/chat", Some(KEY), json!({"message": "Hi"})))
            .await
            .unwrap();
        assert_eq!(real.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_store_down_serves_without_remaining_header() {
        let store: Arc<dyn QuotaStore> = Arc::new(
            RedisQuotaStore::new(
                RedisQuotaConfig::new("redis://127.0.0.1:1").with_timeout(Duration::from_millis(200)),
            )
            .unwrap(),
        );
        let response = app(state_with(store, chain(), 5).await)
            .oneshot(post_json("/api/chat", Some(KEY), json!({"message": "Hi"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("x-ratelimit-remaining").is_none());
        assert_eq!(response.headers()["x-ratelimit-limit"], "5");
    }
}
