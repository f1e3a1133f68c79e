//! Health check endpoints with component-level diagnostics.
//!
//! - `/health`: simple status + version (for load balancers)
//! - `/health/detailed`: quota store, usage storage and provider chain (API key required)
//! - `/metrics`: Prometheus text export (API key required)

use crate::middleware::auth::RequireCaller;
use crate::server::AppState;
use axum::extract::Extension;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use chatgate_core::QuotaStore;
use serde::Serialize;

/// Simple health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Detailed health response with per-component checks
#[derive(Debug, Serialize)]
pub struct DetailedHealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub checks: HealthChecks,
}

/// All component health checks
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub quota_store: ComponentHealth,
    pub storage: ComponentHealth,
    pub providers: ComponentHealth,
}

/// Individual component health status
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ComponentHealth {
    fn healthy(latency_ms: u64, details: Option<serde_json::Value>) -> Self {
        Self {
            status: "healthy",
            latency_ms: Some(latency_ms),
            error: None,
            details,
        }
    }

    fn unhealthy(error: String, details: Option<serde_json::Value>) -> Self {
        Self {
            status: "unhealthy",
            latency_ms: None,
            error: Some(error),
            details,
        }
    }
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn detailed_health_check(
    RequireCaller(_caller): RequireCaller,
    Extension(state): Extension<AppState>,
) -> Json<DetailedHealthResponse> {
    let store = state.gateway.gate().store();
    let backend = serde_json::json!({ "backend": store.backend() });
    let quota_store = match store.ping().await {
        Ok(latency) => ComponentHealth::healthy(latency.as_millis() as u64, Some(backend)),
        Err(e) => ComponentHealth::unhealthy(e.to_string(), Some(backend)),
    };

    let storage = match state.storage.health_check().await {
        Ok(latency) => ComponentHealth::healthy(latency.as_millis() as u64, None),
        Err(e) => ComponentHealth::unhealthy(e.to_string(), None),
    };

    let chain = state.gateway.dispatcher().chain();
    let providers = ComponentHealth::healthy(0, Some(serde_json::json!({ "chain": chain })));

    // A down quota store degrades the service; requests fail open
    let status = match (quota_store.status, storage.status) {
        ("healthy", "healthy") => "healthy",
        (_, "healthy") => "degraded",
        _ => "unhealthy",
    };

    Json(DetailedHealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        checks: HealthChecks {
            quota_store,
            storage,
            providers,
        },
    })
}

async fn metrics_endpoint(
    RequireCaller(_caller): RequireCaller,
    Extension(state): Extension<AppState>,
) -> String {
    state.gateway.metrics().registry().export_prometheus()
}

/// Create health routes
pub fn health_routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/detailed", get(detailed_health_check))
        .route("/metrics", get(metrics_endpoint))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::router;
    use crate::api::test_support::{get, json_body, post_json, state, KEY};
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use chatgate_llm::{Dispatcher, ScriptedProvider};
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn chain() -> Dispatcher {
        Dispatcher::new()
            .with_provider(Arc::new(ScriptedProvider::replying("ollama", "ok")))
            .with_provider(Arc::new(ScriptedProvider::replying("huggingface", "ok")))
    }

    #[test]
    fn test_component_health_unhealthy() {
        let h = ComponentHealth::unhealthy("connection refused".to_string(), None);
        assert_eq!(h.status, "unhealthy");
        assert!(h.latency_ms.is_none());
        assert_eq!(h.error.as_deref(), Some("connection refused"));
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(state(chain(), 1).await, &[])
            .oneshot(get("/health", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_detailed_health_lists_chain() {
        let response = router(state(chain(), 1).await, &[])
            .oneshot(get("/health/detailed", Some(KEY)))
            .await
            .unwrap();
        let body = json_body(response).await;

        assert_eq!(body["status"], "healthy");
        assert_eq!(body["checks"]["quota_store"]["details"]["backend"], "memory");
        assert_eq!(body["checks"]["storage"]["status"], "healthy");
        assert_eq!(
            body["checks"]["providers"]["details"]["chain"],
            json!(["ollama", "huggingface"])
        );
    }

    #[tokio::test]
    async fn test_metrics_export_after_request() {
        let app = router(state(chain(), 1).await, &[]);
        app.clone()
            .oneshot(post_json("/api/chat", Some(KEY), json!({"message": "Hi"})))
            .await
            .unwrap();

        let response = app.oneshot(get("/metrics", Some(KEY))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();

        assert!(text.contains("# HELP chatgate_requests_total"));
        assert!(text.contains(r#"chatgate_requests_total{outcome="served"} 1"#));
        assert!(text.contains(r#"chatgate_dispatch_attempts_total{provider="ollama",status="success"} 1"#));
    }

    #[tokio::test]
    async fn test_diagnostics_require_api_key() {
        let app = router(state(chain(), 1).await, &[]);

        for uri in ["/health/detailed", "/metrics"] {
            let response = app.clone().oneshot(get(uri, None)).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
            assert_eq!(json_body(response).await["code"], "INVALID_CREDENTIAL");

            let response = app
                .clone()
                .oneshot(get(uri, Some("ak_not_a_real_key")))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }

        let response = app.oneshot(get("/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
