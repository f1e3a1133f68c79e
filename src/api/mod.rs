//! HTTP API for Chatgate
//!
//! - `generate`: `POST /api/chat`, `POST /api/v1/generate`
//! - `quota`: `GET /api/v1/quota`
//! - `health`: `GET /health`, `GET /health/detailed`, `GET /metrics`

pub mod error;
pub mod generate;
pub mod health;
pub mod quota;

use crate::server::AppState;
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::{Extension, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub use generate::generate_routes;
pub use health::health_routes;
pub use quota::quota_routes;

/// Requests left today; omitted when the quota store is unreachable
pub const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
/// Caller's daily limit
pub const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");

/// Create the application router with every endpoint
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .merge(generate_routes())
        .merge(quota_routes())
        .merge(health_routes())
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin: {}", e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-api-key"),
        ])
        .expose_headers([RATE_LIMIT_REMAINING, RATE_LIMIT_LIMIT])
}
