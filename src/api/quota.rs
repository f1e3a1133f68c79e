//! Quota endpoint
//!
//! GET /api/v1/quota returns the calling key's daily quota without
//! consuming a request.

use crate::middleware::RequireCaller;
use crate::server::AppState;
use axum::{routing::get, Extension, Json, Router};
use chatgate_core::QuotaStatus;

async fn get_quota(
    Extension(state): Extension<AppState>,
    RequireCaller(caller): RequireCaller,
) -> Json<QuotaStatus> {
    Json(state.gateway.quota(&caller).await)
}

/// Create the quota routes.
pub fn quota_routes() -> Router {
    Router::new().route("/api/v1/quota", get(get_quota))
}
