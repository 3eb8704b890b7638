//! Liveness endpoint. A degraded cache backend is reported, not fatal; the
//! service keeps answering without it.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::infra::http::api::state::ApiState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub cache: &'static str,
}

pub async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let cache = if state.cache.is_ready() {
        "ready"
    } else {
        "degraded"
    };
    Json(HealthResponse {
        status: "ok",
        cache,
    })
}
