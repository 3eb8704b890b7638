use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::cache::{HEADER_LIMIT, RateLimiter, apply_headers};
use crate::infra::http::middleware::Principal;

use super::error::ApiError;
use super::state::ApiState;

/// Rejects requests that carry no caller identity. Sits in front of every
/// mutating and chat route.
pub async fn require_user(request: Request<Body>, next: Next) -> Response {
    if request.extensions().get::<Principal>().is_none() {
        return ApiError::unauthorized().into_response();
    }
    next.run(request).await
}

/// General ceiling over the whole API surface.
pub async fn api_rate_limit(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    run_rate_limit(&state.api_limiter, request, next).await
}

/// Stricter ceiling layered onto mutating routes.
pub async fn write_rate_limit(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    run_rate_limit(&state.write_limiter, request, next).await
}

async fn run_rate_limit(limiter: &RateLimiter, request: Request<Body>, next: Next) -> Response {
    let identity = client_identity(&request);
    let decision = limiter.check(&identity).await;
    if !decision.allowed {
        return ApiError::rate_limited(&decision);
    }

    let mut response = next.run(request).await;

    // When limiters stack, the innermost one has already stamped its headers
    // and they describe the tightest applicable limit. Leave them alone.
    if !response.headers().contains_key(HEADER_LIMIT) {
        apply_headers(response.headers_mut(), &decision);
    }

    if limiter.forgives_failures() && response.status().as_u16() >= 400 {
        limiter.forgive(&identity).await;
    }

    response
}

/// Identity the limiter counts by: the authenticated user when present,
/// otherwise the forwarded client address, otherwise a shared bucket.
fn client_identity(request: &Request<Body>) -> String {
    if let Some(principal) = request.extensions().get::<Principal>() {
        return principal.user_id.clone();
    }

    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "anonymous".to_string())
}
