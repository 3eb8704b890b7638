pub mod api;
pub mod middleware;

pub use api::{ApiState, build_api_router};

use axum::{Router, middleware as axum_middleware, routing::get};

use middleware::set_request_context;

/// Top-level router: the API surface plus the health probe, which sits
/// outside the rate-limited group so probes never get throttled.
pub fn build_router(state: ApiState) -> Router {
    let health = Router::new()
        .route("/health", get(api::handlers::health))
        .with_state(state.clone());

    health
        .merge(build_api_router(state))
        .layer(axum_middleware::from_fn(set_request_context))
}
