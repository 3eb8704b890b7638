pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod state;

pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, patch, post},
};

use crate::cache::{ResponseCacheState, response_cache_layer};
use crate::infra::http::middleware::{identify_user, log_responses};

/// Builds the `/api/v1` surface. Cached read routes, identity-gated write
/// routes, and chat sit in separate groups so each carries only its own
/// middleware; the general rate limiter and identity extraction wrap the
/// whole surface.
pub fn build_api_router(state: ApiState) -> Router {
    let posts_cache = ResponseCacheState {
        store: state.cache.clone(),
        ttl: state.cache_config.posts_ttl(),
    };
    let comments_cache = ResponseCacheState {
        store: state.cache.clone(),
        ttl: state.cache_config.comments_ttl(),
    };

    let cached_posts = Router::new()
        .route("/api/v1/posts", get(handlers::list_posts))
        .route("/api/v1/posts/{id}", get(handlers::get_post))
        .layer(axum_middleware::from_fn_with_state(
            posts_cache,
            response_cache_layer,
        ));

    let cached_comments = Router::new()
        .route("/api/v1/posts/{id}/comments", get(handlers::list_comments))
        .layer(axum_middleware::from_fn_with_state(
            comments_cache,
            response_cache_layer,
        ));

    // Session history is per caller, so it must never pass through the
    // shared response cache.
    let chat_reads = Router::new()
        .route(
            "/api/v1/chat/sessions/{id}/history",
            get(handlers::get_chat_history),
        )
        .layer(axum_middleware::from_fn(middleware::require_user));

    let writes = Router::new()
        .route("/api/v1/posts", post(handlers::create_post))
        .route(
            "/api/v1/posts/{id}",
            patch(handlers::update_post).delete(handlers::delete_post),
        )
        .route(
            "/api/v1/posts/{id}/like",
            post(handlers::like_post).delete(handlers::unlike_post),
        )
        .route(
            "/api/v1/posts/{id}/dislike",
            post(handlers::dislike_post).delete(handlers::undislike_post),
        )
        .route("/api/v1/posts/{id}/comments", post(handlers::create_comment))
        .route(
            "/api/v1/comments/{id}/like",
            post(handlers::like_comment).delete(handlers::unlike_comment),
        )
        .route(
            "/api/v1/comments/{id}/dislike",
            post(handlers::dislike_comment).delete(handlers::undislike_comment),
        )
        .route("/api/v1/chat/message", post(handlers::send_chat_message))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::write_rate_limit,
        ))
        .layer(axum_middleware::from_fn(middleware::require_user));

    Router::new()
        .merge(cached_posts)
        .merge(cached_comments)
        .merge(chat_reads)
        .merge(writes)
        .with_state(state.clone())
        .layer(axum_middleware::from_fn_with_state(
            state,
            middleware::api_rate_limit,
        ))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(identify_user))
}
