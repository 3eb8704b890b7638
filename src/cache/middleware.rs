//! Response cache middleware.
//!
//! Caches successful GET responses in the shared store and serves them back
//! with an `x-cache` marker header. The cache key is the raw request URI, so
//! identical URLs hit and everything else misses; see `keys` for the
//! trade-off notes.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::BodyExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::keys;
use super::store::CacheStore;

/// Marker header: `HIT` when served from cache, `MISS` when the handler ran.
pub const HEADER_CACHE_STATUS: &str = "x-cache";

/// Shared state for one cached route group.
#[derive(Clone)]
pub struct ResponseCacheState {
    pub store: Arc<CacheStore>,
    pub ttl: Duration,
}

/// Stored form of a cacheable response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Middleware for response caching.
///
/// Only GET requests participate. Only 200 OK responses are stored; every
/// other status passes through with just the miss marker. Store failures are
/// invisible here because the store never fails loudly.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn response_cache_layer(
    State(cache): State<ResponseCacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.store.is_ready() {
        return next.run(request).await;
    }

    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let raw_uri = raw_request_uri(&request);
    let key = keys::response_key(&raw_uri);

    if let Some(cached) = cache.store.get_json::<CachedResponse>(&key).await {
        debug!(uri = %raw_uri, outcome = "hit", "serving cached response");
        return build_response(cached);
    }

    debug!(uri = %raw_uri, outcome = "miss", "executing handler");
    let response = next.run(request).await;

    if response.status() != StatusCode::OK {
        return mark_miss(response);
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match BodyExt::collect(body).await {
        Ok(collected) => collected.to_bytes(),
        Err(error) => {
            // The original body is partially consumed at this point, so an
            // empty body is the best that can still be sent.
            warn!(uri = %raw_uri, error = %error, "failed to buffer response body");
            parts
                .headers
                .insert(HEADER_CACHE_STATUS, HeaderValue::from_static("MISS"));
            return Response::from_parts(parts, Body::empty());
        }
    };

    if let Ok(text) = std::str::from_utf8(&bytes) {
        let payload = CachedResponse {
            status: parts.status.as_u16(),
            headers: parts
                .headers
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.to_string(), v.to_string()))
                })
                .collect(),
            body: text.to_string(),
        };
        cache.store.put_json(&key, &payload, cache.ttl).await;
    }

    parts
        .headers
        .insert(HEADER_CACHE_STATUS, HeaderValue::from_static("MISS"));
    Response::from_parts(parts, Body::from(bytes))
}

/// Path plus query exactly as received.
fn raw_request_uri(request: &Request<Body>) -> String {
    match request.uri().path_and_query() {
        Some(pq) => pq.as_str().to_string(),
        None => request.uri().path().to_string(),
    }
}

fn mark_miss(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(HEADER_CACHE_STATUS, HeaderValue::from_static("MISS"));
    response
}

/// Rebuilds a response from its stored form, marked as a hit.
fn build_response(cached: CachedResponse) -> Response {
    let mut builder = Response::builder().status(cached.status);

    for (name, value) in cached.headers {
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, header_value);
        }
    }

    builder = builder.header(HEADER_CACHE_STATUS, HeaderValue::from_static("HIT"));
    builder
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_uri_keeps_query_string_verbatim() {
        let request = Request::builder()
            .uri("/api/v1/posts?page=2&per_page=5")
            .body(Body::empty())
            .unwrap();
        assert_eq!(raw_request_uri(&request), "/api/v1/posts?page=2&per_page=5");
    }

    #[test]
    fn raw_uri_without_query_is_just_the_path() {
        let request = Request::builder()
            .uri("/api/v1/posts")
            .body(Body::empty())
            .unwrap();
        assert_eq!(raw_request_uri(&request), "/api/v1/posts");
    }

    #[tokio::test]
    async fn build_response_restores_payload_and_marks_hit() {
        let cached = CachedResponse {
            status: 200,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: "{\"ok\":true}".to_string(),
        };

        let response = build_response(cached);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(HEADER_CACHE_STATUS).unwrap(),
            "HIT"
        );
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"{\"ok\":true}");
    }

    #[test]
    fn mark_miss_sets_the_marker_header() {
        let response = mark_miss(StatusCode::NOT_FOUND.into_response());
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(HEADER_CACHE_STATUS).unwrap(),
            "MISS"
        );
    }
}
