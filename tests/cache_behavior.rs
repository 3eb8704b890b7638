//! Cache lifecycle tests through the assembled router: entries age out by
//! TTL, a backend outage degrades reads without failing them, and pattern
//! invalidation only touches the mutated content.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

use brezza::application::chat::{ChatService, ChatSessions, EchoResponder};
use brezza::application::comments::CommentService;
use brezza::application::posts::PostService;
use brezza::application::repos::{CommentsRepo, PostsRepo};
use brezza::cache::{
    CacheConfig, CacheInvalidator, CacheStore, ChatCacheConfig, ChatCacheService, MemoryBackend,
    RateLimitConfig, RateLimiter,
};
use brezza::infra::db::MemoryRepositories;
use brezza::infra::http::{ApiState, build_router};

struct TestApp {
    router: Router,
    store: Arc<CacheStore>,
}

async fn build_app(cache_config: CacheConfig) -> TestApp {
    let store = Arc::new(CacheStore::new(
        Arc::new(MemoryBackend::new()),
        cache_config.enabled,
    ));
    store.connect().await;
    let invalidator = Arc::new(CacheInvalidator::new(store.clone()));

    let repositories = Arc::new(MemoryRepositories::new());
    let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
    let comments_repo: Arc<dyn CommentsRepo> = repositories;

    let chat_cache = Arc::new(ChatCacheService::new(
        store.clone(),
        ChatCacheConfig::default(),
    ));

    // Hour-long windows so limiter state never interferes with these tests.
    let wide = RateLimitConfig {
        window_seconds: 3600,
        max_requests: 10_000,
        skip_failed: false,
    };

    let state = ApiState {
        posts: Arc::new(PostService::new(posts_repo, invalidator.clone())),
        comments: Arc::new(CommentService::new(comments_repo, invalidator)),
        chat: Arc::new(ChatService::new(
            chat_cache,
            Arc::new(ChatSessions::new()),
            Arc::new(EchoResponder),
        )),
        cache: store.clone(),
        cache_config,
        api_limiter: Arc::new(RateLimiter::new(store.clone(), "api", wide.clone())),
        write_limiter: Arc::new(RateLimiter::new(store.clone(), "write", wide)),
    };

    TestApp {
        router: build_router(state),
        store,
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build")
}

async fn create_post(router: &Router, title: &str) -> String {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/posts")
        .header("x-user-id", "author")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "title": title, "body": "body text" }).to_string(),
        ))
        .expect("request should build");
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router should answer");
    assert_eq!(response.status(), StatusCode::CREATED);
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).expect("body should be JSON");
    body["id"].as_str().expect("created post id").to_string()
}

/// `x-cache` of one GET, or `None` when the response carries no marker.
async fn cache_marker(router: &Router, uri: &str) -> Option<String> {
    let response = router
        .clone()
        .oneshot(get(uri))
        .await
        .expect("router should answer");
    assert_eq!(response.status(), StatusCode::OK);
    response
        .headers()
        .get("x-cache")
        .map(|value| value.to_str().expect("marker is ascii").to_string())
}

#[tokio::test]
async fn cached_responses_age_out_by_ttl() {
    let app = build_app(CacheConfig {
        enabled: true,
        posts_ttl_seconds: 1,
        comments_ttl_seconds: 1,
    })
    .await;
    let post_id = create_post(&app.router, "Short lived").await;
    let uri = format!("/api/v1/posts/{post_id}");

    assert_eq!(cache_marker(&app.router, &uri).await.as_deref(), Some("MISS"));
    assert_eq!(cache_marker(&app.router, &uri).await.as_deref(), Some("HIT"));

    tokio::time::sleep(Duration::from_millis(1200)).await;

    assert_eq!(
        cache_marker(&app.router, &uri).await.as_deref(),
        Some("MISS"),
        "the entry expired, so the read repopulates"
    );
    assert_eq!(cache_marker(&app.router, &uri).await.as_deref(), Some("HIT"));
}

#[tokio::test]
async fn backend_outage_degrades_reads_and_admits_writes() {
    let app = build_app(CacheConfig::default()).await;
    let post_id = create_post(&app.router, "Durable").await;
    let uri = format!("/api/v1/posts/{post_id}");

    assert_eq!(cache_marker(&app.router, &uri).await.as_deref(), Some("MISS"));
    assert_eq!(cache_marker(&app.router, &uri).await.as_deref(), Some("HIT"));

    // Store goes away mid-flight. Reads keep answering from the repository
    // without any cache marker, and writes sail through the open limiter.
    app.store.shutdown();

    let response = app
        .router
        .clone()
        .oneshot(get(&uri))
        .await
        .expect("router should answer");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key("x-cache"));
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).expect("body should be JSON");
    assert_eq!(body["title"], "Durable");

    for i in 0..40 {
        create_post(&app.router, &format!("outage write {i}")).await;
    }

    // Once the backend is reachable again the cache picks back up. The
    // entry stored before the outage never left the backend, so it hits
    // immediately; a fresh post proves new entries get stored too.
    app.store.connect().await;
    assert_eq!(cache_marker(&app.router, &uri).await.as_deref(), Some("HIT"));

    let fresh = create_post(&app.router, "Fresh after recovery").await;
    let fresh_uri = format!("/api/v1/posts/{fresh}");
    assert_eq!(
        cache_marker(&app.router, &fresh_uri).await.as_deref(),
        Some("MISS")
    );
    assert_eq!(
        cache_marker(&app.router, &fresh_uri).await.as_deref(),
        Some("HIT")
    );
}

#[tokio::test]
async fn invalidation_only_touches_the_mutated_post() {
    let app = build_app(CacheConfig::default()).await;
    let first = create_post(&app.router, "First post").await;
    let second = create_post(&app.router, "Second post").await;

    let first_uri = format!("/api/v1/posts/{first}");
    let second_uri = format!("/api/v1/posts/{second}");
    let second_comments_uri = format!("/api/v1/posts/{second}/comments");

    // Prime every cache entry this test watches.
    cache_marker(&app.router, &first_uri).await;
    cache_marker(&app.router, &second_uri).await;
    cache_marker(&app.router, &second_comments_uri).await;
    cache_marker(&app.router, "/api/v1/posts").await;
    assert_eq!(
        cache_marker(&app.router, &second_uri).await.as_deref(),
        Some("HIT")
    );

    let like = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/v1/posts/{first}/like"))
        .header("x-user-id", "reader")
        .body(Body::empty())
        .expect("request should build");
    let response = app
        .router
        .clone()
        .oneshot(like)
        .await
        .expect("router should answer");
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(
        cache_marker(&app.router, &first_uri).await.as_deref(),
        Some("MISS"),
        "the liked post's detail was cleared"
    );
    assert_eq!(
        cache_marker(&app.router, "/api/v1/posts").await.as_deref(),
        Some("MISS"),
        "listings could contain the liked post"
    );
    assert_eq!(
        cache_marker(&app.router, &second_uri).await.as_deref(),
        Some("HIT"),
        "the other post's detail was spared"
    );
    assert_eq!(
        cache_marker(&app.router, &second_comments_uri).await.as_deref(),
        Some("HIT"),
        "the other post's comments were spared"
    );
}

#[tokio::test]
async fn disabled_cache_serves_every_read_fresh() {
    let app = build_app(CacheConfig {
        enabled: false,
        posts_ttl_seconds: 600,
        comments_ttl_seconds: 300,
    })
    .await;
    let post_id = create_post(&app.router, "Uncached").await;
    let uri = format!("/api/v1/posts/{post_id}");

    assert_eq!(cache_marker(&app.router, &uri).await, None);
    assert_eq!(cache_marker(&app.router, &uri).await, None);
}
