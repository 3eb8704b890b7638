use std::{process, sync::Arc, time::Duration};

use brezza::{
    application::{
        chat::{ChatService, ChatSessions, EchoResponder},
        comments::CommentService,
        error::AppError,
        posts::PostService,
        repos::{CommentsRepo, PostsRepo},
    },
    cache::{
        CacheConfig, CacheInvalidator, CacheStore, ChatCacheConfig, ChatCacheService,
        MemoryBackend, RateLimitConfig, RateLimiter,
    },
    config,
    infra::{db::MemoryRepositories, error::InfraError, http, telemetry},
};
use tracing::{Dispatch, Level, debug, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let app = build_application_context(&settings);

    app.store.connect().await;

    let sweeper_handle = spawn_maintenance_sweeper(
        app.backend.clone(),
        app.sessions.clone(),
        settings.maintenance.sweep_interval,
    );

    let result = serve_http(&settings, app.api_state).await;

    sweeper_handle.abort();
    let _ = sweeper_handle.await;
    app.store.shutdown();

    result
}

struct ApplicationContext {
    api_state: http::ApiState,
    backend: Arc<MemoryBackend>,
    store: Arc<CacheStore>,
    sessions: Arc<ChatSessions>,
}

fn build_application_context(settings: &config::Settings) -> ApplicationContext {
    let backend = Arc::new(MemoryBackend::new());
    let cache_config = CacheConfig::from(&settings.cache);
    let store = Arc::new(CacheStore::new(backend.clone(), cache_config.enabled));
    let invalidator = Arc::new(CacheInvalidator::new(store.clone()));

    let api_limiter = Arc::new(RateLimiter::new(
        store.clone(),
        "api",
        RateLimitConfig::from(&settings.rate_limit),
    ));
    let write_limiter = Arc::new(RateLimiter::new(
        store.clone(),
        "write",
        RateLimitConfig::from(&settings.write_rate_limit),
    ));

    let repositories = Arc::new(MemoryRepositories::new());
    let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
    let comments_repo: Arc<dyn CommentsRepo> = repositories;

    let posts = Arc::new(PostService::new(posts_repo, invalidator.clone()));
    let comments = Arc::new(CommentService::new(comments_repo, invalidator));

    let chat_cache = Arc::new(ChatCacheService::new(
        store.clone(),
        ChatCacheConfig::from(&settings.chat),
    ));
    let sessions = Arc::new(ChatSessions::new());
    let chat = Arc::new(ChatService::new(
        chat_cache,
        sessions.clone(),
        Arc::new(EchoResponder),
    ));

    let api_state = http::ApiState {
        posts,
        comments,
        chat,
        cache: store.clone(),
        cache_config,
        api_limiter,
        write_limiter,
    };

    ApplicationContext {
        api_state,
        backend,
        store,
        sessions,
    }
}

fn spawn_maintenance_sweeper(
    backend: Arc<MemoryBackend>,
    sessions: Arc<ChatSessions>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await; // Skip the first immediate tick
        loop {
            interval.tick().await;
            let expired = backend.sweep();
            let idle = sessions.sweep();
            if expired > 0 || idle > 0 {
                debug!(expired, idle_sessions = idle, "maintenance sweep");
            }
        }
    })
}

async fn serve_http(
    settings: &config::Settings,
    api_state: http::ApiState,
) -> Result<(), AppError> {
    let router = http::build_router(api_state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "brezza::http",
        addr = %settings.server.addr,
        "serving API"
    );

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}
