//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroU64},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "brezza";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_CACHE_POSTS_TTL_SECS: u64 = 600;
const DEFAULT_CACHE_COMMENTS_TTL_SECS: u64 = 300;
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;
const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u64 = 100;
const DEFAULT_WRITE_RATE_LIMIT_WINDOW_SECS: u64 = 60;
const DEFAULT_WRITE_RATE_LIMIT_MAX_REQUESTS: u64 = 30;
const DEFAULT_CHAT_RESPONSE_TTL_SECS: u64 = 3600;
const DEFAULT_CHAT_SESSION_TTL_SECS: u64 = 7200;
const DEFAULT_CHAT_HISTORY_LIMIT: u32 = 20;
const DEFAULT_CHAT_MESSAGE_LIMIT: u32 = 10;
const DEFAULT_CHAT_MESSAGE_WINDOW_SECS: u64 = 60;
const DEFAULT_MAINTENANCE_SWEEP_INTERVAL_SECS: u64 = 60;

/// Command-line arguments for the Brezza binary.
#[derive(Debug, Parser)]
#[command(name = "brezza", version, about = "Brezza blog API server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "BREZZA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the Brezza HTTP service.
    Serve(Box<ServeArgs>),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Toggle the shared response cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override the cached post response TTL.
    #[arg(long = "cache-posts-ttl-seconds", value_name = "SECONDS")]
    pub cache_posts_ttl_seconds: Option<u64>,

    /// Override the cached comment response TTL.
    #[arg(long = "cache-comments-ttl-seconds", value_name = "SECONDS")]
    pub cache_comments_ttl_seconds: Option<u64>,

    /// Override the general rate limit window size.
    #[arg(long = "rate-limit-window-seconds", value_name = "SECONDS")]
    pub rate_limit_window_seconds: Option<u64>,

    /// Override the general rate limit request ceiling.
    #[arg(long = "rate-limit-max-requests", value_name = "COUNT")]
    pub rate_limit_max_requests: Option<u64>,

    /// Roll failed requests back out of the general rate limit window.
    #[arg(
        long = "rate-limit-skip-failed",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub rate_limit_skip_failed: Option<bool>,

    /// Override the write rate limit window size.
    #[arg(long = "write-rate-limit-window-seconds", value_name = "SECONDS")]
    pub write_rate_limit_window_seconds: Option<u64>,

    /// Override the write rate limit request ceiling.
    #[arg(long = "write-rate-limit-max-requests", value_name = "COUNT")]
    pub write_rate_limit_max_requests: Option<u64>,

    /// Roll failed requests back out of the write rate limit window.
    #[arg(
        long = "write-rate-limit-skip-failed",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub write_rate_limit_skip_failed: Option<bool>,

    /// Override the chat response cache TTL.
    #[arg(long = "chat-response-ttl-seconds", value_name = "SECONDS")]
    pub chat_response_ttl_seconds: Option<u64>,

    /// Override the chat session history TTL.
    #[arg(long = "chat-session-ttl-seconds", value_name = "SECONDS")]
    pub chat_session_ttl_seconds: Option<u64>,

    /// Override the stored chat history length.
    #[arg(long = "chat-history-limit", value_name = "COUNT")]
    pub chat_history_limit: Option<u32>,

    /// Override the per-user chat message ceiling.
    #[arg(long = "chat-message-limit", value_name = "COUNT")]
    pub chat_message_limit: Option<u32>,

    /// Override the per-user chat message window.
    #[arg(long = "chat-message-window-seconds", value_name = "SECONDS")]
    pub chat_message_window_seconds: Option<u64>,

    /// Override the maintenance sweep cadence.
    #[arg(long = "maintenance-sweep-interval-seconds", value_name = "SECONDS")]
    pub maintenance_sweep_interval_seconds: Option<u64>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
    pub rate_limit: RateLimitSettings,
    pub write_rate_limit: RateLimitSettings,
    pub chat: ChatSettings,
    pub maintenance: MaintenanceSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub posts_ttl_seconds: NonZeroU64,
    pub comments_ttl_seconds: NonZeroU64,
}

/// One rate-limiter instance; the general and write ceilings each get one.
#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    pub window_seconds: NonZeroU64,
    pub max_requests: NonZeroU32,
    pub skip_failed: bool,
}

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub response_ttl_seconds: NonZeroU64,
    pub session_ttl_seconds: NonZeroU64,
    pub history_limit: NonZeroU32,
    pub message_limit: NonZeroU32,
    pub message_window_seconds: NonZeroU64,
}

#[derive(Debug, Clone)]
pub struct MaintenanceSettings {
    pub sweep_interval: Duration,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("BREZZA").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
    rate_limit: RawRateLimitSettings,
    write_rate_limit: RawRateLimitSettings,
    chat: RawChatSettings,
    maintenance: RawMaintenanceSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
        if let Some(ttl) = overrides.cache_posts_ttl_seconds {
            self.cache.posts_ttl_seconds = Some(ttl);
        }
        if let Some(ttl) = overrides.cache_comments_ttl_seconds {
            self.cache.comments_ttl_seconds = Some(ttl);
        }
        if let Some(window) = overrides.rate_limit_window_seconds {
            self.rate_limit.window_seconds = Some(window);
        }
        if let Some(max) = overrides.rate_limit_max_requests {
            self.rate_limit.max_requests = Some(max);
        }
        if let Some(skip) = overrides.rate_limit_skip_failed {
            self.rate_limit.skip_failed = Some(skip);
        }
        if let Some(window) = overrides.write_rate_limit_window_seconds {
            self.write_rate_limit.window_seconds = Some(window);
        }
        if let Some(max) = overrides.write_rate_limit_max_requests {
            self.write_rate_limit.max_requests = Some(max);
        }
        if let Some(skip) = overrides.write_rate_limit_skip_failed {
            self.write_rate_limit.skip_failed = Some(skip);
        }
        if let Some(ttl) = overrides.chat_response_ttl_seconds {
            self.chat.response_ttl_seconds = Some(ttl);
        }
        if let Some(ttl) = overrides.chat_session_ttl_seconds {
            self.chat.session_ttl_seconds = Some(ttl);
        }
        if let Some(limit) = overrides.chat_history_limit {
            self.chat.history_limit = Some(limit);
        }
        if let Some(limit) = overrides.chat_message_limit {
            self.chat.message_limit = Some(limit);
        }
        if let Some(window) = overrides.chat_message_window_seconds {
            self.chat.message_window_seconds = Some(window);
        }
        if let Some(interval) = overrides.maintenance_sweep_interval_seconds {
            self.maintenance.sweep_interval_seconds = Some(interval);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            cache,
            rate_limit,
            write_rate_limit,
            chat,
            maintenance,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let cache = build_cache_settings(cache)?;
        let rate_limit = build_rate_limit_settings(rate_limit)?;
        let write_rate_limit = build_write_rate_limit_settings(write_rate_limit)?;
        let chat = build_chat_settings(chat)?;
        let maintenance = build_maintenance_settings(maintenance)?;

        Ok(Self {
            server,
            logging,
            cache,
            rate_limit,
            write_rate_limit,
            chat,
            maintenance,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    Ok(ServerSettings { addr })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let enabled = cache.enabled.unwrap_or(true);

    let posts_ttl = cache
        .posts_ttl_seconds
        .unwrap_or(DEFAULT_CACHE_POSTS_TTL_SECS);
    let comments_ttl = cache
        .comments_ttl_seconds
        .unwrap_or(DEFAULT_CACHE_COMMENTS_TTL_SECS);

    Ok(CacheSettings {
        enabled,
        posts_ttl_seconds: non_zero_u64(posts_ttl, "cache.posts_ttl_seconds")?,
        comments_ttl_seconds: non_zero_u64(comments_ttl, "cache.comments_ttl_seconds")?,
    })
}

fn build_rate_limit_settings(
    rate_limit: RawRateLimitSettings,
) -> Result<RateLimitSettings, LoadError> {
    let window = rate_limit
        .window_seconds
        .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECS);
    let max = rate_limit
        .max_requests
        .unwrap_or(DEFAULT_RATE_LIMIT_MAX_REQUESTS);

    Ok(RateLimitSettings {
        window_seconds: non_zero_u64(window, "rate_limit.window_seconds")?,
        max_requests: non_zero_u32(max, "rate_limit.max_requests")?,
        skip_failed: rate_limit.skip_failed.unwrap_or(false),
    })
}

fn build_write_rate_limit_settings(
    rate_limit: RawRateLimitSettings,
) -> Result<RateLimitSettings, LoadError> {
    let window = rate_limit
        .window_seconds
        .unwrap_or(DEFAULT_WRITE_RATE_LIMIT_WINDOW_SECS);
    let max = rate_limit
        .max_requests
        .unwrap_or(DEFAULT_WRITE_RATE_LIMIT_MAX_REQUESTS);

    Ok(RateLimitSettings {
        window_seconds: non_zero_u64(window, "write_rate_limit.window_seconds")?,
        max_requests: non_zero_u32(max, "write_rate_limit.max_requests")?,
        skip_failed: rate_limit.skip_failed.unwrap_or(false),
    })
}

fn build_chat_settings(chat: RawChatSettings) -> Result<ChatSettings, LoadError> {
    let response_ttl = chat
        .response_ttl_seconds
        .unwrap_or(DEFAULT_CHAT_RESPONSE_TTL_SECS);
    let session_ttl = chat
        .session_ttl_seconds
        .unwrap_or(DEFAULT_CHAT_SESSION_TTL_SECS);
    let history_limit = chat.history_limit.unwrap_or(DEFAULT_CHAT_HISTORY_LIMIT);
    let message_limit = chat.message_limit.unwrap_or(DEFAULT_CHAT_MESSAGE_LIMIT);
    let message_window = chat
        .message_window_seconds
        .unwrap_or(DEFAULT_CHAT_MESSAGE_WINDOW_SECS);

    Ok(ChatSettings {
        response_ttl_seconds: non_zero_u64(response_ttl, "chat.response_ttl_seconds")?,
        session_ttl_seconds: non_zero_u64(session_ttl, "chat.session_ttl_seconds")?,
        history_limit: non_zero_u32(history_limit.into(), "chat.history_limit")?,
        message_limit: non_zero_u32(message_limit.into(), "chat.message_limit")?,
        message_window_seconds: non_zero_u64(message_window, "chat.message_window_seconds")?,
    })
}

fn build_maintenance_settings(
    maintenance: RawMaintenanceSettings,
) -> Result<MaintenanceSettings, LoadError> {
    let sweep_seconds = maintenance
        .sweep_interval_seconds
        .unwrap_or(DEFAULT_MAINTENANCE_SWEEP_INTERVAL_SECS);
    if sweep_seconds == 0 {
        return Err(LoadError::invalid(
            "maintenance.sweep_interval_seconds",
            "must be greater than zero",
        ));
    }

    Ok(MaintenanceSettings {
        sweep_interval: Duration::from_secs(sweep_seconds),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    posts_ttl_seconds: Option<u64>,
    comments_ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRateLimitSettings {
    window_seconds: Option<u64>,
    max_requests: Option<u64>,
    skip_failed: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawChatSettings {
    response_ttl_seconds: Option<u64>,
    session_ttl_seconds: Option<u64>,
    history_limit: Option<u32>,
    message_limit: Option<u32>,
    message_window_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawMaintenanceSettings {
    sweep_interval_seconds: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_zero_u64(value: u64, key: &'static str) -> Result<NonZeroU64, LoadError> {
    NonZeroU64::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_take_highest_precedence() {
        let mut raw = RawSettings::default();
        raw.server.port = Some(4000);
        raw.logging.level = Some("info".to_string());

        let overrides = ServeOverrides {
            server_port: Some(4321),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };

        raw.apply_serve_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(settings.server.addr.port(), 4321);
        assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    }

    #[test]
    fn cache_ttls_use_documented_defaults() {
        let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
        assert!(settings.cache.enabled);
        assert_eq!(settings.cache.posts_ttl_seconds.get(), 600);
        assert_eq!(settings.cache.comments_ttl_seconds.get(), 300);
    }

    #[test]
    fn rate_limits_default_to_tiered_ceilings() {
        let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

        assert_eq!(settings.rate_limit.window_seconds.get(), 60);
        assert_eq!(settings.rate_limit.max_requests.get(), 100);
        assert!(!settings.rate_limit.skip_failed);

        assert_eq!(settings.write_rate_limit.window_seconds.get(), 60);
        assert_eq!(settings.write_rate_limit.max_requests.get(), 30);
        assert!(!settings.write_rate_limit.skip_failed);
    }

    #[test]
    fn chat_defaults_cover_every_knob() {
        let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
        assert_eq!(settings.chat.response_ttl_seconds.get(), 3600);
        assert_eq!(settings.chat.session_ttl_seconds.get(), 7200);
        assert_eq!(settings.chat.history_limit.get(), 20);
        assert_eq!(settings.chat.message_limit.get(), 10);
        assert_eq!(settings.chat.message_window_seconds.get(), 60);
    }

    #[test]
    fn maintenance_sweep_defaults_to_one_minute() {
        let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
        assert_eq!(settings.maintenance.sweep_interval, Duration::from_secs(60));
    }

    #[test]
    fn zero_rate_limit_window_is_rejected() {
        let mut raw = RawSettings::default();
        raw.rate_limit.window_seconds = Some(0);

        let error = Settings::from_raw(raw).expect_err("zero window must not validate");
        assert!(matches!(
            error,
            LoadError::Invalid {
                key: "rate_limit.window_seconds",
                ..
            }
        ));
    }

    #[test]
    fn cli_json_logging_enforces_format() {
        let mut raw = RawSettings::default();
        let overrides = ServeOverrides {
            log_json: Some(true),
            ..Default::default()
        };

        raw.apply_serve_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert!(matches!(settings.logging.format, LogFormat::Json));
    }

    #[test]
    fn default_to_serve_command() {
        let args = CliArgs::parse_from(["brezza"]);
        let command = args
            .command
            .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
        assert!(matches!(command, Command::Serve(_)));
    }

    #[test]
    fn parse_serve_overrides() {
        let args = CliArgs::parse_from([
            "brezza",
            "serve",
            "--server-host",
            "0.0.0.0",
            "--cache-enabled=false",
            "--write-rate-limit-max-requests",
            "5",
        ]);

        match args.command.expect("serve command") {
            Command::Serve(serve) => {
                assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
                assert_eq!(serve.overrides.cache_enabled, Some(false));
                assert_eq!(serve.overrides.write_rate_limit_max_requests, Some(5));
            }
        }
    }
}
