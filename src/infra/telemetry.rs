use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "brezza_cache_hit_total",
            Unit::Count,
            "Total number of response-cache hits, labeled by key prefix."
        );
        describe_counter!(
            "brezza_cache_miss_total",
            Unit::Count,
            "Total number of response-cache misses, labeled by key prefix."
        );
        describe_counter!(
            "brezza_cache_invalidated_total",
            Unit::Count,
            "Total number of cache entries removed by pattern invalidation."
        );
        describe_counter!(
            "brezza_rate_limited_total",
            Unit::Count,
            "Total number of requests rejected by a rate limiter, labeled by scope."
        );
        describe_counter!(
            "brezza_chat_cache_hit_total",
            Unit::Count,
            "Total number of chat replies served from the response cache."
        );
    });
}
