use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::front::METRIC_REGION_BUILD_MS;
use crate::cache::{
    METRIC_CACHE_ERROR, METRIC_CACHE_HIT, METRIC_CACHE_MISS, METRIC_INVALIDATION_CONSUME_MS,
    METRIC_INVALIDATION_TOTAL,
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
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
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

/// Register descriptions for every metric the engine emits.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_CACHE_HIT,
            Unit::Count,
            "Front cache lookups answered from the backend."
        );
        describe_counter!(
            METRIC_CACHE_MISS,
            Unit::Count,
            "Front cache lookups that fell through to a rebuild."
        );
        describe_counter!(
            METRIC_CACHE_ERROR,
            Unit::Count,
            "Cache backend failures absorbed by the fail-open path."
        );
        describe_counter!(
            METRIC_INVALIDATION_TOTAL,
            Unit::Count,
            "Fronts cleared by invalidation, labelled by scope."
        );
        describe_histogram!(
            METRIC_INVALIDATION_CONSUME_MS,
            Unit::Milliseconds,
            "Invalidation batch latency in milliseconds."
        );
        describe_histogram!(
            METRIC_REGION_BUILD_MS,
            Unit::Milliseconds,
            "Region build latency on cache miss, labelled by front type."
        );
    });
}
