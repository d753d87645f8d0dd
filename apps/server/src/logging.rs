//! Logging and OpenTelemetry initialization
//!
//! The subscriber is assembled from a list of boxed layers: console output,
//! an optional rolling log file and optional OTLP span export, all driven by
//! `LoggingConfig`. `RUST_LOG` overrides the configured level.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    trace::{Config as TraceConfig, Sampler, TracerProvider},
    Resource,
};
use std::time::Duration;
use tracing_appender::{
    non_blocking::{NonBlocking, WorkerGuard},
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::config::LoggingConfig;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps the file writer flushing and shuts the tracer provider down on drop.
/// Hold it for the lifetime of the process.
pub struct TelemetryGuard {
    _file_guard: Option<WorkerGuard>,
    otel_installed: bool,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if self.otel_installed {
            tracing::info!("Flushing OpenTelemetry spans");
            global::shutdown_tracer_provider();
        }
    }
}

/// Install the global subscriber described by `config`.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<TelemetryGuard> {
    let mut layers: Vec<BoxedLayer> = vec![console_layer(config.json)];

    let file_guard = if config.file_enabled {
        let (writer, guard) = file_writer(config)?;
        layers.push(file_layer(config.json, writer));
        Some(guard)
    } else {
        None
    };

    // OTLP failures downgrade to console and file output only
    let (provider, otel_error) = match config
        .opentelemetry_enabled
        .then(|| tracer_provider(config))
        .transpose()
    {
        Ok(provider) => (provider, None),
        Err(e) => (None, Some(e)),
    };
    if let Some(provider) = &provider {
        let tracer = provider.tracer(config.service_name.clone());
        layers.push(
            tracing_opentelemetry::layer()
                .with_tracer(tracer)
                .with_tracked_inactivity(true)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter(&config.level))
        .try_init()?;

    let otel_installed = provider.is_some();
    if let Some(provider) = provider {
        global::set_tracer_provider(provider);
    }
    if let Some(e) = otel_error {
        tracing::warn!(error = %e, "OpenTelemetry disabled: tracer provider failed to start");
    }

    tracing::info!(
        json = config.json,
        file = config.file_enabled,
        otel = otel_installed,
        service_name = %config.service_name,
        environment = %config.deployment_environment,
        "Logging initialized"
    );

    Ok(TelemetryGuard {
        _file_guard: file_guard,
        otel_installed,
    })
}

fn console_layer(json: bool) -> BoxedLayer {
    if json {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(std::io::stdout)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_writer(std::io::stdout)
            .boxed()
    }
}

fn file_layer(json: bool, writer: NonBlocking) -> BoxedLayer {
    if json {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(writer)
            .boxed()
    } else {
        fmt::layer().with_ansi(false).with_writer(writer).boxed()
    }
}

/// Rotation policy by config name
pub fn parse_rotation(name: &str) -> Option<Rotation> {
    match name {
        "daily" => Some(Rotation::DAILY),
        "hourly" => Some(Rotation::HOURLY),
        "minutely" => Some(Rotation::MINUTELY),
        "never" => Some(Rotation::NEVER),
        _ => None,
    }
}

fn file_writer(config: &LoggingConfig) -> anyhow::Result<(NonBlocking, WorkerGuard)> {
    let rotation = parse_rotation(&config.file_rotation).ok_or_else(|| {
        anyhow::anyhow!("Unknown log file rotation: {}", config.file_rotation)
    })?;
    std::fs::create_dir_all(&config.file_directory)?;

    // Rotated files get a date suffix; a never-rotated file needs its own extension
    let prefix = if rotation == Rotation::NEVER {
        format!("{}.log", config.file_prefix)
    } else {
        config.file_prefix.clone()
    };
    let appender = RollingFileAppender::new(rotation, &config.file_directory, prefix);

    Ok(tracing_appender::non_blocking(appender))
}

fn sampler(ratio: f64) -> Sampler {
    if ratio >= 1.0 {
        Sampler::AlwaysOn
    } else if ratio <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(ratio)))
    }
}

/// OTLP/gRPC exporter behind a batch span processor
fn tracer_provider(config: &LoggingConfig) -> anyhow::Result<TracerProvider> {
    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(&config.otlp_endpoint)
        .with_timeout(Duration::from_secs(config.otlp_timeout_seconds))
        .build_span_exporter()?;

    let version = config
        .service_version
        .clone()
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
    let resource = Resource::new([
        KeyValue::new("service.name", config.service_name.clone()),
        KeyValue::new("service.version", version),
        KeyValue::new(
            "deployment.environment",
            config.deployment_environment.clone(),
        ),
    ]);

    Ok(TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_config(
            TraceConfig::default()
                .with_sampler(sampler(config.trace_sample_ratio))
                .with_resource(resource),
        )
        .build())
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "petnet_jobs={level},tower_http=info,hyper=warn,reqwest=warn"
        ))
    })
}

/// `RUST_LOG`-driven console logging through the test writer.
///
/// Later calls are ignored, so every test may call it.
pub fn init_simple_logging() {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(env_filter("info"))
        .try_init();
}
