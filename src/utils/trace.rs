//! Sets up tracing for QRM using either stdout or an OTLP/gRPC collector

use opentelemetry::trace::TraceContextExt;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use tracing::Span;
use tracing_core::LevelFilter;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use tracing_subscriber::{filter::Filtered, fmt::Layer, layer::Layered, prelude::*, Registry};

use crate::conf::{LogLevel, Tracing, TracingLocal, TracingServices};

/// Log a message at the info level
#[macro_export]
macro_rules! info {
    ($level:expr, $($msg:tt)+) => {
        if $level == $crate::conf::LogLevel::Info
        || $level == $crate::conf::LogLevel::Debug
        || $level == $crate::conf::LogLevel::Trace {
            println!("{}", serde_json::json!({"timestamp": chrono::Utc::now(), "level": "INFO", "msg": $($msg)+}));
        }
    }
}

/// Log a message at the setup level
#[macro_export]
macro_rules! setup {
    ($level:expr, $($msg:tt)+) => {
        if $level == $crate::conf::LogLevel::Setup
        || $level == $crate::conf::LogLevel::Info
        || $level == $crate::conf::LogLevel::Debug
        || $level == $crate::conf::LogLevel::Trace {
            println!("{}", serde_json::json!({"timestamp": chrono::Utc::now(), "level": "SETP", "msg": $($msg)+}));
        }
    }
}

/// Log a message at the error level
#[macro_export]
macro_rules! error {
    ($level:expr, $($msg:tt)+) => {
        if $level != $crate::conf::LogLevel::Off {
            println!("{}", serde_json::json!({"timestamp": chrono::Utc::now(), "level": "ERRO", "msg": $($msg)+}));
        }
    }
}

/// Get the current trace id if a span is active
pub fn get_trace() -> Option<String> {
    let context = Span::current().context();
    let span = context.span();
    let span_context = span.span_context();
    span_context
        .is_valid()
        .then(|| span_context.trace_id().to_string())
}

/// Set up our gRPC/OTLP tracer
///
/// # Arguments
///
/// * `name` - The name of the service to trace
/// * `endpoint` - The gRPC endpoint to send traces too
/// * `level` - The log level to set
/// * `registry` - The registry to add our tracers too
fn setup_grpc(
    name: &str,
    endpoint: &str,
    level: LogLevel,
    registry: Layered<Filtered<Layer<Registry>, LevelFilter, Registry>, Registry>,
) {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .expect("Failed to build otlp exporter");
    let tracer = opentelemetry_sdk::trace::TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_resource(Resource::new(vec![KeyValue::new("service.name", name.to_string())]))
        .build()
        .tracer(name.to_string());
    let filtered = tracing_opentelemetry::layer()
        .with_tracer(tracer)
        .with_filter(level.to_filter());
    registry
        .with(filtered)
        .try_init()
        .expect("Failed to register opentelemetry tracers/subscribers");
    info!(
        level,
        format!("Sending {} traces for {} to gRPC trace sink at {}", level, name, endpoint)
    );
}

/// Set up our local tracer
///
/// # Arguments
///
/// * `name` - The name of the service to trace
/// * `conf` - The local tracing config
fn setup_local(name: &str, conf: &TracingLocal) -> Filtered<Layer<Registry>, LevelFilter, Registry> {
    info!(conf.level, format!("Sending {} for {name} to stdout", conf.level));
    tracing_subscriber::fmt::layer().with_filter(conf.level.to_filter())
}

/// Set up the correct tracer(s) from a loaded config
///
/// # Arguments
///
/// * `name` - The name of the service to trace
/// * `trace_conf` - The QRM tracing config
pub fn setup(name: &str, trace_conf: &Tracing) {
    let local = setup_local(name, &trace_conf.local);
    let registry = tracing_subscriber::registry().with(local);
    if let Some(external) = &trace_conf.external {
        match external {
            TracingServices::Grpc { endpoint, level } => setup_grpc(name, endpoint, *level, registry),
        }
    } else {
        registry.try_init().expect("Failed to register stdout registry");
    }
}
