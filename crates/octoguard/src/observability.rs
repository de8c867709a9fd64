//! Logging and OpenTelemetry setup for applications embedding the client.
//!
//! The client crates only emit `tracing` events and OpenTelemetry instruments.
//! Nothing is exported until an application installs a subscriber and meter
//! provider, either its own or the stdout pipeline built here.

use opentelemetry::{KeyValue, global, trace::TracerProvider};
use opentelemetry_sdk::{
    Resource,
    metrics::{PeriodicReader, SdkMeterProvider},
    trace::SdkTracerProvider,
};
use opentelemetry_stdout::{MetricExporter, SpanExporter};
use std::env;
use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

static PROVIDERS: OnceLock<Providers> = OnceLock::new();

struct Providers {
    tracer: SdkTracerProvider,
    meter: SdkMeterProvider,
}

/// Configuration for logging and telemetry export.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Service name attached to spans and metrics
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Log level filter used when `RUST_LOG` is unset
    pub log_level: String,
    /// Emit JSON log lines
    pub json_logs: bool,
    /// Export client metrics to stdout
    pub export_metrics: bool,
}

impl ObservabilityConfig {
    /// Create a configuration for `service_name`.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            json_logs: false,
            export_metrics: true,
        }
    }

    /// Set the service version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = version.into();
        self
    }

    /// Set the log level.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable JSON-formatted logs.
    pub fn with_json_logs(mut self, enabled: bool) -> Self {
        self.json_logs = enabled;
        self
    }

    /// Enable or disable the stdout metrics exporter.
    pub fn with_metrics_export(mut self, enabled: bool) -> Self {
        self.export_metrics = enabled;
        self
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"))
    }
}

/// Initialize logging and telemetry with the default configuration.
pub fn init_observability() -> Result<(), Box<dyn std::error::Error>> {
    init_observability_with_config(ObservabilityConfig::default())
}

/// Initialize logging and telemetry.
///
/// This sets up:
/// - A `tracing` subscriber with an env filter and text or JSON output
/// - A tracer provider bridging spans to the stdout exporter
/// - A meter provider that periodically exports the client's request,
///   error, cache and rate limit instruments
///
/// Fails if a global subscriber is already installed.
pub fn init_observability_with_config(
    config: ObservabilityConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let resource = Resource::builder()
        .with_service_name(config.service_name.clone())
        .with_attributes(vec![KeyValue::new(
            "service.version",
            config.service_version.clone(),
        )])
        .build();

    let tracer_provider = SdkTracerProvider::builder()
        .with_simple_exporter(SpanExporter::default())
        .with_resource(resource.clone())
        .build();
    global::set_tracer_provider(tracer_provider.clone());

    let mut meter_builder = SdkMeterProvider::builder().with_resource(resource);
    if config.export_metrics {
        let reader = PeriodicReader::builder(MetricExporter::default()).build();
        meter_builder = meter_builder.with_reader(reader);
    }
    let meter_provider = meter_builder.build();
    global::set_meter_provider(meter_provider.clone());

    let tracer = tracer_provider.tracer(config.service_name.clone());
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.log_level))?;

    let fmt_layer = if config.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_level(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()?;

    let _ = PROVIDERS.set(Providers {
        tracer: tracer_provider,
        meter: meter_provider,
    });

    Ok(())
}

/// Flush and shut down the providers installed by
/// [`init_observability_with_config`]. Safe to call when nothing was
/// initialized.
pub fn shutdown_observability() {
    if let Some(providers) = PROVIDERS.get() {
        if let Err(e) = providers.meter.shutdown() {
            eprintln!("Failed to shut down meter provider: {e}");
        }
        if let Err(e) = providers.tracer.shutdown() {
            eprintln!("Failed to shut down tracer provider: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builders() {
        let config = ObservabilityConfig::new("svc")
            .with_version("9.9.9")
            .with_log_level("debug")
            .with_json_logs(true)
            .with_metrics_export(false);

        assert_eq!(config.service_name, "svc");
        assert_eq!(config.service_version, "9.9.9");
        assert_eq!(config.log_level, "debug");
        assert!(config.json_logs);
        assert!(!config.export_metrics);
    }

    #[test]
    fn test_shutdown_without_init() {
        shutdown_observability();
    }
}
