/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Korral Telemetry Module
//!
//! OpenTelemetry-based distributed tracing for the korral server.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use korral_utils::{telemetry, Settings};
//!
//! let settings = Settings::new(None)?;
//! telemetry::init(&settings.telemetry, &settings.log)?;
//!
//! tracing::info!("Application started");
//! ```

use crate::config::{Log, Telemetry};
use crate::logging::{self, LoggingError};
use opentelemetry::trace::TracerProvider;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::Sampler;
use opentelemetry_sdk::{runtime, Resource};
use tracing_subscriber::layer::Identity;

/// Error type for telemetry initialization
#[derive(Debug)]
pub enum TelemetryError {
    /// Failed to create OTLP exporter
    ExporterError(String),
    /// Failed to set global subscriber
    SubscriberError(String),
}

impl std::fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelemetryError::ExporterError(e) => write!(f, "OTLP exporter error: {}", e),
            TelemetryError::SubscriberError(e) => write!(f, "Subscriber error: {}", e),
        }
    }
}

impl std::error::Error for TelemetryError {}

impl From<LoggingError> for TelemetryError {
    fn from(e: LoggingError) -> Self {
        TelemetryError::SubscriberError(e.to_string())
    }
}

/// Initialize logging and, when enabled, OpenTelemetry export.
///
/// If telemetry is disabled this installs the plain logging subscriber.
///
/// # Arguments
/// * `config` - Telemetry configuration
/// * `log` - Log level and format
///
/// # Returns
/// * `Ok(())` on success
/// * `Err(TelemetryError)` if initialization fails
pub fn init(config: &Telemetry, log: &Log) -> Result<(), TelemetryError> {
    if !config.enabled {
        logging::install(&log.level, &log.format, None::<Identity>)?;
        return Ok(());
    }

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.otlp_endpoint)
        .build()
        .map_err(|e| TelemetryError::ExporterError(e.to_string()))?;

    let tracer_provider = opentelemetry_sdk::trace::TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_sampler(sampler_for(config.sampling_rate))
        .with_resource(Resource::new(vec![
            KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_NAME,
                config.service_name.clone(),
            ),
            KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            ),
        ]))
        .build();

    let tracer = tracer_provider.tracer(config.service_name.clone());
    opentelemetry::global::set_tracer_provider(tracer_provider);

    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
    logging::install(&log.level, &log.format, Some(otel_layer))?;

    Ok(())
}

fn sampler_for(rate: f64) -> Sampler {
    if rate >= 1.0 {
        Sampler::AlwaysOn
    } else if rate <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(rate)
    }
}

/// Shutdown OpenTelemetry, flushing any pending traces.
pub fn shutdown() {
    opentelemetry::global::shutdown_tracer_provider();
}
