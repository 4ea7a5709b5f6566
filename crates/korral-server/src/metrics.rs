/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Metrics Module
//!
//! Prometheus metrics for the korral server: event ingestion, exec sessions
//! and cluster summaries.

use korral_utils::logging::prelude::*;
use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all server metrics
static REGISTRY: OnceLock<Registry> = OnceLock::new();

fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

/// Watched events processed by the ingestors
/// Labels: cluster, outcome (stored/duplicate/failed/skipped)
pub fn events_ingested_total() -> &'static CounterVec {
    static COUNTER: OnceLock<CounterVec> = OnceLock::new();
    COUNTER.get_or_init(|| {
        let opts = Opts::new(
            "korral_events_ingested_total",
            "Total number of cluster events processed by the ingestors",
        );
        let counter = CounterVec::new(opts, &["cluster", "outcome"])
            .expect("Failed to create events ingested counter");
        registry()
            .register(Box::new(counter.clone()))
            .expect("Failed to register events ingested counter");
        counter
    })
}

/// Number of running event ingestors
pub fn ingestors_running() -> &'static IntGauge {
    static GAUGE: OnceLock<IntGauge> = OnceLock::new();
    GAUGE.get_or_init(|| {
        let gauge = IntGauge::new("korral_ingestors_running", "Number of running event ingestors")
            .expect("Failed to create ingestors gauge");
        registry()
            .register(Box::new(gauge.clone()))
            .expect("Failed to register ingestors gauge");
        gauge
    })
}

/// Number of open exec sessions
pub fn exec_sessions_active() -> &'static IntGauge {
    static GAUGE: OnceLock<IntGauge> = OnceLock::new();
    GAUGE.get_or_init(|| {
        let gauge = IntGauge::new(
            "korral_exec_sessions_active",
            "Number of open interactive exec sessions",
        )
        .expect("Failed to create exec sessions gauge");
        registry()
            .register(Box::new(gauge.clone()))
            .expect("Failed to register exec sessions gauge");
        gauge
    })
}

/// Finished exec sessions
/// Labels: outcome (remote_exited/remote_failed/client_closed/shutdown)
pub fn exec_sessions_total() -> &'static CounterVec {
    static COUNTER: OnceLock<CounterVec> = OnceLock::new();
    COUNTER.get_or_init(|| {
        let opts = Opts::new(
            "korral_exec_sessions_total",
            "Total number of finished interactive exec sessions",
        );
        let counter = CounterVec::new(opts, &["outcome"])
            .expect("Failed to create exec sessions counter");
        registry()
            .register(Box::new(counter.clone()))
            .expect("Failed to register exec sessions counter");
        counter
    })
}

/// Cluster summary fan-out latency
/// Labels: cluster
pub fn summary_duration_seconds() -> &'static HistogramVec {
    static HISTOGRAM: OnceLock<HistogramVec> = OnceLock::new();
    HISTOGRAM.get_or_init(|| {
        let opts = HistogramOpts::new(
            "korral_summary_duration_seconds",
            "Cluster summary latency distribution in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]);
        let histogram = HistogramVec::new(opts, &["cluster"])
            .expect("Failed to create summary duration histogram");
        registry()
            .register(Box::new(histogram.clone()))
            .expect("Failed to register summary duration histogram");
        histogram
    })
}

/// Encodes all registered metrics in Prometheus text format
///
/// # Returns
///
/// Returns a String containing all metrics in Prometheus exposition format
pub fn encode_metrics() -> String {
    // Touch every metric so the exposition lists them before first use
    events_ingested_total();
    ingestors_running();
    exec_sessions_active();
    exec_sessions_total();
    summary_duration_seconds();

    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_lists_gauges() {
        ingestors_running().inc();
        let text = encode_metrics();
        ingestors_running().dec();

        assert!(text.contains("korral_ingestors_running"));
        assert!(text.contains("korral_exec_sessions_active"));
    }

    #[test]
    fn test_labelled_counter_appears_once_used() {
        events_ingested_total()
            .with_label_values(&["metrics-test", "stored"])
            .inc();

        let text = encode_metrics();
        assert!(text.contains("korral_events_ingested_total"));
        assert!(text.contains("cluster=\"metrics-test\""));
    }
}
