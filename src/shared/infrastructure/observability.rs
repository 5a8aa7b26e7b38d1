// Observability port.
//
// Components receive an `Arc<dyn Metrics>` at construction instead of touching a
// process-wide registry, so tests can inspect what was recorded and the binary can
// route everything to the `metrics` facade.

use metrics::{Label, counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::collections::HashMap;
use std::sync::Mutex;

pub mod names {
    pub const EVENTS_STORED_TOTAL: &str = "status_app_events_stored_total";
    pub const EVENTS_LOADED_TOTAL: &str = "status_app_events_loaded_total";
    pub const EVENT_STORE_ERRORS_TOTAL: &str = "status_app_events_errors_total";
    pub const NOTIFICATIONS_FAILED_TOTAL: &str = "status_app_notifications_failed_total";
    pub const PROJECTION_UPDATES_TOTAL: &str = "status_app_projections_updates_total";
    pub const PROJECTION_ERRORS_TOTAL: &str = "status_app_projections_errors_total";
    pub const PROJECTION_LAG_SECONDS: &str = "status_app_projections_lag_seconds";
    pub const PROJECTION_PROCESSING_SECONDS: &str =
        "status_app_projections_processing_duration_seconds";
}

pub type MetricLabels<'a> = &'a [(&'static str, String)];

pub trait Metrics: Send + Sync {
    fn increment_counter(&self, name: &'static str, labels: MetricLabels<'_>);
    fn set_gauge(&self, name: &'static str, value: f64, labels: MetricLabels<'_>);
    fn record_histogram(&self, name: &'static str, value: f64, labels: MetricLabels<'_>);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {
    fn increment_counter(&self, _name: &'static str, _labels: MetricLabels<'_>) {}
    fn set_gauge(&self, _name: &'static str, _value: f64, _labels: MetricLabels<'_>) {}
    fn record_histogram(&self, _name: &'static str, _value: f64, _labels: MetricLabels<'_>) {}
}

/// Forwards to whatever recorder is installed for the `metrics` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsFacade;

impl MetricsFacade {
    pub fn describe() {
        describe_counter!(names::EVENTS_STORED_TOTAL, "Total number of events stored by type");
        describe_counter!(names::EVENTS_LOADED_TOTAL, "Total number of events loaded by type");
        describe_counter!(
            names::EVENT_STORE_ERRORS_TOTAL,
            "Total number of event store errors by operation"
        );
        describe_counter!(
            names::NOTIFICATIONS_FAILED_TOTAL,
            "Commit notifications that could not be published"
        );
        describe_counter!(
            names::PROJECTION_UPDATES_TOTAL,
            "Total number of projection updates by event type"
        );
        describe_counter!(
            names::PROJECTION_ERRORS_TOTAL,
            "Total number of projection errors by event type"
        );
        describe_gauge!(
            names::PROJECTION_LAG_SECONDS,
            "Lag between event time and projection update in seconds"
        );
        describe_histogram!(
            names::PROJECTION_PROCESSING_SECONDS,
            "Time taken to apply one event to the read models"
        );
    }
}

fn to_labels(labels: MetricLabels<'_>) -> Vec<Label> {
    labels
        .iter()
        .map(|(key, value)| Label::new(*key, value.clone()))
        .collect()
}

impl Metrics for MetricsFacade {
    fn increment_counter(&self, name: &'static str, labels: MetricLabels<'_>) {
        counter!(name, to_labels(labels)).increment(1);
    }

    fn set_gauge(&self, name: &'static str, value: f64, labels: MetricLabels<'_>) {
        gauge!(name, to_labels(labels)).set(value);
    }

    fn record_histogram(&self, name: &'static str, value: f64, labels: MetricLabels<'_>) {
        histogram!(name, to_labels(labels)).record(value);
    }
}

/// Keeps everything in memory. Keys look like `name{k=v,k2=v2}`.
#[derive(Debug, Default)]
pub struct RecordingMetrics {
    counters: Mutex<HashMap<String, u64>>,
    gauges: Mutex<HashMap<String, f64>>,
    histograms: Mutex<HashMap<String, Vec<f64>>>,
}

impl RecordingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &str, labels: MetricLabels<'_>) -> u64 {
        self.counters
            .lock()
            .map(|c| c.get(&series_key(name, labels)).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn gauge(&self, name: &str, labels: MetricLabels<'_>) -> Option<f64> {
        self.gauges
            .lock()
            .ok()
            .and_then(|g| g.get(&series_key(name, labels)).copied())
    }

    pub fn observations(&self, name: &str, labels: MetricLabels<'_>) -> usize {
        self.histograms
            .lock()
            .map(|h| h.get(&series_key(name, labels)).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

fn series_key(name: &str, labels: MetricLabels<'_>) -> String {
    let rendered: Vec<String> = labels.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{name}{{{}}}", rendered.join(","))
}

impl Metrics for RecordingMetrics {
    fn increment_counter(&self, name: &'static str, labels: MetricLabels<'_>) {
        if let Ok(mut counters) = self.counters.lock() {
            *counters.entry(series_key(name, labels)).or_default() += 1;
        }
    }

    fn set_gauge(&self, name: &'static str, value: f64, labels: MetricLabels<'_>) {
        if let Ok(mut gauges) = self.gauges.lock() {
            gauges.insert(series_key(name, labels), value);
        }
    }

    fn record_histogram(&self, name: &'static str, value: f64, labels: MetricLabels<'_>) {
        if let Ok(mut histograms) = self.histograms.lock() {
            histograms
                .entry(series_key(name, labels))
                .or_default()
                .push(value);
        }
    }
}
