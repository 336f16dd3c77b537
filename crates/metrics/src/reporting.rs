use std::collections::HashMap;

use prometheus::{
    core::Collector,
    Gauge,
    HistogramVec,
    IntCounter,
    IntCounterVec,
};

use crate::{
    labels::Labels,
    log_invalid_metric,
};

/// Labels keyed by name, as prometheus resolves a labeled child.
fn label_map(labels: &Labels) -> HashMap<&str, &str> {
    labels
        .iter()
        .map(|label| (label.key, &label.value[..]))
        .collect()
}

pub fn log_counter(counter: &IntCounter, increment: u64) {
    counter.inc_by(increment);
}

/// Mismatched label sets are counted in `invalid_metric_total` rather than
/// dropped silently.
pub fn log_counter_with_labels(counter: &IntCounterVec, increment: u64, labels: Labels) {
    match counter.get_metric_with(&label_map(&labels)) {
        Ok(child) => child.inc_by(increment),
        Err(e) => log_invalid_metric(get_desc(counter), e),
    }
}

pub fn log_gauge(gauge: &Gauge, value: f64) {
    gauge.set(value);
}

pub fn log_distribution_with_labels(histogram: &HistogramVec, value: f64, labels: Labels) {
    match histogram.get_metric_with(&label_map(&labels)) {
        Ok(child) => child.observe(value),
        Err(e) => log_invalid_metric(get_desc(histogram), e),
    }
}

/// Fully qualified name of a metric, for diagnostics.
pub fn get_desc<M: Collector>(metric: &M) -> String {
    metric
        .desc()
        .first()
        .map(|d| d.fq_name.clone())
        .unwrap_or_else(|| "unknown".to_owned())
}
