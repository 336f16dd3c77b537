//! Prometheus registry and reporting helpers shared by the metadata crates.

mod labels;
mod macros;
mod metrics;
mod reporting;
mod timer;

pub use crate::{
    labels::*,
    macros::*,
    metrics::*,
    reporting::{
        get_desc,
        log_counter,
        log_counter_with_labels,
        log_distribution_with_labels,
        log_gauge,
    },
    timer::{
        StatusTimer,
        Timer,
    },
};
