use errors::ErrorMetadataAnyhowExt;
use metrics::{
    log_counter_with_labels,
    log_gauge,
    register_metadata_counter,
    register_metadata_gauge,
    register_metadata_histogram,
    IntoLabel,
    MetricLabel,
    StatusTimer,
    STATUS_LABEL,
};

register_metadata_histogram!(
    METADATA_BUILD_SECONDS,
    "Time to build a new metadata version",
    &STATUS_LABEL
);
pub fn build_timer() -> StatusTimer {
    StatusTimer::new(&METADATA_BUILD_SECONDS)
}

pub fn finish_build_timer<T>(timer: StatusTimer, result: &anyhow::Result<T>) {
    match result {
        Ok(_) => {
            timer.finish();
        },
        Err(e) => {
            timer.finish_with(e.metric_status_label_value());
        },
    }
}

register_metadata_counter!(
    METADATA_INDICES_LOOKUP_BUILDS,
    "Count of metadata builds, labeled by whether the indices lookup was reused",
    &["reused"]
);
pub fn log_indices_lookup_build(reused: bool) {
    log_counter_with_labels(
        &METADATA_INDICES_LOOKUP_BUILDS,
        1,
        vec![MetricLabel::new("reused", reused.as_label())],
    );
}

register_metadata_gauge!(
    METADATA_MAPPING_STORE_MAPPINGS,
    "Number of distinct mappings held by the latest metadata version"
);
pub fn log_mapping_store_size(size: usize) {
    log_gauge(&METADATA_MAPPING_STORE_MAPPINGS, size as f64);
}
