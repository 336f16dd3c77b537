use metrics::register_metadata_counter;

register_metadata_counter!(pub BAD_REQUEST_ERROR_TOTAL, "Count of bad request errors");
register_metadata_counter!(pub VALIDATION_ERROR_TOTAL, "Count of metadata validation errors");
register_metadata_counter!(pub NOT_FOUND_ERROR_TOTAL, "Count of not found errors");
register_metadata_counter!(
    pub AMBIGUOUS_ROUTING_ERROR_TOTAL,
    "Count of operations rejected for ambiguous routing"
);
register_metadata_counter!(
    pub PRECONDITION_ERROR_TOTAL,
    "Count of operations rejected for a failed precondition"
);
