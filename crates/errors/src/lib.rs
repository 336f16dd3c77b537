use std::borrow::Cow;

use prometheus::IntCounter;

mod metrics;

/// ErrorMetadata object can be attached to an anyhow error chain via
/// `.context(e /*ErrorMetadata*/)`. It is a generic object to be used
/// across the codebase to tag errors with information that is used to classify.
///
/// The msg is conveyed as a user facing error message if it makes it to the
/// caller.
///
/// The short_msg is used as a tag - available for tests and for metrics
/// logging - to have a message that is resilient to changes in copy.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
#[error("{msg}")]
pub struct ErrorMetadata {
    /// The error code associated with this ErrorMetadata
    pub code: ErrorCode,
    /// short ScreamingCamelCase. Usable in tests for string matching
    /// w/ a standard test helper.
    /// Eg InvalidMetadata
    pub short_msg: Cow<'static, str>,
    /// human readable - developer facing. Should be longer and descriptive.
    /// Eg "alias [logs] has more than one write index [logs-1,logs-2]"
    pub msg: Cow<'static, str>,
}

#[cfg_attr(any(test, feature = "testing"), derive(proptest_derive::Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    BadRequest,
    Validation,
    NotFound,
    AmbiguousRouting,
    Precondition,
}

impl ErrorMetadata {
    /// Malformed input that never reaches metadata validation, eg a null
    /// custom value or a mapping source that isn't an object.
    ///
    /// The short_msg should be a CapitalCamelCased describing the error.
    /// The msg should be a descriptive message targeted toward the developer.
    pub fn bad_request(
        short_msg: impl Into<Cow<'static, str>>,
        msg: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            code: ErrorCode::BadRequest,
            short_msg: short_msg.into(),
            msg: msg.into(),
        }
    }

    /// Metadata invariant violation found while building a new metadata
    /// version. The build that produced it is discarded as a whole.
    ///
    /// The msg should name every offending index, alias or data stream.
    pub fn validation(
        short_msg: impl Into<Cow<'static, str>>,
        msg: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            code: ErrorCode::Validation,
            short_msg: short_msg.into(),
            msg: msg.into(),
        }
    }

    /// Resource not found.
    ///
    /// The short_msg should be a CapitalCamelCased describing the error (eg
    /// DataStreamNotFound). The msg should be a descriptive message targeted
    /// toward the developer.
    pub fn not_found(
        short_msg: impl Into<Cow<'static, str>>,
        msg: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            code: ErrorCode::NotFound,
            short_msg: short_msg.into(),
            msg: msg.into(),
        }
    }

    /// Routing resolution found several or conflicting routing values for
    /// a single operation.
    pub fn ambiguous_routing(
        short_msg: impl Into<Cow<'static, str>>,
        msg: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            code: ErrorCode::AmbiguousRouting,
            short_msg: short_msg.into(),
            msg: msg.into(),
        }
    }

    /// The request is well formed but can't be served against the current
    /// metadata, eg a write through an alias with no write index.
    pub fn precondition(
        short_msg: impl Into<Cow<'static, str>>,
        msg: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            code: ErrorCode::Precondition,
            short_msg: short_msg.into(),
            msg: msg.into(),
        }
    }

    pub fn is_bad_request(&self) -> bool {
        self.code == ErrorCode::BadRequest
    }

    pub fn is_validation(&self) -> bool {
        self.code == ErrorCode::Validation
    }

    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::NotFound
    }

    pub fn is_ambiguous_routing(&self) -> bool {
        self.code == ErrorCode::AmbiguousRouting
    }

    pub fn is_precondition(&self) -> bool {
        self.code == ErrorCode::Precondition
    }

    /// Return true if this error is deterministically caused by the request
    /// and the metadata it ran against. Retrying the same request against the
    /// same metadata version fails the same way.
    pub fn is_deterministic_user_error(&self) -> bool {
        match self.code {
            ErrorCode::BadRequest
            | ErrorCode::Validation
            | ErrorCode::NotFound
            | ErrorCode::AmbiguousRouting
            | ErrorCode::Precondition => true,
        }
    }

    fn metric_status_label_value(&self) -> &'static str {
        match self.code {
            ErrorCode::BadRequest => "bad_request",
            ErrorCode::Validation => "validation",
            ErrorCode::NotFound => "not_found",
            ErrorCode::AmbiguousRouting => "ambiguous_routing",
            ErrorCode::Precondition => "precondition",
        }
    }

    pub fn custom_metric(&self) -> &'static IntCounter {
        match self.code {
            ErrorCode::BadRequest => &crate::metrics::BAD_REQUEST_ERROR_TOTAL,
            ErrorCode::Validation => &crate::metrics::VALIDATION_ERROR_TOTAL,
            ErrorCode::NotFound => &crate::metrics::NOT_FOUND_ERROR_TOTAL,
            ErrorCode::AmbiguousRouting => &crate::metrics::AMBIGUOUS_ROUTING_ERROR_TOTAL,
            ErrorCode::Precondition => &crate::metrics::PRECONDITION_ERROR_TOTAL,
        }
    }
}

pub trait ErrorMetadataAnyhowExt {
    fn is_bad_request(&self) -> bool;
    fn is_validation(&self) -> bool;
    fn is_not_found(&self) -> bool;
    fn is_ambiguous_routing(&self) -> bool;
    fn is_precondition(&self) -> bool;
    fn is_deterministic_user_error(&self) -> bool;
    fn user_facing_message(&self) -> String;
    fn short_msg(&self) -> &str;
    fn msg(&self) -> &str;
    fn metric_status_label_value(&self) -> &'static str;
    fn report_custom_metric(&self);
    fn map_error_metadata<F: FnOnce(ErrorMetadata) -> ErrorMetadata>(self, f: F) -> Self;
    fn wrap_error_message<F>(self, f: F) -> Self
    where
        F: FnOnce(String) -> String;
}

impl ErrorMetadataAnyhowExt for anyhow::Error {
    /// Returns true if error is tagged as BadRequest
    fn is_bad_request(&self) -> bool {
        if let Some(e) = self.downcast_ref::<ErrorMetadata>() {
            return e.is_bad_request();
        }
        false
    }

    /// Returns true if error is tagged as Validation
    fn is_validation(&self) -> bool {
        if let Some(e) = self.downcast_ref::<ErrorMetadata>() {
            return e.is_validation();
        }
        false
    }

    /// Returns true if error is tagged as NotFound
    fn is_not_found(&self) -> bool {
        if let Some(e) = self.downcast_ref::<ErrorMetadata>() {
            return e.is_not_found();
        }
        false
    }

    /// Returns true if error is tagged as AmbiguousRouting
    fn is_ambiguous_routing(&self) -> bool {
        if let Some(e) = self.downcast_ref::<ErrorMetadata>() {
            return e.is_ambiguous_routing();
        }
        false
    }

    /// Returns true if error is tagged as Precondition
    fn is_precondition(&self) -> bool {
        if let Some(e) = self.downcast_ref::<ErrorMetadata>() {
            return e.is_precondition();
        }
        false
    }

    fn is_deterministic_user_error(&self) -> bool {
        if let Some(e) = self.downcast_ref::<ErrorMetadata>() {
            return e.is_deterministic_user_error();
        }
        false
    }

    fn user_facing_message(&self) -> String {
        if let Some(e) = self.downcast_ref::<ErrorMetadata>() {
            return e.to_string();
        }
        INTERNAL_ERROR_MSG.to_string()
    }

    /// Return the short_msg associated with this Error
    fn short_msg(&self) -> &str {
        if let Some(e) = self.downcast_ref::<ErrorMetadata>() {
            return &e.short_msg;
        }
        INTERNAL_ERROR
    }

    /// Return the descriptive msg associated with this Error
    fn msg(&self) -> &str {
        if let Some(e) = self.downcast_ref::<ErrorMetadata>() {
            return &e.msg;
        }
        INTERNAL_ERROR_MSG
    }

    /// Return the value to use for the `status` label on a timer metric
    fn metric_status_label_value(&self) -> &'static str {
        if let Some(e) = self.downcast_ref::<ErrorMetadata>() {
            return e.metric_status_label_value();
        }
        STATUS_ERROR
    }

    fn report_custom_metric(&self) {
        if let Some(e) = self.downcast_ref::<ErrorMetadata>() {
            ::metrics::log_counter(e.custom_metric(), 1);
        }
    }

    fn map_error_metadata<F>(self, f: F) -> Self
    where
        F: FnOnce(ErrorMetadata) -> ErrorMetadata,
    {
        if let Some(e) = self.downcast_ref::<ErrorMetadata>().cloned() {
            return self.context(f(e));
        }
        self
    }

    /// Wrap the underlying error message, maintaining the underlying error
    /// metadata short code if it exists.
    fn wrap_error_message<F>(self, f: F) -> Self
    where
        F: FnOnce(String) -> String,
    {
        if let Some(mut em) = self.downcast_ref::<ErrorMetadata>().cloned() {
            // Underlying ErrorMetadata. Reuse and reattach it.
            em.msg = f(em.msg.to_string()).into();
            return self.context(em);
        }

        // No underlying code. Just use .context()
        let new_msg = f(self.to_string());
        self.context(new_msg)
    }
}

pub const INTERNAL_ERROR_MSG: &str = "The metadata operation couldn't be completed.";
pub const INTERNAL_ERROR: &str = "InternalError";
const STATUS_ERROR: &str = "error";

#[cfg(any(test, feature = "testing"))]
mod arbitrary_impls {
    use proptest::prelude::*;

    use super::{
        ErrorCode,
        ErrorMetadata,
    };

    impl Arbitrary for ErrorMetadata {
        type Parameters = ();

        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with((): Self::Parameters) -> Self::Strategy {
            any::<ErrorCode>()
                .prop_map(|ec| match ec {
                    ErrorCode::BadRequest => ErrorMetadata::bad_request("bad", "request"),
                    ErrorCode::Validation => ErrorMetadata::validation("invalid", "metadata"),
                    ErrorCode::NotFound => ErrorMetadata::not_found("not", "found"),
                    ErrorCode::AmbiguousRouting => {
                        ErrorMetadata::ambiguous_routing("ambiguous", "routing")
                    },
                    ErrorCode::Precondition => ErrorMetadata::precondition("pre", "condition"),
                })
                .boxed()
        }
    }
}
