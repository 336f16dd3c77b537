use std::borrow::Cow;

pub type Labels = Vec<MetricLabel>;

/// A single `key=value` pair attached to a labeled metric.
#[derive(PartialOrd, Ord, PartialEq, Eq, Clone, Debug)]
pub struct MetricLabel {
    pub key: &'static str,
    pub value: Cow<'static, str>,
}

impl MetricLabel {
    pub const STATUS_ERROR: MetricLabel = MetricLabel::new_const("status", "error");
    pub const STATUS_SUCCESS: MetricLabel = MetricLabel::new_const("status", "success");

    pub fn new(key: &'static str, value: impl Into<Cow<'static, str>>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }

    pub const fn new_const(key: &'static str, value: &'static str) -> Self {
        Self {
            key,
            value: Cow::Borrowed(value),
        }
    }
}

/// Label names for histograms recorded through a `StatusTimer`.
pub const STATUS_LABEL: [&str; 1] = ["status"];

/// Static label value for a typed field.
pub trait IntoLabel {
    fn as_label(&self) -> &'static str;
}

impl IntoLabel for bool {
    fn as_label(&self) -> &'static str {
        if *self { "true" } else { "false" }
    }
}
