use std::collections::{
    BTreeMap,
    BTreeSet,
};

/// Result of a mutation that may or may not have changed anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeOutcome {
    Added,
    Updated,
    Unchanged,
    Removed,
}

impl ChangeOutcome {
    pub fn is_changed(self) -> bool {
        !matches!(self, ChangeOutcome::Unchanged)
    }
}

/// An alias over whole data streams rather than indices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataStreamAlias {
    name: String,
    data_streams: BTreeSet<String>,
    write_data_stream: Option<String>,
    filters: BTreeMap<String, serde_json::Value>,
}

impl DataStreamAlias {
    pub fn new(
        name: impl Into<String>,
        data_stream: impl Into<String>,
        is_write: Option<bool>,
        filter: Option<serde_json::Value>,
    ) -> Self {
        let data_stream = data_stream.into();
        let write_data_stream = (is_write == Some(true)).then(|| data_stream.clone());
        let filters = filter
            .map(|f| (data_stream.clone(), f))
            .into_iter()
            .collect();
        Self {
            name: name.into(),
            data_streams: [data_stream].into_iter().collect(),
            write_data_stream,
            filters,
        }
    }

    pub(crate) fn from_parts(
        name: String,
        data_streams: BTreeSet<String>,
        write_data_stream: Option<String>,
        filters: BTreeMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            name,
            data_streams,
            write_data_stream,
            filters,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_streams(&self) -> &BTreeSet<String> {
        &self.data_streams
    }

    pub fn write_data_stream(&self) -> Option<&str> {
        self.write_data_stream.as_deref()
    }

    pub fn filter(&self, data_stream: &str) -> Option<&serde_json::Value> {
        self.filters.get(data_stream)
    }

    pub fn filters(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.filters
    }

    /// Add `data_stream` as a member, or update its write flag and filter if
    /// it already is one.
    ///
    /// `is_write` of `Some(true)` moves the write pointer to `data_stream`,
    /// `Some(false)` clears it only if `data_stream` currently holds it, and
    /// `None` leaves it alone. A `None` filter keeps the existing one.
    pub fn update(
        &self,
        data_stream: &str,
        is_write: Option<bool>,
        filter: Option<serde_json::Value>,
    ) -> (ChangeOutcome, DataStreamAlias) {
        let mut updated = self.clone();
        match is_write {
            Some(true) => updated.write_data_stream = Some(data_stream.to_owned()),
            Some(false) if self.write_data_stream.as_deref() == Some(data_stream) => {
                updated.write_data_stream = None;
            },
            _ => (),
        }
        if let Some(filter) = filter {
            updated.filters.insert(data_stream.to_owned(), filter);
        }
        let added = updated.data_streams.insert(data_stream.to_owned());
        let outcome = if added {
            ChangeOutcome::Added
        } else if updated != *self {
            ChangeOutcome::Updated
        } else {
            ChangeOutcome::Unchanged
        };
        (outcome, updated)
    }

    /// Remove `data_stream` from this alias. Returns `None` as the new state
    /// when it was the last member. Removing the write data stream leaves the
    /// alias without one.
    pub fn remove_data_stream(&self, data_stream: &str) -> (ChangeOutcome, Option<DataStreamAlias>) {
        if !self.data_streams.contains(data_stream) {
            return (ChangeOutcome::Unchanged, Some(self.clone()));
        }
        let mut updated = self.clone();
        updated.data_streams.remove(data_stream);
        updated.filters.remove(data_stream);
        if updated.write_data_stream.as_deref() == Some(data_stream) {
            updated.write_data_stream = None;
        }
        if updated.data_streams.is_empty() {
            (ChangeOutcome::Removed, None)
        } else {
            (ChangeOutcome::Removed, Some(updated))
        }
    }
}
