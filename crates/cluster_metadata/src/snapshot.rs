use std::collections::BTreeSet;

use errors::ErrorMetadata;

use crate::{
    knobs::SNAPSHOT_RETAIN_EMPTY_DATA_STREAMS,
    metadata::Metadata,
};

/// What snapshot reconciliation does with a data stream none of whose backing
/// indices are in the snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmptyDataStreamPolicy {
    /// Keep it with an empty backing index list.
    Retain,
    Drop,
}

impl EmptyDataStreamPolicy {
    pub fn from_knob() -> Self {
        if *SNAPSHOT_RETAIN_EMPTY_DATA_STREAMS {
            EmptyDataStreamPolicy::Retain
        } else {
            EmptyDataStreamPolicy::Drop
        }
    }
}

/// Reconcile `metadata` with the contents of a snapshot. See
/// [`snapshot_with_policy`].
pub fn snapshot(
    metadata: &Metadata,
    data_streams: &[&str],
    indices: &[&str],
) -> anyhow::Result<Metadata> {
    snapshot_with_policy(
        metadata,
        data_streams,
        indices,
        EmptyDataStreamPolicy::from_knob(),
    )
}

/// Metadata describing a snapshot that contains `indices` and `data_streams`.
///
/// Each requested data stream keeps only the backing indices in `indices`,
/// in their original order. Data streams that weren't requested are removed
/// along with their data stream alias memberships. Index entries are left as
/// they are.
pub fn snapshot_with_policy(
    metadata: &Metadata,
    data_streams: &[&str],
    indices: &[&str],
    policy: EmptyDataStreamPolicy,
) -> anyhow::Result<Metadata> {
    let present: BTreeSet<&str> = indices.iter().copied().collect();
    let requested: BTreeSet<&str> = data_streams.iter().copied().collect();
    let mut builder = metadata.to_builder();
    for name in &requested {
        let Some(data_stream) = metadata.data_stream(name) else {
            anyhow::bail!(ErrorMetadata::not_found(
                "DataStreamNotFound",
                format!("unable to find data stream [{name}]"),
            ));
        };
        let reduced = data_stream.snapshot(|index| present.contains(index));
        if reduced.indices().is_empty() && policy == EmptyDataStreamPolicy::Drop {
            tracing::debug!("Dropping data stream {name} with no backing indices in the snapshot");
            builder.remove_data_stream(name);
        } else {
            builder.put_data_stream(reduced);
        }
    }
    for name in metadata.data_streams().keys() {
        if !requested.contains(&name[..]) {
            builder.remove_data_stream(name);
        }
    }
    builder.build()
}
