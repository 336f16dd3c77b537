//! Versioned cluster metadata: indices, aliases, data streams and data stream
//! aliases, the derived name resolution table, and the operations that read
//! them.

pub mod alias;
mod builder;
pub mod data_stream;
pub mod data_stream_alias;
mod find;
pub mod graveyard;
pub mod index_abstraction;
pub mod index_metadata;
mod indices_lookup;
pub mod knobs;
pub mod mapping;
mod mapping_store;
mod metadata;
mod metrics;
pub mod pattern;
mod routing;
pub mod serialized;
pub mod settings;
pub mod snapshot;
mod validation;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
#[cfg(test)]
mod tests;

pub use crate::{
    alias::AliasMetadata,
    builder::{
        LookupHint,
        MetadataBuilder,
    },
    data_stream::DataStream,
    data_stream_alias::{
        ChangeOutcome,
        DataStreamAlias,
    },
    find::FieldPredicate,
    graveyard::{
        IndexGraveyard,
        Tombstone,
    },
    index_abstraction::{
        IndexAbstraction,
        IndexAbstractionType,
    },
    index_metadata::{
        Index,
        IndexMetadata,
        IndexMetadataBuilder,
        IndexState,
    },
    indices_lookup::IndicesLookup,
    mapping::MappingMetadata,
    mapping_store::MappingStore,
    metadata::{
        Metadata,
        UNKNOWN_CLUSTER_UUID,
    },
    settings::Settings,
    snapshot::{
        snapshot,
        snapshot_with_policy,
        EmptyDataStreamPolicy,
    },
};
