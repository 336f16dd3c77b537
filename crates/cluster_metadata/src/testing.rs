use std::collections::{
    BTreeMap,
    BTreeSet,
};

use proptest::prelude::*;
use semver::Version;

use crate::{
    alias::AliasMetadata,
    data_stream::DataStream,
    index_metadata::{
        IndexMetadata,
        IndexState,
    },
    mapping::MappingMetadata,
    metadata::Metadata,
};

/// Single shard, no replica index at the current version.
pub fn index(name: &str) -> IndexMetadata {
    index_builder(name)
        .build()
        .expect("test index metadata is valid")
}

pub fn index_with_aliases(name: &str, aliases: Vec<AliasMetadata>) -> IndexMetadata {
    let mut builder = index_builder(name);
    for alias in aliases {
        builder = builder.put_alias(alias);
    }
    builder.build().expect("test index metadata is valid")
}

pub fn index_with_mapping(name: &str, mapping: serde_json::Value) -> IndexMetadata {
    index_builder(name)
        .mapping(MappingMetadata::new("_doc", mapping).expect("test mapping is valid"))
        .build()
        .expect("test index metadata is valid")
}

pub fn system_index(name: &str, alias: AliasMetadata, created: Version) -> IndexMetadata {
    index_builder(name)
        .creation_version(created)
        .system(true)
        .put_alias(alias)
        .build()
        .expect("test index metadata is valid")
}

fn index_builder(name: &str) -> crate::index_metadata::IndexMetadataBuilder {
    IndexMetadata::builder(name)
        .number_of_shards(1)
        .number_of_replicas(0)
}

/// A data stream with backing indices for generations `1..=generations`,
/// and those backing indices.
pub fn data_stream(name: &str, generations: u64) -> (DataStream, Vec<IndexMetadata>) {
    let indices: Vec<IndexMetadata> = (1..=generations)
        .map(|generation| index(&DataStream::backing_index_name(name, generation)))
        .collect();
    let data_stream = DataStream::new(name, indices.iter().map(|i| i.index().clone()).collect())
        .expect("test data stream is valid");
    (data_stream, indices)
}

/// Metadata with a handful of indices sharing aliases and mappings, and
/// optionally a data stream. Names are drawn from disjoint prefixes so that
/// every generated value passes validation.
pub fn arbitrary_metadata() -> impl Strategy<Value = Metadata> {
    let index = (
        0u8..3,
        prop::collection::btree_set(0u8..4, 0..3),
        any::<IndexState>(),
    );
    (
        prop::collection::btree_map("index-[a-f]{1,3}", index, 0..6),
        prop::option::of(1u64..4),
        prop::collection::btree_map("[a-z]{1,5}", "[a-z0-9]{1,5}", 0..3),
    )
        .prop_map(|(indices, data_stream, settings)| {
            build_arbitrary_metadata(indices, data_stream, settings)
        })
}

fn build_arbitrary_metadata(
    indices: BTreeMap<String, (u8, BTreeSet<u8>, IndexState)>,
    data_stream_generations: Option<u64>,
    settings: BTreeMap<String, String>,
) -> Metadata {
    let mut builder = Metadata::builder();
    builder.persistent_settings(settings.into());
    for (name, (mapping, aliases, state)) in indices {
        let mut entry = index_builder(&name)
            .state(state)
            .mapping(
                MappingMetadata::new(
                    "_doc",
                    serde_json::json!({
                        "properties": {format!("field-{mapping}"): {"type": "keyword"}}
                    }),
                )
                .expect("test mapping is valid"),
            );
        for alias in aliases {
            entry = entry.put_alias(AliasMetadata::new(format!("alias-{alias}")));
        }
        builder
            .put_index(entry.build().expect("test index metadata is valid"))
            .expect("put succeeds");
    }
    if let Some(generations) = data_stream_generations {
        let (logs, backing) = data_stream("logs", generations);
        for index in backing {
            builder.put_index(index).expect("put succeeds");
        }
        builder.put_data_stream(logs);
        builder
            .put_data_stream_alias("all-logs", "logs", Some(true), None)
            .expect("data stream exists");
    }
    builder.build().expect("generated metadata is valid")
}
