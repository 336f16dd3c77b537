//! Plain serde representation of [`Metadata`] handed to the persistence and
//! transport layers. Mappings are stored once, keyed by hash, and referenced
//! from indices.

use std::{
    collections::{
        BTreeMap,
        BTreeSet,
    },
    sync::Arc,
};

use semver::Version;
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::{
    Map,
    Value,
};

use crate::{
    alias::AliasMetadata,
    builder::LookupHint,
    data_stream::DataStream,
    data_stream_alias::DataStreamAlias,
    graveyard::{
        IndexGraveyard,
        Tombstone,
    },
    index_metadata::{
        Index,
        IndexMetadata,
        IndexState,
    },
    mapping::MappingMetadata,
    metadata::Metadata,
    settings::Settings,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerializedMetadata {
    pub version: u64,
    pub cluster_uuid: String,
    pub cluster_uuid_committed: bool,
    pub persistent_settings: Settings,
    pub transient_settings: Settings,
    pub indices: Vec<SerializedIndex>,
    pub mappings: BTreeMap<String, SerializedMapping>,
    pub data_streams: Vec<SerializedDataStream>,
    pub data_stream_aliases: Vec<SerializedDataStreamAlias>,
    pub customs: BTreeMap<String, Value>,
    pub index_graveyard: Vec<SerializedTombstone>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerializedIndex {
    pub index: Index,
    pub version: u64,
    pub settings: Settings,
    pub creation_version: Version,
    pub number_of_shards: u32,
    pub number_of_replicas: u32,
    pub routing_num_shards: u32,
    pub aliases: Vec<SerializedAlias>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_hash: Option<String>,
    pub state: IndexState,
    pub system: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerializedAlias {
    pub alias: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_routing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_routing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_write_index: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_hidden: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerializedMapping {
    pub type_name: String,
    pub source: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerializedDataStream {
    pub name: String,
    pub timestamp_field: String,
    pub indices: Vec<Index>,
    pub generation: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_index: Option<Index>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub system: bool,
    #[serde(default)]
    pub replicated: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerializedDataStreamAlias {
    pub name: String,
    pub data_streams: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_data_stream: Option<String>,
    #[serde(default)]
    pub filters: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerializedTombstone {
    pub index: Index,
    pub delete_date_millis: u64,
}

impl From<&AliasMetadata> for SerializedAlias {
    fn from(alias: &AliasMetadata) -> Self {
        Self {
            alias: alias.alias().to_owned(),
            filter: alias.filter().cloned(),
            index_routing: alias.index_routing().map(str::to_owned),
            search_routing: alias.search_routing().map(str::to_owned),
            is_write_index: alias.write_index(),
            is_hidden: alias.is_hidden(),
        }
    }
}

impl From<SerializedAlias> for AliasMetadata {
    fn from(alias: SerializedAlias) -> Self {
        let mut metadata = AliasMetadata::new(alias.alias)
            .with_write_index(alias.is_write_index)
            .with_hidden(alias.is_hidden);
        if let Some(filter) = alias.filter {
            metadata = metadata.with_filter(filter);
        }
        if let Some(routing) = alias.index_routing {
            metadata = metadata.with_index_routing(routing);
        }
        if let Some(routing) = alias.search_routing {
            metadata = metadata.with_search_routing(routing);
        }
        metadata
    }
}

impl From<&IndexMetadata> for SerializedIndex {
    fn from(index: &IndexMetadata) -> Self {
        Self {
            index: index.index().clone(),
            version: index.version(),
            settings: index.settings().clone(),
            creation_version: index.creation_version().clone(),
            number_of_shards: index.number_of_shards(),
            number_of_replicas: index.number_of_replicas(),
            routing_num_shards: index.routing_num_shards(),
            aliases: index.aliases().values().map(SerializedAlias::from).collect(),
            mapping_hash: index.mapping_hash().map(str::to_owned),
            state: index.state(),
            system: index.is_system(),
        }
    }
}

impl From<&DataStream> for SerializedDataStream {
    fn from(data_stream: &DataStream) -> Self {
        Self {
            name: data_stream.name().to_owned(),
            timestamp_field: data_stream.timestamp_field().to_owned(),
            indices: data_stream.indices().to_vec(),
            generation: data_stream.generation(),
            write_index: data_stream.write_index_override().cloned(),
            hidden: data_stream.is_hidden(),
            system: data_stream.is_system(),
            replicated: data_stream.is_replicated(),
        }
    }
}

impl TryFrom<SerializedDataStream> for DataStream {
    type Error = anyhow::Error;

    fn try_from(s: SerializedDataStream) -> anyhow::Result<Self> {
        let mut data_stream = DataStream::with_generation(s.name, s.indices, s.generation)?
            .with_timestamp_field(s.timestamp_field)
            .hidden(s.hidden)
            .system(s.system)
            .replicated(s.replicated);
        if let Some(write_index) = s.write_index {
            data_stream = data_stream.with_write_index(write_index)?;
        }
        Ok(data_stream)
    }
}

impl From<&DataStreamAlias> for SerializedDataStreamAlias {
    fn from(alias: &DataStreamAlias) -> Self {
        Self {
            name: alias.name().to_owned(),
            data_streams: alias.data_streams().clone(),
            write_data_stream: alias.write_data_stream().map(str::to_owned),
            filters: alias.filters().clone(),
        }
    }
}

impl From<SerializedDataStreamAlias> for DataStreamAlias {
    fn from(s: SerializedDataStreamAlias) -> Self {
        DataStreamAlias::from_parts(s.name, s.data_streams, s.write_data_stream, s.filters)
    }
}

impl From<&Metadata> for SerializedMetadata {
    fn from(metadata: &Metadata) -> Self {
        Self {
            version: metadata.version(),
            cluster_uuid: metadata.cluster_uuid().to_owned(),
            cluster_uuid_committed: metadata.cluster_uuid_committed(),
            persistent_settings: metadata.persistent_settings().clone(),
            transient_settings: metadata.transient_settings().clone(),
            indices: metadata.indices().values().map(SerializedIndex::from).collect(),
            mappings: metadata
                .mapping_store()
                .hashes()
                .filter_map(|hash| metadata.mappings_by_hash(hash))
                .map(|mapping| {
                    (
                        mapping.sha256().to_owned(),
                        SerializedMapping {
                            type_name: mapping.type_name().to_owned(),
                            source: mapping.source().clone(),
                        },
                    )
                })
                .collect(),
            data_streams: metadata
                .data_streams()
                .values()
                .map(SerializedDataStream::from)
                .collect(),
            data_stream_aliases: metadata
                .data_stream_aliases()
                .values()
                .map(SerializedDataStreamAlias::from)
                .collect(),
            customs: metadata
                .customs()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            index_graveyard: metadata
                .index_graveyard()
                .tombstones()
                .map(|t| SerializedTombstone {
                    index: t.index().clone(),
                    delete_date_millis: t.delete_date_millis(),
                })
                .collect(),
        }
    }
}

impl TryFrom<SerializedMetadata> for Metadata {
    type Error = anyhow::Error;

    fn try_from(s: SerializedMetadata) -> anyhow::Result<Self> {
        let mut mappings = BTreeMap::new();
        for (hash, mapping) in s.mappings {
            let parsed = MappingMetadata::new(mapping.type_name, Value::Object(mapping.source))?;
            anyhow::ensure!(
                parsed.sha256() == hash,
                "mapping stored under [{hash}] hashes to [{}]",
                parsed.sha256()
            );
            mappings.insert(hash, Arc::new(parsed));
        }

        let mut builder = Metadata::builder();
        builder
            .version(s.version)
            .cluster_uuid(s.cluster_uuid)
            .cluster_uuid_committed(s.cluster_uuid_committed)
            .persistent_settings(s.persistent_settings)
            .transient_settings(s.transient_settings)
            .index_graveyard(
                s.index_graveyard
                    .into_iter()
                    .map(|t| Tombstone::new(t.index, t.delete_date_millis))
                    .collect::<IndexGraveyard>(),
            );
        builder.customs(s.customs)?;
        for index in s.indices {
            let mut index_builder = IndexMetadata::builder(index.index.name())
                .uuid(index.index.uuid())
                .version(index.version)
                .settings(index.settings)
                .creation_version(index.creation_version)
                .number_of_shards(index.number_of_shards)
                .number_of_replicas(index.number_of_replicas)
                .routing_num_shards(index.routing_num_shards)
                .state(index.state)
                .system(index.system);
            for alias in index.aliases {
                index_builder = index_builder.put_alias(alias.into());
            }
            let mut entry = index_builder.build()?;
            if let Some(hash) = index.mapping_hash {
                let Some(mapping) = mappings.get(&hash) else {
                    anyhow::bail!(
                        "index {} references unknown mapping [{hash}]",
                        entry.index()
                    );
                };
                entry = entry.with_shared_mapping(mapping.clone());
            }
            builder.put(entry, LookupHint::Rebuild)?;
        }
        for data_stream in s.data_streams {
            builder.put_data_stream(data_stream.try_into()?);
        }
        for alias in s.data_stream_aliases {
            let alias: DataStreamAlias = alias.into();
            builder.put_data_stream_alias_entry(alias);
        }
        builder.build()
    }
}
