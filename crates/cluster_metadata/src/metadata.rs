use std::{
    collections::BTreeMap,
    sync::Arc,
};

use imbl::OrdMap;

use crate::{
    builder::MetadataBuilder,
    data_stream::DataStream,
    data_stream_alias::DataStreamAlias,
    graveyard::IndexGraveyard,
    index_abstraction::IndexAbstractionType,
    index_metadata::{
        IndexMetadata,
        IndexState,
    },
    indices_lookup::IndicesLookup,
    mapping::MappingMetadata,
    mapping_store::MappingStore,
    settings::Settings,
};

/// Cluster uuid of a cluster that hasn't elected its first master yet.
pub const UNKNOWN_CLUSTER_UUID: &str = "_na_";

/// One immutable version of the cluster metadata. Only
/// [`MetadataBuilder::build`] creates these, after checking every cross-entity
/// invariant, so readers never see a half-valid state.
///
/// Every collection is a persistent map, so cloning a `Metadata` or turning
/// it back into a builder is cheap. The derived indices lookup and mapping
/// store are carried by `Arc` and shared with the next version when the
/// inputs they depend on didn't change.
#[derive(Clone, Debug)]
pub struct Metadata {
    pub(crate) version: u64,
    pub(crate) cluster_uuid: String,
    pub(crate) cluster_uuid_committed: bool,
    pub(crate) persistent_settings: Settings,
    pub(crate) transient_settings: Settings,
    pub(crate) indices: OrdMap<String, IndexMetadata>,
    pub(crate) data_streams: OrdMap<String, DataStream>,
    pub(crate) data_stream_aliases: OrdMap<String, DataStreamAlias>,
    pub(crate) customs: OrdMap<String, serde_json::Value>,
    pub(crate) index_graveyard: IndexGraveyard,
    pub(crate) indices_lookup: Arc<IndicesLookup>,
    pub(crate) mapping_store: Arc<MappingStore>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            version: 0,
            cluster_uuid: UNKNOWN_CLUSTER_UUID.to_owned(),
            cluster_uuid_committed: false,
            persistent_settings: Settings::empty(),
            transient_settings: Settings::empty(),
            indices: OrdMap::new(),
            data_streams: OrdMap::new(),
            data_stream_aliases: OrdMap::new(),
            customs: OrdMap::new(),
            index_graveyard: IndexGraveyard::default(),
            indices_lookup: Arc::new(IndicesLookup::default()),
            mapping_store: Arc::new(MappingStore::default()),
        }
    }
}

impl Metadata {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> MetadataBuilder {
        MetadataBuilder::new()
    }

    pub fn to_builder(&self) -> MetadataBuilder {
        MetadataBuilder::from_metadata(self)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn cluster_uuid(&self) -> &str {
        &self.cluster_uuid
    }

    pub fn cluster_uuid_committed(&self) -> bool {
        self.cluster_uuid_committed
    }

    pub fn persistent_settings(&self) -> &Settings {
        &self.persistent_settings
    }

    pub fn transient_settings(&self) -> &Settings {
        &self.transient_settings
    }

    /// Effective cluster settings: transient values shadow persistent ones.
    pub fn settings(&self) -> Settings {
        self.persistent_settings.merge(&self.transient_settings)
    }

    pub fn index(&self, name: &str) -> Option<&IndexMetadata> {
        self.indices.get(name)
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.indices.contains_key(name)
    }

    pub fn indices(&self) -> &OrdMap<String, IndexMetadata> {
        &self.indices
    }

    pub fn data_stream(&self, name: &str) -> Option<&DataStream> {
        self.data_streams.get(name)
    }

    pub fn data_streams(&self) -> &OrdMap<String, DataStream> {
        &self.data_streams
    }

    pub fn data_stream_alias(&self, name: &str) -> Option<&DataStreamAlias> {
        self.data_stream_aliases.get(name)
    }

    pub fn data_stream_aliases(&self) -> &OrdMap<String, DataStreamAlias> {
        &self.data_stream_aliases
    }

    pub fn custom(&self, key: &str) -> Option<&serde_json::Value> {
        self.customs.get(key)
    }

    pub fn customs(&self) -> &OrdMap<String, serde_json::Value> {
        &self.customs
    }

    pub fn index_graveyard(&self) -> &IndexGraveyard {
        &self.index_graveyard
    }

    pub fn indices_lookup(&self) -> &Arc<IndicesLookup> {
        &self.indices_lookup
    }

    pub fn mapping_store(&self) -> &Arc<MappingStore> {
        &self.mapping_store
    }

    pub fn mappings_by_hash(&self, sha256: &str) -> Option<&Arc<MappingMetadata>> {
        self.mapping_store.get(sha256)
    }

    /// Shard copies (primaries and replicas) across every index.
    pub fn total_number_of_shards(&self) -> u64 {
        self.indices
            .values()
            .map(|index| index.total_number_of_shards())
            .sum()
    }

    pub fn total_open_index_shards(&self) -> u64 {
        self.indices
            .values()
            .filter(|index| index.state() == IndexState::Open)
            .map(|index| index.total_number_of_shards())
            .sum()
    }

    pub fn all_indices(&self) -> Vec<&str> {
        self.indices.keys().map(|name| &name[..]).collect()
    }

    pub fn visible_indices(&self) -> Vec<&str> {
        self.visible_indices_matching(|_| true)
    }

    pub fn visible_open_indices(&self) -> Vec<&str> {
        self.visible_indices_matching(|index| index.state() == IndexState::Open)
    }

    pub fn visible_closed_indices(&self) -> Vec<&str> {
        self.visible_indices_matching(|index| index.state() == IndexState::Close)
    }

    fn visible_indices_matching(&self, predicate: impl Fn(&IndexMetadata) -> bool) -> Vec<&str> {
        self.indices
            .values()
            .filter(|index| !index.is_hidden() && predicate(index))
            .map(|index| index.name())
            .collect()
    }

    /// True only for plain index aliases, not data stream aliases.
    pub fn has_alias(&self, name: &str) -> bool {
        self.indices_lookup
            .get(name)
            .is_some_and(|abstraction| abstraction.kind() == IndexAbstractionType::Alias)
    }

    /// For each of `indices` that backs a data stream, the owning data
    /// stream. Unknown names and indices outside data streams are skipped.
    pub fn find_data_streams(&self, indices: &[&str]) -> BTreeMap<String, &DataStream> {
        let mut found = BTreeMap::new();
        for name in indices {
            let parent = self
                .indices_lookup
                .get(name)
                .and_then(|abstraction| abstraction.parent_data_stream())
                .and_then(|data_stream| self.data_streams.get(data_stream));
            if let Some(data_stream) = parent {
                found.insert((*name).to_owned(), data_stream);
            }
        }
        found
    }

    /// Structural equality of the cluster-wide state, ignoring the version,
    /// transient settings and per-index metadata.
    pub fn is_global_state_equal(a: &Metadata, b: &Metadata) -> bool {
        a.cluster_uuid == b.cluster_uuid
            && a.cluster_uuid_committed == b.cluster_uuid_committed
            && a.persistent_settings == b.persistent_settings
            && a.customs == b.customs
            && a.index_graveyard == b.index_graveyard
            && a.data_streams == b.data_streams
            && a.data_stream_aliases == b.data_stream_aliases
    }
}
