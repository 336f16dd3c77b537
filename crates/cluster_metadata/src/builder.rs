use std::sync::Arc;

use errors::{
    ErrorMetadata,
    ErrorMetadataAnyhowExt,
};
use imbl::OrdMap;

use crate::{
    data_stream::DataStream,
    data_stream_alias::{
        ChangeOutcome,
        DataStreamAlias,
    },
    graveyard::{
        IndexGraveyard,
        Tombstone,
    },
    index_metadata::IndexMetadata,
    indices_lookup::IndicesLookup,
    mapping_store::MappingStore,
    metadata::{
        Metadata,
        UNKNOWN_CLUSTER_UUID,
    },
    metrics,
    settings::Settings,
    validation,
};

/// Whether putting an index should invalidate the indices lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupHint {
    /// Invalidate only if the change can affect name resolution.
    Auto,
    /// Always invalidate.
    Rebuild,
}

/// Accumulates changes against a base [`Metadata`] and turns them into a new
/// validated version with [`MetadataBuilder::build`]. Confined to a single
/// writer.
#[derive(Clone, Debug)]
pub struct MetadataBuilder {
    explicit_version: Option<u64>,
    base_version: u64,
    cluster_uuid: String,
    cluster_uuid_committed: bool,
    persistent_settings: Settings,
    transient_settings: Settings,
    indices: OrdMap<String, IndexMetadata>,
    data_streams: OrdMap<String, DataStream>,
    data_stream_aliases: OrdMap<String, DataStreamAlias>,
    customs: OrdMap<String, serde_json::Value>,
    index_graveyard: IndexGraveyard,
    mapping_store: Arc<MappingStore>,
    /// Lookup of the base metadata (or of the last successful build). Only
    /// reused while `lookup_dirty` is false.
    previous_lookup: Option<Arc<IndicesLookup>>,
    lookup_dirty: bool,
}

impl Default for MetadataBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataBuilder {
    pub fn new() -> Self {
        Self {
            explicit_version: None,
            base_version: 0,
            cluster_uuid: UNKNOWN_CLUSTER_UUID.to_owned(),
            cluster_uuid_committed: false,
            persistent_settings: Settings::empty(),
            transient_settings: Settings::empty(),
            indices: OrdMap::new(),
            data_streams: OrdMap::new(),
            data_stream_aliases: OrdMap::new(),
            customs: OrdMap::new(),
            index_graveyard: IndexGraveyard::default(),
            mapping_store: Arc::new(MappingStore::default()),
            previous_lookup: None,
            lookup_dirty: true,
        }
    }

    pub(crate) fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            explicit_version: None,
            base_version: metadata.version,
            cluster_uuid: metadata.cluster_uuid.clone(),
            cluster_uuid_committed: metadata.cluster_uuid_committed,
            persistent_settings: metadata.persistent_settings.clone(),
            transient_settings: metadata.transient_settings.clone(),
            indices: metadata.indices.clone(),
            data_streams: metadata.data_streams.clone(),
            data_stream_aliases: metadata.data_stream_aliases.clone(),
            customs: metadata.customs.clone(),
            index_graveyard: metadata.index_graveyard.clone(),
            mapping_store: metadata.mapping_store.clone(),
            previous_lookup: Some(metadata.indices_lookup.clone()),
            lookup_dirty: false,
        }
    }

    /// Set the version of the next build. Without this the version is the
    /// base version plus one.
    pub fn version(&mut self, version: u64) -> &mut Self {
        self.explicit_version = Some(version);
        self
    }

    pub fn cluster_uuid(&mut self, cluster_uuid: impl Into<String>) -> &mut Self {
        self.cluster_uuid = cluster_uuid.into();
        self
    }

    pub fn cluster_uuid_committed(&mut self, committed: bool) -> &mut Self {
        self.cluster_uuid_committed = committed;
        self
    }

    pub fn persistent_settings(&mut self, settings: Settings) -> &mut Self {
        self.persistent_settings = settings;
        self
    }

    pub fn transient_settings(&mut self, settings: Settings) -> &mut Self {
        self.transient_settings = settings;
        self
    }

    pub fn index_graveyard(&mut self, graveyard: IndexGraveyard) -> &mut Self {
        self.index_graveyard = graveyard;
        self
    }

    pub fn get_index(&self, name: &str) -> Option<&IndexMetadata> {
        self.indices.get(name)
    }

    pub fn get_data_stream(&self, name: &str) -> Option<&DataStream> {
        self.data_streams.get(name)
    }

    pub fn put_index(&mut self, index: IndexMetadata) -> anyhow::Result<&mut Self> {
        self.put(index, LookupHint::Auto)
    }

    /// Insert or replace an index. Its mapping is swapped for the shared
    /// instance in the mapping store.
    pub fn put(&mut self, index: IndexMetadata, hint: LookupHint) -> anyhow::Result<&mut Self> {
        let previous = self.indices.get(index.name());
        let affects_lookup = match (previous, hint) {
            (_, LookupHint::Rebuild) | (None, _) => true,
            (Some(previous), LookupHint::Auto) => previous.affects_lookup(&index),
        };
        let previous_mapping = previous.and_then(|p| p.mapping()).cloned();
        let index = match (previous_mapping, index.mapping().cloned()) {
            (Some(previous), Some(current)) if previous.sha256() == current.sha256() => {
                index.with_shared_mapping(previous)
            },
            (None, None) => index,
            (previous, current) => {
                let store = Arc::make_mut(&mut self.mapping_store);
                let index = match current {
                    Some(current) => {
                        let canonical = store.acquire(&current);
                        index.with_shared_mapping(canonical)
                    },
                    None => index,
                };
                if let Some(previous) = previous {
                    store.release(previous.sha256())?;
                }
                index
            },
        };
        self.lookup_dirty |= affects_lookup;
        self.indices.insert(index.name().to_owned(), index);
        Ok(self)
    }

    /// Remove an index. Removing an absent index is a no-op.
    pub fn remove(&mut self, name: &str) -> anyhow::Result<&mut Self> {
        let Some(removed) = self.indices.remove(name) else {
            return Ok(self);
        };
        if let Some(mapping) = removed.mapping() {
            Arc::make_mut(&mut self.mapping_store).release(mapping.sha256())?;
        }
        self.lookup_dirty = true;
        Ok(self)
    }

    /// Remove an index and leave a tombstone for it in the graveyard.
    pub fn delete_index(
        &mut self,
        name: &str,
        delete_date_millis: u64,
    ) -> anyhow::Result<&mut Self> {
        let Some(index) = self.indices.get(name).map(|i| i.index().clone()) else {
            return Ok(self);
        };
        self.remove(name)?;
        self.index_graveyard
            .add_tombstone(Tombstone::new(index, delete_date_millis));
        Ok(self)
    }

    pub fn put_data_stream(&mut self, data_stream: DataStream) -> &mut Self {
        self.data_streams
            .insert(data_stream.name().to_owned(), data_stream);
        self.lookup_dirty = true;
        self
    }

    /// Remove a data stream and its membership in every data stream alias.
    /// Aliases left without members are removed too.
    pub fn remove_data_stream(&mut self, name: &str) -> ChangeOutcome {
        if self.data_streams.remove(name).is_none() {
            return ChangeOutcome::Unchanged;
        }
        let affected: Vec<String> = self
            .data_stream_aliases
            .values()
            .filter(|alias| alias.data_streams().contains(name))
            .map(|alias| alias.name().to_owned())
            .collect();
        for alias_name in affected {
            let Some(alias) = self.data_stream_aliases.get(&alias_name) else {
                continue;
            };
            match alias.remove_data_stream(name) {
                (_, Some(remaining)) => {
                    self.data_stream_aliases.insert(alias_name, remaining);
                },
                (_, None) => {
                    self.data_stream_aliases.remove(&alias_name);
                },
            }
        }
        self.lookup_dirty = true;
        ChangeOutcome::Removed
    }

    /// Add `data_stream` to the data stream alias `alias_name`, creating the
    /// alias if needed. See [`DataStreamAlias::update`] for how `is_write`
    /// and `filter` apply.
    pub fn put_data_stream_alias(
        &mut self,
        alias_name: &str,
        data_stream: &str,
        is_write: Option<bool>,
        filter: Option<serde_json::Value>,
    ) -> anyhow::Result<ChangeOutcome> {
        anyhow::ensure!(
            self.data_streams.contains_key(data_stream),
            ErrorMetadata::not_found(
                "DataStreamNotFound",
                format!("alias [{alias_name}] refers to a non existing data stream [{data_stream}]"),
            )
        );
        let (outcome, alias) = match self.data_stream_aliases.get(alias_name) {
            Some(existing) => existing.update(data_stream, is_write, filter),
            None => (
                ChangeOutcome::Added,
                DataStreamAlias::new(alias_name, data_stream, is_write, filter),
            ),
        };
        if outcome.is_changed() {
            self.data_stream_aliases.insert(alias_name.to_owned(), alias);
            self.lookup_dirty = true;
        }
        Ok(outcome)
    }

    /// Insert a whole data stream alias as is. Membership is checked at build
    /// time.
    pub(crate) fn put_data_stream_alias_entry(&mut self, alias: DataStreamAlias) -> &mut Self {
        self.data_stream_aliases
            .insert(alias.name().to_owned(), alias);
        self.lookup_dirty = true;
        self
    }

    /// Remove `data_stream` from the data stream alias `alias_name`. A missing
    /// pair is an error only if `must_exist`.
    pub fn remove_data_stream_alias(
        &mut self,
        alias_name: &str,
        data_stream: &str,
        must_exist: bool,
    ) -> anyhow::Result<ChangeOutcome> {
        let existing = self
            .data_stream_aliases
            .get(alias_name)
            .filter(|alias| alias.data_streams().contains(data_stream));
        let Some(existing) = existing else {
            anyhow::ensure!(
                !must_exist,
                ErrorMetadata::not_found(
                    "DataStreamAliasNotFound",
                    format!("alias [{alias_name}] doesn't exist"),
                )
            );
            return Ok(ChangeOutcome::Unchanged);
        };
        let (outcome, remaining) = existing.remove_data_stream(data_stream);
        match remaining {
            Some(remaining) => {
                self.data_stream_aliases
                    .insert(alias_name.to_owned(), remaining);
            },
            None => {
                self.data_stream_aliases.remove(alias_name);
            },
        }
        self.lookup_dirty = true;
        Ok(outcome)
    }

    pub fn put_custom(
        &mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> anyhow::Result<&mut Self> {
        let key = key.into();
        anyhow::ensure!(!value.is_null(), null_custom_error(&key));
        self.customs.insert(key, value);
        Ok(self)
    }

    pub fn remove_custom(&mut self, key: &str) -> &mut Self {
        self.customs.remove(key);
        self
    }

    /// Replace all customs.
    pub fn customs(
        &mut self,
        customs: impl IntoIterator<Item = (String, serde_json::Value)>,
    ) -> anyhow::Result<&mut Self> {
        let customs: OrdMap<String, serde_json::Value> = customs.into_iter().collect();
        if let Some((key, _)) = customs.iter().find(|(_, value)| value.is_null()) {
            anyhow::bail!(null_custom_error(key));
        }
        self.customs = customs;
        Ok(self)
    }

    /// Validate the accumulated state and produce a new metadata version.
    ///
    /// Building again without further changes yields equal metadata sharing
    /// the same indices lookup.
    pub fn build(&mut self) -> anyhow::Result<Metadata> {
        let timer = metrics::build_timer();
        let result = self.build_inner();
        if let Err(ref e) = result {
            tracing::warn!("Failed to build metadata: {e:#}");
            e.report_custom_metric();
        }
        metrics::finish_build_timer(timer, &result);
        result
    }

    fn build_inner(&mut self) -> anyhow::Result<Metadata> {
        if let Some((key, _)) = self.customs.iter().find(|(_, value)| value.is_null()) {
            anyhow::bail!(null_custom_error(key));
        }

        let (indices_lookup, reused) = match &self.previous_lookup {
            Some(previous) if !self.lookup_dirty => (previous.clone(), true),
            _ => {
                validation::validate(&self.indices, &self.data_streams, &self.data_stream_aliases)?;
                let lookup = IndicesLookup::build(
                    &self.indices,
                    &self.data_streams,
                    &self.data_stream_aliases,
                )?;
                (Arc::new(lookup), false)
            },
        };
        metrics::log_indices_lookup_build(reused);
        metrics::log_mapping_store_size(self.mapping_store.len());

        let version = self.explicit_version.unwrap_or(self.base_version + 1);
        tracing::debug!(
            "Built metadata version {version}: {} indices, {} data streams, {} mappings, lookup \
             reused: {reused}",
            self.indices.len(),
            self.data_streams.len(),
            self.mapping_store.len(),
        );
        self.previous_lookup = Some(indices_lookup.clone());
        self.lookup_dirty = false;

        Ok(Metadata {
            version,
            cluster_uuid: self.cluster_uuid.clone(),
            cluster_uuid_committed: self.cluster_uuid_committed,
            persistent_settings: self.persistent_settings.clone(),
            transient_settings: self.transient_settings.clone(),
            indices: self.indices.clone(),
            data_streams: self.data_streams.clone(),
            data_stream_aliases: self.data_stream_aliases.clone(),
            customs: self.customs.clone(),
            index_graveyard: self.index_graveyard.clone(),
            indices_lookup,
            mapping_store: self.mapping_store.clone(),
        })
    }
}

fn null_custom_error(key: &str) -> ErrorMetadata {
    ErrorMetadata::bad_request(
        "NullCustomValue",
        format!("custom [{key}] must not have a null value"),
    )
}
