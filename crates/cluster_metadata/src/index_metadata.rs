use std::{
    fmt,
    sync::Arc,
};

use errors::ErrorMetadata;
use imbl::OrdMap;
use semver::Version;
use serde::{
    Deserialize,
    Serialize,
};
use uuid::Uuid;

use crate::{
    alias::AliasMetadata,
    mapping::MappingMetadata,
    settings::{
        Settings,
        SETTING_INDEX_HIDDEN,
        SETTING_NUMBER_OF_REPLICAS,
        SETTING_NUMBER_OF_SHARDS,
        SETTING_VERSION_CREATED,
    },
};

/// Version stamped on indices that don't specify one.
pub const CURRENT_VERSION: Version = Version::new(8, 1, 0);

/// Identity of an index. Two indices with the same name but different uuids
/// are different indices, eg. one deleted and one recreated.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Index {
    name: String,
    uuid: Uuid,
}

impl Index {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_uuid(name, Uuid::new_v4())
    }

    pub fn with_uuid(name: impl Into<String>, uuid: Uuid) -> Self {
        Self {
            name: name.into(),
            uuid,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}]", self.name, self.uuid)
    }
}

#[cfg_attr(any(test, feature = "testing"), derive(proptest_derive::Arbitrary))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexState {
    Open,
    Close,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexMetadata {
    index: Index,
    version: u64,
    settings: Settings,
    creation_version: Version,
    number_of_shards: u32,
    number_of_replicas: u32,
    routing_num_shards: u32,
    aliases: OrdMap<String, AliasMetadata>,
    mapping: Option<Arc<MappingMetadata>>,
    state: IndexState,
    system: bool,
    hidden: bool,
}

impl IndexMetadata {
    pub fn builder(name: impl Into<String>) -> IndexMetadataBuilder {
        IndexMetadataBuilder::new(name)
    }

    pub fn to_builder(&self) -> IndexMetadataBuilder {
        IndexMetadataBuilder {
            index: self.index.clone(),
            version: self.version,
            settings: self.settings.clone(),
            creation_version: Some(self.creation_version.clone()),
            number_of_shards: Some(self.number_of_shards),
            number_of_replicas: Some(self.number_of_replicas),
            routing_num_shards: Some(self.routing_num_shards),
            aliases: self.aliases.clone(),
            mapping: self.mapping.clone(),
            state: self.state,
            system: self.system,
        }
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn name(&self) -> &str {
        self.index.name()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn creation_version(&self) -> &Version {
        &self.creation_version
    }

    pub fn number_of_shards(&self) -> u32 {
        self.number_of_shards
    }

    pub fn number_of_replicas(&self) -> u32 {
        self.number_of_replicas
    }

    /// Number of shards used to hash routing values. Can exceed the number of
    /// shards so that the index can later be split.
    pub fn routing_num_shards(&self) -> u32 {
        self.routing_num_shards
    }

    /// Shard copies including primaries.
    pub fn total_number_of_shards(&self) -> u64 {
        u64::from(self.number_of_shards) * (u64::from(self.number_of_replicas) + 1)
    }

    pub fn aliases(&self) -> &OrdMap<String, AliasMetadata> {
        &self.aliases
    }

    pub fn alias(&self, name: &str) -> Option<&AliasMetadata> {
        self.aliases.get(name)
    }

    pub fn mapping(&self) -> Option<&Arc<MappingMetadata>> {
        self.mapping.as_ref()
    }

    pub fn mapping_hash(&self) -> Option<&str> {
        self.mapping.as_ref().map(|m| m.sha256())
    }

    pub fn state(&self) -> IndexState {
        self.state
    }

    pub fn is_system(&self) -> bool {
        self.system
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Whether replacing `self` with `other` can change how names resolve.
    pub(crate) fn affects_lookup(&self, other: &IndexMetadata) -> bool {
        self.index != other.index
            || self.aliases != other.aliases
            || self.hidden != other.hidden
            || self.system != other.system
            || self.state != other.state
            || self.creation_version != other.creation_version
    }

    pub(crate) fn with_shared_mapping(mut self, mapping: Arc<MappingMetadata>) -> Self {
        self.mapping = Some(mapping);
        self
    }
}

pub struct IndexMetadataBuilder {
    index: Index,
    version: u64,
    settings: Settings,
    creation_version: Option<Version>,
    number_of_shards: Option<u32>,
    number_of_replicas: Option<u32>,
    routing_num_shards: Option<u32>,
    aliases: OrdMap<String, AliasMetadata>,
    mapping: Option<Arc<MappingMetadata>>,
    state: IndexState,
    system: bool,
}

impl IndexMetadataBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            index: Index::new(name),
            version: 1,
            settings: Settings::empty(),
            creation_version: None,
            number_of_shards: None,
            number_of_replicas: None,
            routing_num_shards: None,
            aliases: OrdMap::new(),
            mapping: None,
            state: IndexState::Open,
            system: false,
        }
    }

    pub fn uuid(mut self, uuid: Uuid) -> Self {
        self.index = Index::with_uuid(self.index.name().to_owned(), uuid);
        self
    }

    pub fn version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn put_setting(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.settings = self.settings.with(key, value);
        self
    }

    pub fn creation_version(mut self, version: Version) -> Self {
        self.creation_version = Some(version);
        self
    }

    pub fn number_of_shards(mut self, shards: u32) -> Self {
        self.number_of_shards = Some(shards);
        self
    }

    pub fn number_of_replicas(mut self, replicas: u32) -> Self {
        self.number_of_replicas = Some(replicas);
        self
    }

    pub fn routing_num_shards(mut self, shards: u32) -> Self {
        self.routing_num_shards = Some(shards);
        self
    }

    pub fn put_alias(mut self, alias: AliasMetadata) -> Self {
        self.aliases.insert(alias.alias().to_owned(), alias);
        self
    }

    pub fn remove_alias(mut self, alias: &str) -> Self {
        self.aliases.remove(alias);
        self
    }

    pub fn remove_all_aliases(mut self) -> Self {
        self.aliases = OrdMap::new();
        self
    }

    pub fn mapping(mut self, mapping: MappingMetadata) -> Self {
        self.mapping = Some(Arc::new(mapping));
        self
    }

    pub fn state(mut self, state: IndexState) -> Self {
        self.state = state;
        self
    }

    pub fn system(mut self, system: bool) -> Self {
        self.system = system;
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.settings = self.settings.with(SETTING_INDEX_HIDDEN, hidden);
        self
    }

    /// Resolve shard counts and creation version from explicit values first,
    /// then settings, and write the resolved values back into the settings.
    pub fn build(self) -> anyhow::Result<IndexMetadata> {
        let name = self.index.name().to_owned();
        anyhow::ensure!(
            !name.is_empty(),
            ErrorMetadata::bad_request("InvalidIndexMetadata", "index name must not be empty")
        );
        let number_of_shards = match self.number_of_shards {
            Some(shards) => shards,
            None => self
                .settings
                .get_as::<u32>(SETTING_NUMBER_OF_SHARDS)?
                .ok_or_else(|| {
                    ErrorMetadata::bad_request(
                        "InvalidIndexMetadata",
                        format!("must specify number of shards for index [{name}]"),
                    )
                })?,
        };
        anyhow::ensure!(
            number_of_shards > 0,
            ErrorMetadata::bad_request(
                "InvalidIndexMetadata",
                format!("must specify a positive number of shards for index [{name}]"),
            )
        );
        let routing_num_shards = self.routing_num_shards.unwrap_or(number_of_shards);
        anyhow::ensure!(
            routing_num_shards >= number_of_shards && routing_num_shards % number_of_shards == 0,
            ErrorMetadata::bad_request(
                "InvalidIndexMetadata",
                format!(
                    "routing shards [{routing_num_shards}] must be a multiple of the number of \
                     shards [{number_of_shards}] for index [{name}]"
                ),
            )
        );
        let number_of_replicas = match self.number_of_replicas {
            Some(replicas) => replicas,
            None => self
                .settings
                .get_as::<u32>(SETTING_NUMBER_OF_REPLICAS)?
                .unwrap_or(1),
        };
        let creation_version = match self.creation_version {
            Some(version) => version,
            None => self
                .settings
                .get_as::<Version>(SETTING_VERSION_CREATED)?
                .unwrap_or(CURRENT_VERSION),
        };
        let hidden = self.settings.get_bool(SETTING_INDEX_HIDDEN, false)?;
        let settings = self
            .settings
            .with(SETTING_NUMBER_OF_SHARDS, number_of_shards)
            .with(SETTING_NUMBER_OF_REPLICAS, number_of_replicas)
            .with(SETTING_VERSION_CREATED, &creation_version);
        Ok(IndexMetadata {
            index: self.index,
            version: self.version,
            settings,
            creation_version,
            number_of_shards,
            number_of_replicas,
            routing_num_shards,
            aliases: self.aliases,
            mapping: self.mapping,
            state: self.state,
            system: self.system,
            hidden,
        })
    }
}
