use std::collections::BTreeSet;

use errors::ErrorMetadata;

use crate::index_metadata::Index;

pub const BACKING_INDEX_PREFIX: &str = ".ds-";
pub const DEFAULT_TIMESTAMP_FIELD: &str = "@timestamp";

/// An append-mostly sequence of backing indices. The last backing index
/// receives writes unless a write index is set explicitly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataStream {
    name: String,
    timestamp_field: String,
    indices: Vec<Index>,
    generation: u64,
    write_index: Option<Index>,
    hidden: bool,
    system: bool,
    replicated: bool,
}

impl DataStream {
    pub fn new(name: impl Into<String>, indices: Vec<Index>) -> anyhow::Result<Self> {
        let generation = indices.len() as u64;
        Self::with_generation(name, indices, generation)
    }

    pub fn with_generation(
        name: impl Into<String>,
        indices: Vec<Index>,
        generation: u64,
    ) -> anyhow::Result<Self> {
        let name = name.into();
        anyhow::ensure!(
            generation >= indices.len() as u64,
            ErrorMetadata::bad_request(
                "InvalidDataStream",
                format!(
                    "data stream [{name}] has generation [{generation}] but {} backing indices",
                    indices.len()
                ),
            )
        );
        let distinct: BTreeSet<&str> = indices.iter().map(|i| i.name()).collect();
        anyhow::ensure!(
            distinct.len() == indices.len(),
            ErrorMetadata::bad_request(
                "InvalidDataStream",
                format!("data stream [{name}] lists the same backing index more than once"),
            )
        );
        Ok(Self {
            name,
            timestamp_field: DEFAULT_TIMESTAMP_FIELD.to_owned(),
            indices,
            generation,
            write_index: None,
            hidden: false,
            system: false,
            replicated: false,
        })
    }

    pub fn with_timestamp_field(mut self, field: impl Into<String>) -> Self {
        self.timestamp_field = field.into();
        self
    }

    /// Route writes to `index` instead of the newest backing index.
    pub fn with_write_index(mut self, index: Index) -> anyhow::Result<Self> {
        anyhow::ensure!(
            self.indices.contains(&index),
            ErrorMetadata::bad_request(
                "InvalidDataStream",
                format!(
                    "write index {index} is not a backing index of data stream [{}]",
                    self.name
                ),
            )
        );
        self.write_index = Some(index);
        Ok(self)
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn system(mut self, system: bool) -> Self {
        self.system = system;
        self
    }

    pub fn replicated(mut self, replicated: bool) -> Self {
        self.replicated = replicated;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timestamp_field(&self) -> &str {
        &self.timestamp_field
    }

    pub fn indices(&self) -> &[Index] {
        &self.indices
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_system(&self) -> bool {
        self.system
    }

    pub fn is_replicated(&self) -> bool {
        self.replicated
    }

    /// Explicitly configured write index, if any.
    pub fn write_index_override(&self) -> Option<&Index> {
        self.write_index.as_ref()
    }

    pub fn write_index(&self) -> Option<&Index> {
        self.write_index.as_ref().or_else(|| self.indices.last())
    }

    pub fn contains_index(&self, name: &str) -> bool {
        self.indices.iter().any(|i| i.name() == name)
    }

    /// `.ds-<data stream>-<generation>` with the generation zero padded to six
    /// digits.
    pub fn backing_index_name(data_stream: &str, generation: u64) -> String {
        format!("{BACKING_INDEX_PREFIX}{data_stream}-{generation:06}")
    }

    pub fn next_backing_index_name(&self) -> String {
        Self::backing_index_name(&self.name, self.generation + 1)
    }

    /// The generation encoded in `name` if it is shaped like one of this
    /// data stream's backing index names. Generations too large for a `u64`
    /// saturate to `u64::MAX`.
    pub(crate) fn backing_generation(&self, name: &str) -> Option<u64> {
        let suffix = name
            .strip_prefix(BACKING_INDEX_PREFIX)?
            .strip_prefix(&self.name[..])?
            .strip_prefix('-')?;
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        // All digits, so overflow is the only way parsing can fail.
        Some(suffix.parse().unwrap_or(u64::MAX))
    }

    /// Append `new_write_index` and bump the generation.
    pub fn rollover(&self, new_write_index: Index) -> anyhow::Result<DataStream> {
        anyhow::ensure!(
            !self.contains_index(new_write_index.name()),
            ErrorMetadata::bad_request(
                "InvalidDataStream",
                format!(
                    "index {new_write_index} is already a backing index of data stream [{}]",
                    self.name
                ),
            )
        );
        let mut rolled = self.clone();
        rolled.indices.push(new_write_index);
        rolled.generation += 1;
        rolled.write_index = None;
        Ok(rolled)
    }

    pub fn remove_backing_index(&self, index: &Index) -> anyhow::Result<DataStream> {
        let Some(position) = self.indices.iter().position(|i| i == index) else {
            anyhow::bail!(ErrorMetadata::not_found(
                "IndexNotFound",
                format!("index {index} is not part of data stream [{}]", self.name),
            ));
        };
        anyhow::ensure!(
            self.write_index() != Some(index),
            ErrorMetadata::bad_request(
                "InvalidDataStream",
                format!(
                    "cannot remove backing index [{}] of data stream [{}] because it is the write \
                     index",
                    index.name(),
                    self.name
                ),
            )
        );
        let mut reduced = self.clone();
        reduced.indices.remove(position);
        Ok(reduced)
    }

    /// Keep only the backing indices for which `present` returns true,
    /// preserving order. The generation is left alone so that new backing
    /// index names can't collide with ones already handed out.
    pub fn snapshot(&self, present: impl Fn(&str) -> bool) -> DataStream {
        let mut reduced = self.clone();
        reduced.indices.retain(|i| present(i.name()));
        let write_index_present = reduced
            .write_index
            .as_ref()
            .is_some_and(|i| present(i.name()));
        if !write_index_present {
            reduced.write_index = None;
        }
        reduced
    }
}
