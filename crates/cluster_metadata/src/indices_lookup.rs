use std::collections::{
    BTreeMap,
    BTreeSet,
};

use imbl::OrdMap;

use crate::{
    alias::AliasMetadata,
    data_stream::DataStream,
    data_stream_alias::DataStreamAlias,
    index_abstraction::IndexAbstraction,
    index_metadata::{
        Index,
        IndexMetadata,
    },
};

/// Every name visible in the cluster (indices, aliases, data streams and
/// data stream aliases) mapped to what it resolves to. Derived from the rest
/// of the metadata, name-sorted, and never modified once built.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndicesLookup {
    entries: BTreeMap<String, IndexAbstraction>,
}

impl IndicesLookup {
    pub fn get(&self, name: &str) -> Option<&IndexAbstraction> {
        self.entries.get(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexAbstraction)> {
        self.entries.iter().map(|(k, v)| (&k[..], v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| &k[..])
    }

    /// Expects the inputs to have passed validation already. Name collisions
    /// still fail here rather than silently shadowing an entry.
    pub(crate) fn build(
        indices: &OrdMap<String, IndexMetadata>,
        data_streams: &OrdMap<String, DataStream>,
        data_stream_aliases: &OrdMap<String, DataStreamAlias>,
    ) -> anyhow::Result<Self> {
        let mut parent_data_streams: BTreeMap<&str, &str> = BTreeMap::new();
        for data_stream in data_streams.values() {
            for index in data_stream.indices() {
                parent_data_streams.insert(index.name(), data_stream.name());
            }
        }
        let mut data_stream_alias_names: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
        for alias in data_stream_aliases.values() {
            for data_stream in alias.data_streams() {
                data_stream_alias_names
                    .entry(&data_stream[..])
                    .or_default()
                    .insert(alias.name().to_owned());
            }
        }

        let mut entries = BTreeMap::new();
        // Indices iterate in name order, so each alias's members do too.
        let mut alias_members: BTreeMap<&str, Vec<(&IndexMetadata, &AliasMetadata)>> =
            BTreeMap::new();
        for (name, index) in indices.iter() {
            for (alias_name, alias) in index.aliases().iter() {
                alias_members
                    .entry(&alias_name[..])
                    .or_default()
                    .push((index, alias));
            }
            let abstraction = IndexAbstraction::ConcreteIndex {
                index: index.index().clone(),
                hidden: index.is_hidden(),
                system: index.is_system(),
                parent_data_stream: parent_data_streams
                    .get(&name[..])
                    .map(|ds| (*ds).to_owned()),
                aliases: index.aliases().keys().cloned().collect(),
            };
            insert_unique(&mut entries, name, abstraction)?;
        }

        for (alias_name, members) in alias_members {
            let abstraction = alias_abstraction(alias_name, &members)?;
            insert_unique(&mut entries, alias_name, abstraction)?;
        }

        for (name, data_stream) in data_streams.iter() {
            let abstraction = IndexAbstraction::DataStream {
                name: name.clone(),
                indices: data_stream.indices().to_vec(),
                write_index: data_stream.write_index().cloned(),
                hidden: data_stream.is_hidden(),
                system: data_stream.is_system(),
                aliases: data_stream_alias_names
                    .remove(&name[..])
                    .unwrap_or_default(),
            };
            insert_unique(&mut entries, name, abstraction)?;
        }

        for (name, alias) in data_stream_aliases.iter() {
            let mut member_indices = vec![];
            for member in alias.data_streams() {
                let Some(data_stream) = data_streams.get(member) else {
                    anyhow::bail!(
                        "data stream alias [{name}] refers to missing data stream [{member}]"
                    );
                };
                member_indices.extend(data_stream.indices().iter().cloned());
            }
            let abstraction = IndexAbstraction::DataStreamAlias {
                name: name.clone(),
                data_streams: alias.data_streams().iter().cloned().collect(),
                write_data_stream: alias.write_data_stream().map(str::to_owned),
                indices: member_indices,
            };
            insert_unique(&mut entries, name, abstraction)?;
        }

        Ok(Self { entries })
    }
}

fn insert_unique(
    entries: &mut BTreeMap<String, IndexAbstraction>,
    name: &str,
    abstraction: IndexAbstraction,
) -> anyhow::Result<()> {
    if let Some(existing) = entries.get(name) {
        anyhow::bail!(
            "{} [{name}] collides with existing {} of the same name",
            abstraction.kind().display_name(),
            existing.kind().display_name()
        );
    }
    entries.insert(name.to_owned(), abstraction);
    Ok(())
}

/// The write index is the one member with `is_write_index: true`. With no
/// such member, a sole member whose flag is unset is the write index
/// implicitly.
fn alias_abstraction(
    alias_name: &str,
    members: &[(&IndexMetadata, &AliasMetadata)],
) -> anyhow::Result<IndexAbstraction> {
    let explicit_writers: Vec<&Index> = members
        .iter()
        .filter(|(_, alias)| alias.write_index() == Some(true))
        .map(|(index, _)| index.index())
        .collect();
    anyhow::ensure!(
        explicit_writers.len() <= 1,
        "alias [{alias_name}] has more than one write index"
    );
    let write_index = match (&explicit_writers[..], members) {
        ([writer], _) => Some((*writer).clone()),
        ([], [(index, alias)]) if alias.write_index().is_none() => Some(index.index().clone()),
        _ => None,
    };
    Ok(IndexAbstraction::Alias {
        name: alias_name.to_owned(),
        indices: members.iter().map(|(index, _)| index.index().clone()).collect(),
        write_index,
        // Validation guarantees members agree on hidden.
        hidden: members
            .first()
            .is_some_and(|(_, alias)| alias.is_hidden() == Some(true)),
        system: members.iter().all(|(index, _)| index.is_system()),
    })
}
