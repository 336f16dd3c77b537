use std::collections::{
    BTreeMap,
    BTreeSet,
};

use errors::ErrorMetadata;
use imbl::OrdMap;
use itertools::Itertools;

use crate::{
    alias::AliasMetadata,
    data_stream::DataStream,
    data_stream_alias::DataStreamAlias,
    index_metadata::IndexMetadata,
    knobs::SYSTEM_INDEX_ALIAS_ENFORCEMENT_VERSION,
};

/// Reject the whole metadata version if any cross-entity invariant is broken.
/// Every violation found is reported in the one error.
pub(crate) fn validate(
    indices: &OrdMap<String, IndexMetadata>,
    data_streams: &OrdMap<String, DataStream>,
    data_stream_aliases: &OrdMap<String, DataStreamAlias>,
) -> anyhow::Result<()> {
    let aliases = alias_members(indices);
    let mut violations = vec![];
    violations.extend(check_unique_names(
        indices,
        &aliases,
        data_streams,
        data_stream_aliases,
    ));
    violations.extend(check_data_stream_members(indices, data_streams));
    violations.extend(check_backing_index_aliases(indices, data_streams));
    violations.extend(check_backing_index_name_conflicts(
        indices,
        &aliases,
        data_streams,
    ));
    violations.extend(check_data_stream_aliases(data_streams, data_stream_aliases));
    for (alias, members) in &aliases {
        violations.extend(check_alias_properties(alias, members));
    }
    if violations.is_empty() {
        return Ok(());
    }
    tracing::warn!("Rejecting metadata with {} violation(s)", violations.len());
    anyhow::bail!(ErrorMetadata::validation(
        "InvalidMetadata",
        violations.join("; ")
    ))
}

/// Indices pointed at by each alias name, name-sorted.
fn alias_members(indices: &OrdMap<String, IndexMetadata>) -> BTreeMap<&str, Vec<&IndexMetadata>> {
    let mut aliases: BTreeMap<&str, Vec<&IndexMetadata>> = BTreeMap::new();
    for index in indices.values() {
        for alias in index.aliases().keys() {
            aliases.entry(&alias[..]).or_default().push(index);
        }
    }
    aliases
}

fn check_unique_names(
    indices: &OrdMap<String, IndexMetadata>,
    aliases: &BTreeMap<&str, Vec<&IndexMetadata>>,
    data_streams: &OrdMap<String, DataStream>,
    data_stream_aliases: &OrdMap<String, DataStreamAlias>,
) -> Option<String> {
    let mut duplicates = vec![];
    for (alias, members) in aliases {
        let other_kind = if indices.contains_key(*alias) {
            "index"
        } else if data_streams.contains_key(*alias) {
            "data stream"
        } else {
            continue;
        };
        let member_names = members.iter().map(|i| i.name()).join(", ");
        duplicates.push(format!(
            "{alias} (alias of [{member_names}]) conflicts with {other_kind}"
        ));
    }
    for name in data_streams.keys() {
        if indices.contains_key(name) {
            duplicates.push(format!("data stream [{name}] conflicts with index"));
        }
    }
    for name in data_stream_aliases.keys() {
        if aliases.contains_key(&name[..]) {
            duplicates.push(format!(
                "data stream alias and indices alias have the same name ({name})"
            ));
        }
        if indices.contains_key(name) {
            duplicates.push(format!(
                "data stream alias and indices have the same name ({name})"
            ));
        }
        if data_streams.contains_key(name) {
            duplicates.push(format!(
                "data stream alias and data stream have the same name ({name})"
            ));
        }
    }
    if duplicates.is_empty() {
        return None;
    }
    Some(format!(
        "index, alias, and data stream names need to be unique, but the following duplicates \
         were found [{}]",
        duplicates.join(",")
    ))
}

/// Backing indices must exist with the same identity and belong to exactly
/// one data stream.
fn check_data_stream_members(
    indices: &OrdMap<String, IndexMetadata>,
    data_streams: &OrdMap<String, DataStream>,
) -> Vec<String> {
    let mut violations = vec![];
    let mut owners: BTreeMap<&str, &str> = BTreeMap::new();
    for data_stream in data_streams.values() {
        for backing in data_stream.indices() {
            match indices.get(backing.name()) {
                None => violations.push(format!(
                    "data stream [{}] references missing backing index [{}]",
                    data_stream.name(),
                    backing.name()
                )),
                Some(index) if index.index() != backing => violations.push(format!(
                    "data stream [{}] references backing index {backing} but the index in the \
                     cluster is {}",
                    data_stream.name(),
                    index.index()
                )),
                Some(_) => (),
            }
            if let Some(owner) = owners.insert(backing.name(), data_stream.name()) {
                violations.push(format!(
                    "index [{}] is a backing index of both data stream [{owner}] and [{}]",
                    backing.name(),
                    data_stream.name()
                ));
            }
        }
    }
    violations
}

fn check_backing_index_aliases(
    indices: &OrdMap<String, IndexMetadata>,
    data_streams: &OrdMap<String, DataStream>,
) -> Option<String> {
    let mut aliases = BTreeSet::new();
    for data_stream in data_streams.values() {
        for backing in data_stream.indices() {
            if let Some(index) = indices.get(backing.name()) {
                aliases.extend(index.aliases().keys().map(|a| &a[..]));
            }
        }
    }
    if aliases.is_empty() {
        return None;
    }
    Some(format!(
        "aliases [{}] cannot refer to backing indices of data streams",
        aliases.iter().join(", ")
    ))
}

/// An index or alias named like a future backing index of a data stream
/// would collide with it on rollover.
fn check_backing_index_name_conflicts(
    indices: &OrdMap<String, IndexMetadata>,
    aliases: &BTreeMap<&str, Vec<&IndexMetadata>>,
    data_streams: &OrdMap<String, DataStream>,
) -> Vec<String> {
    let mut violations = vec![];
    for data_stream in data_streams.values() {
        let conflicts: Vec<&str> = indices
            .keys()
            .map(|name| &name[..])
            .chain(aliases.keys().copied())
            .filter(|name| !data_stream.contains_index(name))
            .filter(|name| {
                data_stream
                    .backing_generation(name)
                    .is_some_and(|generation| generation > data_stream.generation())
            })
            .collect();
        if let Some(first) = conflicts.first() {
            violations.push(format!(
                "data stream [{}] could create backing indices that conflict with {} existing \
                 index(s) or alias(s) including '{first}'",
                data_stream.name(),
                conflicts.len()
            ));
        }
    }
    violations
}

fn check_data_stream_aliases(
    data_streams: &OrdMap<String, DataStream>,
    data_stream_aliases: &OrdMap<String, DataStreamAlias>,
) -> Vec<String> {
    let mut violations = vec![];
    for alias in data_stream_aliases.values() {
        for member in alias.data_streams() {
            if !data_streams.contains_key(member) {
                violations.push(format!(
                    "data stream alias [{}] refers to missing data stream [{member}]",
                    alias.name()
                ));
            }
        }
        if let Some(write) = alias.write_data_stream() {
            if !alias.data_streams().contains(write) {
                violations.push(format!(
                    "data stream alias [{}] has write data stream [{write}] that is not a member",
                    alias.name()
                ));
            }
        }
    }
    violations
}

fn check_alias_properties(alias: &str, members: &[&IndexMetadata]) -> Vec<String> {
    let mut violations = vec![];
    // Unset flags count as false.
    let flag_set = |index: &IndexMetadata, flag: fn(&AliasMetadata) -> Option<bool>| {
        index.alias(alias).and_then(flag) == Some(true)
    };

    let writers: Vec<&str> = members
        .iter()
        .copied()
        .filter(|i| flag_set(*i, AliasMetadata::write_index))
        .map(|i| i.name())
        .collect();
    if writers.len() > 1 {
        violations.push(format!(
            "alias [{alias}] has more than one write index [{}]",
            writers.join(",")
        ));
    }

    let (hidden, not_hidden): (Vec<&IndexMetadata>, Vec<&IndexMetadata>) = members
        .iter()
        .copied()
        .partition(|i| flag_set(*i, AliasMetadata::is_hidden));
    if !hidden.is_empty() && !not_hidden.is_empty() {
        violations.push(format!(
            "alias [{alias}] has is_hidden set to true on indices [{}] but does not have \
             is_hidden set to true on indices [{}]; alias must have the same is_hidden setting \
             on all indices",
            hidden.iter().map(|i| i.name()).join(","),
            not_hidden.iter().map(|i| i.name()).join(",")
        ));
    }

    let (system, non_system): (Vec<&IndexMetadata>, Vec<&IndexMetadata>) =
        members.iter().copied().partition(|i| i.is_system());
    let enforced: Vec<&str> = system
        .iter()
        .filter(|i| *i.creation_version() >= *SYSTEM_INDEX_ALIAS_ENFORCEMENT_VERSION)
        .map(|i| i.name())
        .collect();
    if !enforced.is_empty() && !non_system.is_empty() {
        violations.push(format!(
            "alias [{alias}] refers to both system indices [{}] and non-system indices: [{}], \
             but aliases must refer to either system or non-system indices, not both",
            enforced.join(", "),
            non_system.iter().map(|i| i.name()).join(", ")
        ));
    }
    violations
}
