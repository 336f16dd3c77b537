use std::{
    collections::BTreeMap,
    fmt,
    sync::Arc,
};

use errors::ErrorMetadata;

use crate::{
    alias::AliasMetadata,
    index_metadata::IndexMetadata,
    mapping::MappingMetadata,
    metadata::Metadata,
    pattern::{
        is_match_all,
        simple_match,
    },
};

/// Which mapping fields a caller may see for one index.
#[derive(Clone)]
pub enum FieldPredicate {
    AcceptAll,
    /// Keep the fields whose full dotted path this returns true for.
    Filter(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl FieldPredicate {
    pub fn filter(keep: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        FieldPredicate::Filter(Arc::new(keep))
    }
}

impl fmt::Debug for FieldPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPredicate::AcceptAll => write!(f, "AcceptAll"),
            FieldPredicate::Filter(_) => write!(f, "Filter(..)"),
        }
    }
}

impl Metadata {
    /// Aliases of each of `indices` that `patterns` select, sorted by alias
    /// name. Indices with no selected alias are left out.
    ///
    /// Patterns apply in order. A pattern selects the aliases it matches and a
    /// `-` prefixed pattern deselects them again, so `["*", "-logs*"]` is every
    /// alias except those starting with `logs`.
    pub fn find_aliases(
        &self,
        patterns: &[&str],
        indices: &[&str],
    ) -> anyhow::Result<BTreeMap<String, Vec<AliasMetadata>>> {
        let mut found = BTreeMap::new();
        if patterns.is_empty() {
            return Ok(found);
        }
        let patterns: Vec<(bool, &str)> = patterns
            .iter()
            .map(|pattern| match pattern.strip_prefix('-') {
                Some(excluded) if !excluded.is_empty() => (false, excluded),
                _ => (true, *pattern),
            })
            .collect();
        for name in indices {
            let index = self.existing_index(name)?;
            // Already sorted by alias name.
            let selected: Vec<AliasMetadata> = index
                .aliases()
                .values()
                .filter(|alias| is_selected(&patterns, alias.alias()))
                .cloned()
                .collect();
            if !selected.is_empty() {
                found.insert((*name).to_owned(), selected);
            }
        }
        Ok(found)
    }

    pub fn find_all_aliases(
        &self,
        indices: &[&str],
    ) -> anyhow::Result<BTreeMap<String, Vec<AliasMetadata>>> {
        self.find_aliases(&["*"], indices)
    }

    /// The mapping of each of `indices`, pruned to the fields that
    /// `field_filter` allows for that index. Indices without a mapping get
    /// [`MappingMetadata::empty`]. Unfiltered mappings are returned as the
    /// shared instance.
    ///
    /// `on_next_index` runs before each index is processed and can abort the
    /// whole call, eg. on cancellation.
    pub fn find_mappings(
        &self,
        indices: &[&str],
        field_filter: impl Fn(&str) -> FieldPredicate,
        mut on_next_index: impl FnMut() -> anyhow::Result<()>,
    ) -> anyhow::Result<BTreeMap<String, Arc<MappingMetadata>>> {
        let mut found = BTreeMap::new();
        for name in indices {
            on_next_index()?;
            let index = self.existing_index(name)?;
            let mapping = index.mapping().cloned().unwrap_or_else(MappingMetadata::empty);
            let mapping = match field_filter(name) {
                FieldPredicate::AcceptAll => mapping,
                FieldPredicate::Filter(keep) => match mapping.filter_fields(&*keep)? {
                    Some(filtered) => Arc::new(filtered),
                    None => mapping,
                },
            };
            found.insert((*name).to_owned(), mapping);
        }
        Ok(found)
    }

    fn existing_index(&self, name: &str) -> anyhow::Result<&IndexMetadata> {
        self.indices.get(name).ok_or_else(|| {
            ErrorMetadata::not_found("IndexNotFound", format!("no such index [{name}]")).into()
        })
    }
}

fn is_selected(patterns: &[(bool, &str)], alias: &str) -> bool {
    let mut selected = false;
    for (include, pattern) in patterns {
        if *include {
            if !selected && (is_match_all(pattern) || simple_match(pattern, alias)) {
                selected = true;
            }
        } else if selected && simple_match(pattern, alias) {
            // Exclusions are plain globs, `-_all` only drops an alias named `_all`.
            selected = false;
        }
    }
    selected
}
