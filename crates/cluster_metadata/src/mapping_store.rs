use std::sync::Arc;

use imbl::OrdMap;

use crate::mapping::MappingMetadata;

#[derive(Clone, Debug)]
struct MappingEntry {
    mapping: Arc<MappingMetadata>,
    references: usize,
}

/// Content-addressed table of the mappings referenced by indices, keyed by
/// mapping hash. Identical mappings on many indices share one instance, and an
/// entry lives exactly as long as some index references it.
#[derive(Clone, Debug, Default)]
pub struct MappingStore {
    mappings: OrdMap<String, MappingEntry>,
}

impl MappingStore {
    pub fn get(&self, sha256: &str) -> Option<&Arc<MappingMetadata>> {
        self.mappings.get(sha256).map(|entry| &entry.mapping)
    }

    pub fn contains(&self, sha256: &str) -> bool {
        self.mappings.contains_key(sha256)
    }

    /// Number of indices currently referencing the mapping with this hash.
    pub fn reference_count(&self, sha256: &str) -> usize {
        self.mappings
            .get(sha256)
            .map(|entry| entry.references)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn hashes(&self) -> impl Iterator<Item = &str> {
        self.mappings.keys().map(|k| &k[..])
    }

    /// Record one more reference to `mapping`, returning the canonical shared
    /// instance for its hash.
    pub(crate) fn acquire(&mut self, mapping: &Arc<MappingMetadata>) -> Arc<MappingMetadata> {
        let hash = mapping.sha256();
        let entry = match self.mappings.get(hash) {
            Some(existing) => MappingEntry {
                mapping: existing.mapping.clone(),
                references: existing.references + 1,
            },
            None => MappingEntry {
                mapping: mapping.clone(),
                references: 1,
            },
        };
        let canonical = entry.mapping.clone();
        self.mappings.insert(hash.to_owned(), entry);
        canonical
    }

    /// Drop one reference to the mapping with this hash, evicting it once
    /// nothing references it.
    pub(crate) fn release(&mut self, sha256: &str) -> anyhow::Result<()> {
        let Some(entry) = self.mappings.get(sha256) else {
            anyhow::bail!("Released mapping {sha256} that isn't in the mapping store");
        };
        anyhow::ensure!(entry.references > 0);
        if entry.references == 1 {
            self.mappings.remove(sha256);
        } else {
            let entry = MappingEntry {
                mapping: entry.mapping.clone(),
                references: entry.references - 1,
            };
            self.mappings.insert(sha256.to_owned(), entry);
        }
        Ok(())
    }
}
