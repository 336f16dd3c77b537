use imbl::Vector;

use crate::{
    index_metadata::Index,
    knobs::MAX_INDEX_TOMBSTONES,
};

/// Record of a deleted index, kept so that nodes which missed the deletion
/// don't resurrect it from local data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tombstone {
    index: Index,
    delete_date_millis: u64,
}

impl Tombstone {
    pub fn new(index: Index, delete_date_millis: u64) -> Self {
        Self {
            index,
            delete_date_millis,
        }
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn delete_date_millis(&self) -> u64 {
        self.delete_date_millis
    }
}

/// Tombstones in deletion order, oldest first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexGraveyard {
    tombstones: Vector<Tombstone>,
}

impl IndexGraveyard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tombstone, purging the oldest ones beyond
    /// `MAX_INDEX_TOMBSTONES`.
    pub fn add_tombstone(&mut self, tombstone: Tombstone) {
        self.add_tombstone_capped(tombstone, *MAX_INDEX_TOMBSTONES);
    }

    fn add_tombstone_capped(&mut self, tombstone: Tombstone, max: usize) {
        self.tombstones.push_back(tombstone);
        while self.tombstones.len() > max {
            self.tombstones.pop_front();
        }
    }

    pub fn tombstones(&self) -> impl Iterator<Item = &Tombstone> {
        self.tombstones.iter()
    }

    pub fn contains_index(&self, index: &Index) -> bool {
        self.tombstones.iter().any(|t| t.index() == index)
    }

    pub fn len(&self) -> usize {
        self.tombstones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tombstones.is_empty()
    }
}

impl FromIterator<Tombstone> for IndexGraveyard {
    fn from_iter<I: IntoIterator<Item = Tombstone>>(iter: I) -> Self {
        Self {
            tombstones: iter.into_iter().collect(),
        }
    }
}
