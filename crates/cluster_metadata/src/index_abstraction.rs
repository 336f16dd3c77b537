use std::{
    collections::BTreeSet,
    slice,
};

use crate::index_metadata::Index;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndexAbstractionType {
    ConcreteIndex,
    Alias,
    DataStream,
    DataStreamAlias,
}

impl IndexAbstractionType {
    pub fn display_name(&self) -> &'static str {
        match self {
            IndexAbstractionType::ConcreteIndex => "concrete index",
            IndexAbstractionType::Alias => "alias",
            IndexAbstractionType::DataStream => "data stream",
            IndexAbstractionType::DataStreamAlias => "data stream alias",
        }
    }
}

/// What a name in the indices lookup refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexAbstraction {
    ConcreteIndex {
        index: Index,
        hidden: bool,
        system: bool,
        /// Set when this index backs a data stream.
        parent_data_stream: Option<String>,
        aliases: BTreeSet<String>,
    },
    Alias {
        name: String,
        /// Name-sorted.
        indices: Vec<Index>,
        write_index: Option<Index>,
        hidden: bool,
        system: bool,
    },
    DataStream {
        name: String,
        indices: Vec<Index>,
        write_index: Option<Index>,
        hidden: bool,
        system: bool,
        /// Data stream aliases that include this data stream.
        aliases: BTreeSet<String>,
    },
    DataStreamAlias {
        name: String,
        data_streams: Vec<String>,
        write_data_stream: Option<String>,
        /// Backing indices of every member, in member order.
        indices: Vec<Index>,
    },
}

impl IndexAbstraction {
    pub fn kind(&self) -> IndexAbstractionType {
        match self {
            IndexAbstraction::ConcreteIndex { .. } => IndexAbstractionType::ConcreteIndex,
            IndexAbstraction::Alias { .. } => IndexAbstractionType::Alias,
            IndexAbstraction::DataStream { .. } => IndexAbstractionType::DataStream,
            IndexAbstraction::DataStreamAlias { .. } => IndexAbstractionType::DataStreamAlias,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            IndexAbstraction::ConcreteIndex { index, .. } => index.name(),
            IndexAbstraction::Alias { name, .. }
            | IndexAbstraction::DataStream { name, .. }
            | IndexAbstraction::DataStreamAlias { name, .. } => &name[..],
        }
    }

    /// Concrete indices this name resolves to.
    pub fn indices(&self) -> &[Index] {
        match self {
            IndexAbstraction::ConcreteIndex { index, .. } => slice::from_ref(index),
            IndexAbstraction::Alias { indices, .. }
            | IndexAbstraction::DataStream { indices, .. }
            | IndexAbstraction::DataStreamAlias { indices, .. } => &indices[..],
        }
    }

    /// Names of the direct members: data stream names for a data stream
    /// alias, index names for everything else.
    pub fn member_names(&self) -> Vec<&str> {
        match self {
            IndexAbstraction::DataStreamAlias { data_streams, .. } => {
                data_streams.iter().map(|ds| &ds[..]).collect()
            },
            _ => self.indices().iter().map(|i| i.name()).collect(),
        }
    }

    /// Always `None` for data stream aliases: they point at data streams, not
    /// indices.
    pub fn write_index(&self) -> Option<&Index> {
        match self {
            IndexAbstraction::ConcreteIndex { index, .. } => Some(index),
            IndexAbstraction::Alias { write_index, .. }
            | IndexAbstraction::DataStream { write_index, .. } => write_index.as_ref(),
            IndexAbstraction::DataStreamAlias { .. } => None,
        }
    }

    pub fn write_data_stream(&self) -> Option<&str> {
        match self {
            IndexAbstraction::DataStreamAlias {
                write_data_stream, ..
            } => write_data_stream.as_deref(),
            _ => None,
        }
    }

    pub fn is_hidden(&self) -> bool {
        match self {
            IndexAbstraction::ConcreteIndex { hidden, .. }
            | IndexAbstraction::Alias { hidden, .. }
            | IndexAbstraction::DataStream { hidden, .. } => *hidden,
            IndexAbstraction::DataStreamAlias { .. } => false,
        }
    }

    pub fn is_system(&self) -> bool {
        match self {
            IndexAbstraction::ConcreteIndex { system, .. }
            | IndexAbstraction::Alias { system, .. }
            | IndexAbstraction::DataStream { system, .. } => *system,
            IndexAbstraction::DataStreamAlias { .. } => false,
        }
    }

    pub fn parent_data_stream(&self) -> Option<&str> {
        match self {
            IndexAbstraction::ConcreteIndex {
                parent_data_stream, ..
            } => parent_data_stream.as_deref(),
            _ => None,
        }
    }

    /// Aliases pointing at this name. Aliases can't be aliased, so this is
    /// `None` for both alias kinds.
    pub fn aliases(&self) -> Option<&BTreeSet<String>> {
        match self {
            IndexAbstraction::ConcreteIndex { aliases, .. }
            | IndexAbstraction::DataStream { aliases, .. } => Some(aliases),
            IndexAbstraction::Alias { .. } | IndexAbstraction::DataStreamAlias { .. } => None,
        }
    }
}
