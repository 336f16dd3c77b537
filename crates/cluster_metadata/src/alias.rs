use std::collections::BTreeSet;

/// An alias as declared on a single index. The same alias name on several
/// indices is represented by one `AliasMetadata` per index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AliasMetadata {
    alias: String,
    filter: Option<serde_json::Value>,
    index_routing: Option<String>,
    search_routing: Option<String>,
    write_index: Option<bool>,
    is_hidden: Option<bool>,
}

impl AliasMetadata {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            filter: None,
            index_routing: None,
            search_routing: None,
            write_index: None,
            is_hidden: None,
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn filter(&self) -> Option<&serde_json::Value> {
        self.filter.as_ref()
    }

    pub fn index_routing(&self) -> Option<&str> {
        self.index_routing.as_deref()
    }

    pub fn search_routing(&self) -> Option<&str> {
        self.search_routing.as_deref()
    }

    /// Search routing split into its comma-separated values.
    pub fn search_routing_values(&self) -> BTreeSet<String> {
        self.search_routing
            .iter()
            .flat_map(|r| r.split(','))
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
            .collect()
    }

    pub fn write_index(&self) -> Option<bool> {
        self.write_index
    }

    pub fn is_hidden(&self) -> Option<bool> {
        self.is_hidden
    }

    pub fn with_filter(mut self, filter: serde_json::Value) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Sets both index and search routing.
    pub fn with_routing(mut self, routing: impl Into<String>) -> Self {
        let routing = routing.into();
        self.index_routing = Some(routing.clone());
        self.search_routing = Some(routing);
        self
    }

    pub fn with_index_routing(mut self, routing: impl Into<String>) -> Self {
        self.index_routing = Some(routing.into());
        self
    }

    pub fn with_search_routing(mut self, routing: impl Into<String>) -> Self {
        self.search_routing = Some(routing.into());
        self
    }

    pub fn with_write_index(mut self, write_index: Option<bool>) -> Self {
        self.write_index = write_index;
        self
    }

    pub fn with_hidden(mut self, is_hidden: Option<bool>) -> Self {
        self.is_hidden = is_hidden;
        self
    }
}
