use errors::ErrorMetadata;
use itertools::Itertools;

use crate::{
    alias::AliasMetadata,
    index_abstraction::IndexAbstraction,
    index_metadata::Index,
    metadata::Metadata,
};

impl Metadata {
    /// Routing value for a single-index operation against `name`.
    ///
    /// Names that aren't plain aliases pass `routing` through. An alias must
    /// resolve to exactly one index, and its index routing (if any) takes over
    /// from `routing` as long as the two don't disagree.
    pub fn resolve_index_routing(
        &self,
        routing: Option<&str>,
        name: &str,
    ) -> anyhow::Result<Option<String>> {
        let Some(IndexAbstraction::Alias { indices, .. }) = self.indices_lookup.get(name) else {
            return Ok(routing.map(str::to_owned));
        };
        anyhow::ensure!(
            indices.len() <= 1,
            ErrorMetadata::ambiguous_routing(
                "AmbiguousAliasRouting",
                format!(
                    "Alias [{name}] has more than one index associated with it [{}], can't \
                     execute a single index op",
                    indices.iter().map(|i| i.name()).join(", ")
                ),
            )
        );
        match indices.first() {
            Some(index) => self.routing_for_member(routing, name, index),
            None => Ok(routing.map(str::to_owned)),
        }
    }

    /// Like [`Metadata::resolve_index_routing`], but for a write: the alias
    /// must have a write index, and the routing of that index's alias entry
    /// applies.
    pub fn resolve_write_index_routing(
        &self,
        routing: Option<&str>,
        name: &str,
    ) -> anyhow::Result<Option<String>> {
        let Some(IndexAbstraction::Alias { write_index, .. }) = self.indices_lookup.get(name)
        else {
            return Ok(routing.map(str::to_owned));
        };
        let Some(write_index) = write_index else {
            anyhow::bail!(ErrorMetadata::precondition(
                "NoWriteIndex",
                format!("alias [{name}] does not have a write index"),
            ));
        };
        self.routing_for_member(routing, name, write_index)
    }

    fn routing_for_member(
        &self,
        routing: Option<&str>,
        alias: &str,
        member: &Index,
    ) -> anyhow::Result<Option<String>> {
        let alias_metadata = self
            .indices
            .get(member.name())
            .and_then(|index| index.alias(alias));
        match alias_metadata {
            Some(alias_metadata) => resolve_routing(routing, alias, alias_metadata),
            None => Ok(routing.map(str::to_owned)),
        }
    }
}

fn resolve_routing(
    routing: Option<&str>,
    alias: &str,
    alias_metadata: &AliasMetadata,
) -> anyhow::Result<Option<String>> {
    let Some(index_routing) = alias_metadata.index_routing() else {
        return Ok(routing.map(str::to_owned));
    };
    anyhow::ensure!(
        !index_routing.contains(','),
        ErrorMetadata::ambiguous_routing(
            "MultipleRoutingValues",
            format!(
                "index/alias [{alias}] provided with routing value [{index_routing}] that \
                 resolved to several routing values, rejecting operation"
            ),
        )
    );
    if let Some(routing) = routing {
        anyhow::ensure!(
            routing == index_routing,
            ErrorMetadata::ambiguous_routing(
                "ConflictingRouting",
                format!(
                    "Alias [{alias}] has index routing associated with it [{index_routing}], and \
                     was provided with routing value [{routing}], rejecting operation"
                ),
            )
        );
    }
    Ok(Some(index_routing.to_owned()))
}
