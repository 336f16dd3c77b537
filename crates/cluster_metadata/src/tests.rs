use std::sync::{
    Arc,
    atomic::{
        AtomicUsize,
        Ordering,
    },
};

use cmd_util::env::config_test;
use errors::{
    ErrorMetadata,
    ErrorMetadataAnyhowExt,
};
use maplit::btreemap;
use must_let::must_let;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use semver::Version;
use serde_json::json;

use crate::{
    AliasMetadata,
    ChangeOutcome,
    DataStream,
    EmptyDataStreamPolicy,
    FieldPredicate,
    IndexAbstraction,
    IndexAbstractionType,
    IndexState,
    LookupHint,
    MappingMetadata,
    Metadata,
    Settings,
    serialized::SerializedMetadata,
    snapshot_with_policy,
    testing::{
        arbitrary_metadata,
        data_stream,
        index,
        index_with_aliases,
        index_with_mapping,
        system_index,
    },
};

fn build(indices: Vec<crate::IndexMetadata>) -> anyhow::Result<Metadata> {
    let mut builder = Metadata::builder();
    for index in indices {
        builder.put_index(index)?;
    }
    builder.build()
}

fn alias(name: &str) -> AliasMetadata {
    AliasMetadata::new(name)
}

fn alias_names(found: &[AliasMetadata]) -> Vec<&str> {
    found.iter().map(|a| a.alias()).collect()
}

#[test]
fn test_alias_named_like_its_index_is_rejected() {
    config_test();
    let err = build(vec![index_with_aliases("index", vec![alias("index")])]).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(err.short_msg(), "InvalidMetadata");
    assert_eq!(
        err.msg(),
        "index, alias, and data stream names need to be unique, but the following duplicates \
         were found [index (alias of [index]) conflicts with index]"
    );
}

#[test]
fn test_alias_colliding_with_another_index_is_rejected() {
    let err = build(vec![
        index("logs"),
        index_with_aliases("metrics", vec![alias("logs")]),
    ])
    .unwrap_err();
    assert!(
        err.msg()
            .starts_with("index, alias, and data stream names need to be unique")
    );
    assert!(err.msg().contains("logs (alias of [metrics]) conflicts with index"));
}

#[test]
fn test_data_stream_conflicting_with_index_is_rejected() -> anyhow::Result<()> {
    let (data_stream, backing) = data_stream("my-data-stream", 1);
    let mut builder = Metadata::builder();
    builder.put(backing[0].clone(), LookupHint::Auto)?;
    builder.put_index(index("my-data-stream"))?;
    builder.put_data_stream(data_stream);
    let err = builder.build().unwrap_err();
    assert!(err.is_validation());
    assert!(err.msg().contains(
        "index, alias, and data stream names need to be unique, but the following duplicates \
         were found [data stream [my-data-stream] conflicts with index]"
    ));
    Ok(())
}

#[test]
fn test_data_stream_conflicting_with_alias_is_rejected() -> anyhow::Result<()> {
    let backing = index_with_aliases(
        &DataStream::backing_index_name("my-data-stream", 1),
        vec![alias("my-data-stream")],
    );
    let data_stream = DataStream::new("my-data-stream", vec![backing.index().clone()])?;
    let mut builder = Metadata::builder();
    builder.put_index(backing)?;
    builder.put_data_stream(data_stream);
    let err = builder.build().unwrap_err();
    assert!(err.msg().contains(
        "the following duplicates were found [my-data-stream (alias of \
         [.ds-my-data-stream-000001]) conflicts with data stream]"
    ));
    Ok(())
}

#[test]
fn test_alias_referring_to_backing_index_is_rejected() -> anyhow::Result<()> {
    let conflicting = DataStream::backing_index_name("my-data-stream", 2);
    let backing = index_with_aliases(
        &DataStream::backing_index_name("my-data-stream", 1),
        vec![alias(&conflicting)],
    );
    let data_stream = DataStream::new("my-data-stream", vec![backing.index().clone()])?;
    let mut builder = Metadata::builder();
    builder.put_index(backing)?;
    builder.put_data_stream(data_stream);
    let err = builder.build().unwrap_err();
    assert!(err.msg().contains(&format!(
        "aliases [{conflicting}] cannot refer to backing indices of data streams"
    )));
    // The alias is also named like the data stream's next backing index.
    assert!(err.msg().contains(&format!(
        "data stream [my-data-stream] could create backing indices that conflict with 1 \
         existing index(s) or alias(s) including '{conflicting}'"
    )));
    Ok(())
}

#[test]
fn test_backing_index_name_conflicts() -> anyhow::Result<()> {
    let name = "my-data-stream";
    let second = index(&DataStream::backing_index_name(name, 2));
    let third = index(&DataStream::backing_index_name(name, 3));
    let data_stream = DataStream::with_generation(
        name,
        vec![second.index().clone(), third.index().clone()],
        3,
    )?;

    // Generations at or below the current one can't be handed out again, so
    // an old backing index that left the data stream is fine.
    let mut builder = Metadata::builder();
    builder.put_index(second)?;
    builder.put_index(third)?;
    builder.put_index(index(&DataStream::backing_index_name(name, 1)))?;
    builder.put_data_stream(data_stream);
    builder.build()?;

    builder.put_index(index(&DataStream::backing_index_name(name, 7)))?;
    builder.put_index(index(&DataStream::backing_index_name(name, 9)))?;
    let err = builder.build().unwrap_err();
    assert!(err.msg().contains(
        "data stream [my-data-stream] could create backing indices that conflict with 2 existing \
         index(s) or alias(s) including '.ds-my-data-stream-000007'"
    ));

    // A generation past u64::MAX still counts as a future backing index.
    builder.remove(&DataStream::backing_index_name(name, 7))?;
    builder.remove(&DataStream::backing_index_name(name, 9))?;
    builder.put_index(index_with_aliases(
        "unrelated",
        vec![alias(".ds-my-data-stream-184467440737095516160")],
    ))?;
    let err = builder.build().unwrap_err();
    assert!(err.msg().contains(
        "could create backing indices that conflict with 1 existing index(s) or alias(s) \
         including '.ds-my-data-stream-184467440737095516160'"
    ));
    Ok(())
}

#[test]
fn test_data_stream_members_must_exist() -> anyhow::Result<()> {
    let (data_stream, backing) = data_stream("logs", 2);
    let mut builder = Metadata::builder();
    builder.put_index(backing[0].clone())?;
    // Same name, different uuid.
    builder.put_index(index(backing[1].name()))?;
    builder.put_data_stream(data_stream);
    let err = builder.build().unwrap_err();
    assert!(err.msg().contains(&format!(
        "data stream [logs] references backing index {} but the index in the cluster is",
        backing[1].index()
    )));

    builder.remove(backing[1].name())?;
    let err = builder.build().unwrap_err();
    assert!(
        err.msg()
            .contains("data stream [logs] references missing backing index [.ds-logs-000002]")
    );
    Ok(())
}

#[test]
fn test_backing_index_shared_by_two_data_streams() -> anyhow::Result<()> {
    let (logs, backing) = data_stream("logs", 1);
    let other = DataStream::new("other", vec![backing[0].index().clone()])?;
    let mut builder = Metadata::builder();
    builder.put_index(backing[0].clone())?;
    builder.put_data_stream(logs).put_data_stream(other);
    let err = builder.build().unwrap_err();
    assert!(err.msg().contains(
        "index [.ds-logs-000001] is a backing index of both data stream [logs] and [other]"
    ));
    Ok(())
}

#[test]
fn test_validate_alias_write_only() -> anyhow::Result<()> {
    let with_write = |name: &str, write: Option<bool>| {
        index_with_aliases(name, vec![alias("alias").with_write_index(write)])
    };
    let allowed = [
        (None, None),
        (None, Some(true)),
        (None, Some(false)),
        (Some(false), Some(false)),
        (Some(true), Some(false)),
    ];
    for (a, b) in allowed {
        let metadata = build(vec![with_write("index-a", a)])?;
        let mut builder = metadata.to_builder();
        builder.put_index(with_write("index-b", b))?;
        builder.build()?;
    }

    let err = build(vec![
        with_write("index-a", Some(true)),
        with_write("index-b", Some(true)),
    ])
    .unwrap_err();
    assert!(err.is_validation());
    assert!(
        err.msg()
            .starts_with("alias [alias] has more than one write index [index-a,index-b]")
    );
    Ok(())
}

#[test]
fn test_validate_hidden_alias_consistency() -> anyhow::Result<()> {
    let with_hidden = |name: &str, hidden: Option<bool>| {
        index_with_aliases(name, vec![alias("hidden-alias").with_hidden(hidden)])
    };
    build(vec![
        with_hidden("hidden-1", Some(true)),
        with_hidden("hidden-2", Some(true)),
    ])?;
    build(vec![
        with_hidden("non-hidden", Some(false)),
        with_hidden("unspecified", None),
    ])?;

    let err = build(vec![
        with_hidden("hidden-1", Some(true)),
        with_hidden("hidden-2", Some(true)),
        with_hidden("non-hidden", Some(false)),
    ])
    .unwrap_err();
    assert_eq!(
        err.msg(),
        "alias [hidden-alias] has is_hidden set to true on indices [hidden-1,hidden-2] but does \
         not have is_hidden set to true on indices [non-hidden]; alias must have the same \
         is_hidden setting on all indices"
    );

    // Unset counts as not hidden.
    let err = build(vec![
        with_hidden("hidden-1", Some(true)),
        with_hidden("unspecified", None),
    ])
    .unwrap_err();
    assert!(
        err.msg()
            .contains("but does not have is_hidden set to true on indices [unspecified]")
    );
    Ok(())
}

#[test]
fn test_system_alias_validation() -> anyhow::Result<()> {
    let current = Version::new(8, 1, 0);
    let legacy = Version::new(7, 17, 0);
    let new_system = system_index(".system-1", alias("system-alias"), current.clone());
    let old_system = system_index(".old-system", alias("system-alias"), legacy.clone());
    let regular = index_with_aliases(
        "regular-1",
        vec![alias("system-alias").with_write_index(Some(false))],
    );

    let err = build(vec![new_system.clone(), regular.clone()]).unwrap_err();
    assert_eq!(
        err.msg(),
        "alias [system-alias] refers to both system indices [.system-1] and non-system indices: \
         [regular-1], but aliases must refer to either system or non-system indices, not both"
    );

    // Grandfathered system indices aren't named, but a new one still fails.
    let err = build(vec![
        new_system.clone(),
        old_system.clone(),
        regular.clone(),
    ])
    .unwrap_err();
    assert!(err.msg().contains(
        "refers to both system indices [.system-1] and non-system indices: [regular-1]"
    ));

    build(vec![old_system.clone(), regular])?;
    build(vec![new_system, old_system])?;
    Ok(())
}

#[test]
fn test_violations_are_reported_together() {
    let err = build(vec![
        index_with_aliases("index", vec![alias("index")]),
        index_with_aliases("a", vec![alias("w").with_write_index(Some(true))]),
        index_with_aliases("b", vec![alias("w").with_write_index(Some(true))]),
    ])
    .unwrap_err();
    let violations: Vec<&str> = err.msg().split("; ").collect();
    assert_eq!(violations.len(), 2);
    assert!(violations[0].contains("conflicts with index"));
    assert!(violations[1].contains("has more than one write index [a,b]"));
}

#[test]
fn test_resolve_index_routing() -> anyhow::Result<()> {
    let metadata = build(vec![
        index_with_aliases(
            "index",
            vec![
                alias("alias0"),
                alias("alias1").with_routing("1"),
                alias("alias2").with_routing("1,2"),
                alias("alias3"),
            ],
        ),
        index_with_aliases("index2", vec![alias("alias3")]),
    ])?;

    assert_eq!(metadata.resolve_index_routing(None, "index")?, None);
    assert_eq!(
        metadata.resolve_index_routing(Some("0"), "index")?.as_deref(),
        Some("0")
    );
    assert_eq!(metadata.resolve_index_routing(None, "alias0")?, None);
    assert_eq!(
        metadata.resolve_index_routing(Some("0"), "alias0")?.as_deref(),
        Some("0")
    );
    assert_eq!(
        metadata.resolve_index_routing(None, "alias1")?.as_deref(),
        Some("1")
    );
    assert_eq!(
        metadata.resolve_index_routing(Some("1"), "alias1")?.as_deref(),
        Some("1")
    );

    let err = metadata
        .resolve_index_routing(Some("0"), "alias1")
        .unwrap_err();
    assert!(err.is_ambiguous_routing());
    assert_eq!(
        err.msg(),
        "Alias [alias1] has index routing associated with it [1], and was provided with routing \
         value [0], rejecting operation"
    );

    let err = metadata.resolve_index_routing(None, "alias2").unwrap_err();
    assert_eq!(err.short_msg(), "MultipleRoutingValues");
    assert_eq!(
        err.msg(),
        "index/alias [alias2] provided with routing value [1,2] that resolved to several routing \
         values, rejecting operation"
    );

    let err = metadata.resolve_index_routing(None, "alias3").unwrap_err();
    assert_eq!(err.short_msg(), "AmbiguousAliasRouting");
    assert_eq!(
        err.msg(),
        "Alias [alias3] has more than one index associated with it [index, index2], can't \
         execute a single index op"
    );

    // Names that resolve to nothing pass the routing through.
    assert_eq!(
        metadata.resolve_index_routing(Some("5"), "missing")?.as_deref(),
        Some("5")
    );
    Ok(())
}

#[test]
fn test_resolve_write_index_routing() -> anyhow::Result<()> {
    let metadata = build(vec![
        index_with_aliases(
            "index-a",
            vec![
                alias("writable").with_write_index(Some(true)).with_routing("1"),
                alias("no-writer"),
            ],
        ),
        index_with_aliases(
            "index-b",
            vec![
                alias("writable").with_write_index(Some(false)),
                alias("no-writer"),
            ],
        ),
        index_with_aliases("index-c", vec![alias("single").with_routing("3")]),
    ])?;

    assert_eq!(
        metadata.resolve_write_index_routing(None, "writable")?.as_deref(),
        Some("1")
    );
    assert!(
        metadata
            .resolve_write_index_routing(Some("2"), "writable")
            .unwrap_err()
            .is_ambiguous_routing()
    );
    // A sole member with an unset write flag is the write index.
    assert_eq!(
        metadata.resolve_write_index_routing(None, "single")?.as_deref(),
        Some("3")
    );
    assert_eq!(
        metadata.resolve_write_index_routing(Some("7"), "index-a")?.as_deref(),
        Some("7")
    );

    let err = metadata
        .resolve_write_index_routing(None, "no-writer")
        .unwrap_err();
    assert!(err.is_precondition());
    assert_eq!(err.msg(), "alias [no-writer] does not have a write index");
    Ok(())
}

#[test]
fn test_find_aliases() -> anyhow::Result<()> {
    let metadata = build(vec![index_with_aliases(
        "index",
        vec![alias("alias2"), alias("alias1")],
    )])?;

    assert!(metadata.find_aliases(&[], &["index"])?.is_empty());
    assert!(metadata.find_aliases(&["alias1"], &[])?.is_empty());
    assert!(metadata.find_aliases(&["nomatch*"], &["index"])?.is_empty());

    let found = metadata.find_aliases(&["alias1"], &["index"])?;
    assert_eq!(alias_names(&found["index"]), vec!["alias1"]);

    let found = metadata.find_aliases(&["alias*"], &["index"])?;
    assert_eq!(alias_names(&found["index"]), vec!["alias1", "alias2"]);

    let found = metadata.find_aliases(&["_all"], &["index"])?;
    assert_eq!(alias_names(&found["index"]), vec!["alias1", "alias2"]);

    let found = metadata.find_aliases(&["*", "-alias1"], &["index"])?;
    assert_eq!(alias_names(&found["index"]), vec!["alias2"]);

    // Exclusions are plain globs, so `-_all` only excludes an alias named `_all`.
    let found = metadata.find_aliases(&["*", "-_all"], &["index"])?;
    assert_eq!(alias_names(&found["index"]), vec!["alias1", "alias2"]);
    let found = metadata.find_aliases(&["alias*", "-*"], &["index"])?;
    assert!(found.is_empty());

    assert!(
        metadata
            .find_aliases(&["*"], &["missing"])
            .unwrap_err()
            .is_not_found()
    );
    Ok(())
}

#[test]
fn test_find_aliases_with_exclusion_and_wildcards() -> anyhow::Result<()> {
    let metadata = build(vec![index_with_aliases(
        "index",
        vec![alias("aa"), alias("ab"), alias("bb")],
    )])?;
    let found = metadata.find_aliases(&["a*", "-*b", "b*"], &["index"])?;
    assert_eq!(alias_names(&found["index"]), vec!["aa", "bb"]);

    let found = metadata.find_aliases(&["a*", "-*b", "b*", "-b*"], &["index"])?;
    assert_eq!(alias_names(&found["index"]), vec!["aa"]);
    Ok(())
}

#[test]
fn test_find_all_aliases() -> anyhow::Result<()> {
    let metadata = build(vec![
        index_with_aliases("index", vec![alias("b"), alias("a")]),
        index("no-aliases"),
    ])?;
    let found = metadata.find_all_aliases(&["index", "no-aliases"])?;
    assert_eq!(
        found
            .iter()
            .map(|(k, v)| (k.as_str(), alias_names(v)))
            .collect::<std::collections::BTreeMap<_, _>>(),
        btreemap! { "index" => vec!["a", "b"] }
    );
    Ok(())
}

fn mapping_source() -> serde_json::Value {
    json!({
        "properties": {
            "name": {
                "type": "text",
                "fields": {"keyword": {"type": "keyword"}}
            },
            "address": {
                "properties": {
                    "street": {"type": "keyword"},
                    "zip": {"type": "keyword"}
                }
            },
            "age": {"type": "long"}
        }
    })
}

#[test]
fn test_find_mappings_accept_all_returns_shared_instance() -> anyhow::Result<()> {
    let metadata = build(vec![
        index_with_mapping("index1", mapping_source()),
        index_with_mapping("index2", mapping_source()),
        index("unmapped"),
    ])?;
    let calls = AtomicUsize::new(0);
    let found = metadata.find_mappings(
        &["index1", "index2", "unmapped"],
        |_| FieldPredicate::AcceptAll,
        || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        },
    )?;
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(Arc::ptr_eq(&found["index1"], &found["index2"]));
    let stored = metadata
        .mappings_by_hash(found["index1"].sha256())
        .cloned()
        .expect("mapping is stored");
    assert!(Arc::ptr_eq(&found["index1"], &stored));
    assert!(Arc::ptr_eq(&found["unmapped"], &MappingMetadata::empty()));
    Ok(())
}

#[test]
fn test_find_mappings_with_field_filter() -> anyhow::Result<()> {
    let metadata = build(vec![
        index_with_mapping("index1", mapping_source()),
        index_with_mapping("index2", mapping_source()),
    ])?;
    let found = metadata.find_mappings(
        &["index1", "index2"],
        |index| {
            if index == "index1" {
                FieldPredicate::filter(|field| field.starts_with("name") || field == "address.zip")
            } else {
                FieldPredicate::AcceptAll
            }
        },
        || Ok(()),
    )?;

    assert_eq!(
        serde_json::Value::Object(found["index1"].source_as_map().clone()),
        json!({
            "properties": {
                "name": {
                    "type": "text",
                    "fields": {"keyword": {"type": "keyword"}}
                },
                "address": {
                    "properties": {"zip": {"type": "keyword"}}
                }
            }
        })
    );
    assert_eq!(
        serde_json::Value::Object(found["index2"].source_as_map().clone()),
        mapping_source()
    );
    Ok(())
}

#[test]
fn test_find_mappings_keeps_multi_field_of_excluded_field() -> anyhow::Result<()> {
    let metadata = build(vec![index_with_mapping("index", mapping_source())])?;
    let found = metadata.find_mappings(
        &["index"],
        |_| FieldPredicate::filter(|field| field == "name.keyword"),
        || Ok(()),
    )?;
    assert_eq!(
        serde_json::Value::Object(found["index"].source_as_map().clone()),
        json!({
            "properties": {
                "name": {
                    "properties": {"keyword": {"type": "keyword"}}
                }
            }
        })
    );
    Ok(())
}

#[test]
fn test_find_mappings_errors() -> anyhow::Result<()> {
    let metadata = build(vec![index_with_mapping("index", mapping_source())])?;
    let err = metadata
        .find_mappings(&["missing"], |_| FieldPredicate::AcceptAll, || Ok(()))
        .unwrap_err();
    assert!(err.is_not_found());

    let err = metadata
        .find_mappings(
            &["index"],
            |_| FieldPredicate::AcceptAll,
            || {
                anyhow::bail!(ErrorMetadata::precondition("Cancelled", "task cancelled"));
            },
        )
        .unwrap_err();
    assert_eq!(err.short_msg(), "Cancelled");
    assert!(metadata.find_mappings(&[], |_| FieldPredicate::AcceptAll, || Ok(()))?.is_empty());
    Ok(())
}

#[test]
fn test_mapping_store_tracks_distinct_mappings() -> anyhow::Result<()> {
    let other_source = json!({"properties": {"other": {"type": "keyword"}}});
    let metadata = build(vec![
        index_with_mapping("index1", mapping_source()),
        index_with_mapping("index2", mapping_source()),
    ])?;
    assert_eq!(metadata.mapping_store().len(), 1);
    assert!(Arc::ptr_eq(
        metadata.index("index1").and_then(|i| i.mapping()).expect("mapped"),
        metadata.index("index2").and_then(|i| i.mapping()).expect("mapped"),
    ));

    let mut builder = metadata.to_builder();
    builder.put_index(index_with_mapping("index3", mapping_source()))?;
    assert_eq!(builder.build()?.mapping_store().len(), 1);

    builder.put_index(index_with_mapping("index4", other_source.clone()))?;
    let metadata = builder.build()?;
    assert_eq!(metadata.mapping_store().len(), 2);

    let mut builder = metadata.to_builder();
    builder.remove("index1")?.remove("index2")?;
    assert_eq!(builder.build()?.mapping_store().len(), 2);
    builder.remove("index3")?;
    let metadata = builder.build()?;
    assert_eq!(metadata.mapping_store().len(), 1);
    let other_hash = MappingMetadata::new("_doc", other_source)?.sha256().to_owned();
    assert_eq!(
        metadata.mapping_store().hashes().collect::<Vec<_>>(),
        vec![other_hash.as_str()]
    );

    // Replacing a mapping releases the old one.
    let mut builder = metadata.to_builder();
    builder.put_index(index_with_mapping("index4", mapping_source()))?;
    let metadata = builder.build()?;
    assert_eq!(metadata.mapping_store().len(), 1);
    assert_eq!(
        metadata.mapping_store().reference_count(
            metadata.index("index4").and_then(|i| i.mapping_hash()).expect("mapped")
        ),
        1
    );
    Ok(())
}

#[test]
fn test_indices_lookup_is_reused_when_nothing_relevant_changed() -> anyhow::Result<()> {
    let metadata = build(vec![
        index_with_aliases("index", vec![alias("alias")]),
        index_with_mapping("mapped", mapping_source()),
        index("other"),
    ])?;

    let rebuilt = metadata.to_builder().build()?;
    assert!(Arc::ptr_eq(metadata.indices_lookup(), rebuilt.indices_lookup()));
    assert!(Arc::ptr_eq(metadata.mapping_store(), rebuilt.mapping_store()));

    let mut builder = metadata.to_builder();
    let more_replicas = metadata
        .index("other")
        .expect("exists")
        .to_builder()
        .number_of_replicas(2)
        .build()?;
    builder.put_index(more_replicas)?;
    builder.transient_settings(Settings::empty().with("cluster.routing.allocation.enable", "none"));
    builder.put_custom("ingest", json!({"pipelines": []}))?;
    let settings_only = builder.build()?;
    assert!(Arc::ptr_eq(
        metadata.indices_lookup(),
        settings_only.indices_lookup()
    ));
    // Putting an unmapped index leaves the mapping store alone.
    assert!(Arc::ptr_eq(
        metadata.mapping_store(),
        settings_only.mapping_store()
    ));
    // Same builder, no further changes.
    let again = builder.build()?;
    assert!(Arc::ptr_eq(settings_only.indices_lookup(), again.indices_lookup()));
    assert_eq!(settings_only.version(), again.version());

    let mut builder = metadata.to_builder();
    let aliased = metadata
        .index("other")
        .expect("exists")
        .to_builder()
        .put_alias(alias("alias"))
        .build()?;
    builder.put_index(aliased)?;
    let changed = builder.build()?;
    assert!(!Arc::ptr_eq(metadata.indices_lookup(), changed.indices_lookup()));
    must_let!(let Some(IndexAbstraction::Alias { indices, .. }) = changed.indices_lookup().get("alias"));
    assert_eq!(indices.len(), 2);

    let mut builder = metadata.to_builder();
    builder.put(metadata.index("other").expect("exists").clone(), LookupHint::Rebuild)?;
    assert!(!Arc::ptr_eq(
        metadata.indices_lookup(),
        builder.build()?.indices_lookup()
    ));
    Ok(())
}

#[test]
fn test_build_idempotent_on_fresh_builder() -> anyhow::Result<()> {
    let mut builder = Metadata::builder();
    builder.put_index(index_with_aliases("index", vec![alias("alias")]))?;
    let first = builder.build()?;
    let second = builder.build()?;
    assert!(Arc::ptr_eq(first.indices_lookup(), second.indices_lookup()));
    assert_eq!(first.indices(), second.indices());
    assert_eq!(first.version(), 1);
    assert_eq!(second.version(), 1);
    Ok(())
}

#[test]
fn test_versions() -> anyhow::Result<()> {
    let metadata = build(vec![index("index")])?;
    assert_eq!(metadata.version(), 1);
    let next = metadata.to_builder().build()?;
    assert_eq!(next.version(), 2);
    let explicit = next.to_builder().version(42).build()?;
    assert_eq!(explicit.version(), 42);
    assert_eq!(Metadata::empty().version(), 0);
    Ok(())
}

#[test]
fn test_indices_lookup_contents() -> anyhow::Result<()> {
    let (logs, backing) = data_stream("logs", 2);
    let mut builder = Metadata::builder();
    for index in backing.iter().cloned() {
        builder.put_index(index)?;
    }
    builder.put_index(index_with_aliases(
        "index-a",
        vec![alias("single"), alias("pair").with_write_index(Some(true))],
    ))?;
    builder.put_index(index_with_aliases("index-b", vec![alias("pair")]))?;
    builder.put_data_stream(logs);
    builder.put_data_stream_alias("all-logs", "logs", None, None)?;
    let metadata = builder.build()?;
    let lookup = metadata.indices_lookup();

    let names: Vec<&str> = lookup.names().collect();
    assert_eq!(
        names,
        vec![
            ".ds-logs-000001",
            ".ds-logs-000002",
            "all-logs",
            "index-a",
            "index-b",
            "logs",
            "pair",
            "single",
        ]
    );

    must_let!(let Some(backing_entry) = lookup.get(".ds-logs-000001"));
    assert_eq!(backing_entry.kind(), IndexAbstractionType::ConcreteIndex);
    assert_eq!(backing_entry.parent_data_stream(), Some("logs"));

    must_let!(let Some(single) = lookup.get("single"));
    assert_eq!(single.write_index().map(|i| i.name()), Some("index-a"));
    must_let!(let Some(pair) = lookup.get("pair"));
    assert_eq!(pair.member_names(), vec!["index-a", "index-b"]);
    assert_eq!(pair.write_index().map(|i| i.name()), Some("index-a"));
    must_let!(let Some(index_a) = lookup.get("index-a"));
    assert_eq!(
        index_a.aliases().map(|a| a.iter().map(|s| s.as_str()).collect::<Vec<_>>()),
        Some(vec!["pair", "single"])
    );

    must_let!(let Some(data_stream) = lookup.get("logs"));
    assert_eq!(data_stream.write_index().map(|i| i.name()), Some(".ds-logs-000002"));
    assert_eq!(
        data_stream.aliases().map(|a| a.len()),
        Some(1)
    );

    must_let!(let Some(data_stream_alias) = lookup.get("all-logs"));
    assert_eq!(data_stream_alias.kind(), IndexAbstractionType::DataStreamAlias);
    assert_eq!(data_stream_alias.member_names(), vec!["logs"]);
    assert_eq!(data_stream_alias.indices().len(), 2);
    assert!(data_stream_alias.write_index().is_none());
    assert!(data_stream_alias.aliases().is_none());

    assert!(metadata.has_alias("pair"));
    assert!(!metadata.has_alias("all-logs"));
    assert!(!metadata.has_alias("index-a"));
    Ok(())
}

#[test]
fn test_data_stream_alias_updates() -> anyhow::Result<()> {
    let (eu, eu_backing) = data_stream("logs-eu", 1);
    let (us, us_backing) = data_stream("logs-us", 1);
    let mut builder = Metadata::builder();
    for index in eu_backing.into_iter().chain(us_backing) {
        builder.put_index(index)?;
    }
    builder.put_data_stream(eu).put_data_stream(us);

    assert_eq!(
        builder.put_data_stream_alias("logs", "logs-eu", None, None)?,
        ChangeOutcome::Added
    );
    assert_eq!(
        builder.put_data_stream_alias("logs", "logs-eu", None, None)?,
        ChangeOutcome::Unchanged
    );
    assert_eq!(
        builder.put_data_stream_alias("logs", "logs-eu", Some(true), None)?,
        ChangeOutcome::Updated
    );
    assert_eq!(
        builder.put_data_stream_alias("logs", "logs-us", Some(true), None)?,
        ChangeOutcome::Added
    );
    let metadata = builder.build()?;
    must_let!(let Some(alias) = metadata.data_stream_alias("logs"));
    assert_eq!(alias.write_data_stream(), Some("logs-us"));
    assert_eq!(alias.data_streams().len(), 2);

    let err = builder
        .put_data_stream_alias("logs", "missing", None, None)
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(
        err.msg(),
        "alias [logs] refers to a non existing data stream [missing]"
    );

    assert_eq!(
        builder.remove_data_stream_alias("logs", "logs-us", true)?,
        ChangeOutcome::Removed
    );
    let err = builder
        .remove_data_stream_alias("logs", "logs-us", true)
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.msg(), "alias [logs] doesn't exist");
    assert_eq!(
        builder.remove_data_stream_alias("logs", "logs-us", false)?,
        ChangeOutcome::Unchanged
    );

    let metadata = builder.build()?;
    must_let!(let Some(alias) = metadata.data_stream_alias("logs"));
    assert_eq!(alias.write_data_stream(), None);

    // Removing the last member data stream removes the alias.
    assert_eq!(builder.remove_data_stream("logs-eu"), ChangeOutcome::Removed);
    let metadata = builder.build()?;
    assert!(metadata.data_stream_alias("logs").is_none());
    assert!(metadata.indices_lookup().get("logs").is_none());
    Ok(())
}

#[test]
fn test_data_stream_alias_name_collisions() -> anyhow::Result<()> {
    let (logs, backing) = data_stream("logs", 1);
    let mut builder = Metadata::builder();
    builder.put_index(backing[0].clone())?;
    builder.put_index(index_with_aliases("plain", vec![alias("shared")]))?;
    builder.put_data_stream(logs);
    builder.put_data_stream_alias("shared", "logs", None, None)?;
    builder.put_data_stream_alias("plain", "logs", None, None)?;
    builder.put_data_stream_alias("logs", "logs", None, None)?;
    let err = builder.build().unwrap_err();
    assert!(err.msg().contains("data stream alias and indices alias have the same name (shared)"));
    assert!(err.msg().contains("data stream alias and indices have the same name (plain)"));
    assert!(err.msg().contains("data stream alias and data stream have the same name (logs)"));
    Ok(())
}

#[test]
fn test_null_customs_are_rejected() -> anyhow::Result<()> {
    let mut builder = Metadata::builder();
    let err = builder
        .put_custom("repositories", serde_json::Value::Null)
        .unwrap_err();
    assert!(err.is_bad_request());
    assert_eq!(err.short_msg(), "NullCustomValue");
    assert!(err.msg().contains("[repositories]"));

    let err = builder
        .customs(vec![
            ("a".to_owned(), json!(1)),
            ("b".to_owned(), serde_json::Value::Null),
        ])
        .unwrap_err();
    assert!(err.msg().contains("[b]"));

    builder.put_custom("repositories", json!({"backup": {"type": "fs"}}))?;
    let metadata = builder.build()?;
    assert_eq!(
        metadata.custom("repositories"),
        Some(&json!({"backup": {"type": "fs"}}))
    );
    builder.remove_custom("repositories");
    assert!(builder.build()?.custom("repositories").is_none());
    Ok(())
}

#[test]
fn test_index_listing_and_shard_counts() -> anyhow::Result<()> {
    let hidden = crate::IndexMetadata::builder(".hidden")
        .number_of_shards(2)
        .number_of_replicas(1)
        .hidden(true)
        .build()?;
    let closed = crate::IndexMetadata::builder("closed")
        .number_of_shards(3)
        .number_of_replicas(0)
        .state(IndexState::Close)
        .build()?;
    let metadata = build(vec![hidden, closed, index("open")])?;

    assert_eq!(metadata.all_indices(), vec![".hidden", "closed", "open"]);
    assert_eq!(metadata.visible_indices(), vec!["closed", "open"]);
    assert_eq!(metadata.visible_open_indices(), vec!["open"]);
    assert_eq!(metadata.visible_closed_indices(), vec!["closed"]);
    assert_eq!(metadata.total_number_of_shards(), 4 + 3 + 1);
    assert_eq!(metadata.total_open_index_shards(), 4 + 1);
    Ok(())
}

#[test]
fn test_shard_totals_do_not_overflow() -> anyhow::Result<()> {
    let big = crate::IndexMetadata::builder("big")
        .number_of_shards(65_536)
        .number_of_replicas(65_536)
        .build()?;
    assert_eq!(big.total_number_of_shards(), 65_536 * 65_537);
    let metadata = build(vec![big, index("small")])?;
    assert_eq!(metadata.total_number_of_shards(), 65_536 * 65_537 + 1);
    assert_eq!(metadata.total_open_index_shards(), 65_536 * 65_537 + 1);
    Ok(())
}

#[test]
fn test_delete_index_leaves_tombstone() -> anyhow::Result<()> {
    let metadata = build(vec![index("logs"), index("metrics")])?;
    let deleted = metadata.index("logs").expect("exists").index().clone();
    let mut builder = metadata.to_builder();
    builder.delete_index("logs", 1_000)?;
    builder.delete_index("missing", 2_000)?;
    let metadata = builder.build()?;
    assert!(!metadata.has_index("logs"));
    assert_eq!(metadata.index_graveyard().len(), 1);
    assert!(metadata.index_graveyard().contains_index(&deleted));
    assert!(!Metadata::is_global_state_equal(
        &metadata,
        &build(vec![index("metrics")])?
    ));
    Ok(())
}

#[test]
fn test_settings_merge_transient_over_persistent() -> anyhow::Result<()> {
    let mut builder = Metadata::builder();
    builder
        .persistent_settings(Settings::empty().with("a", 1).with("b", 1))
        .transient_settings(Settings::empty().with("b", 2));
    let metadata = builder.build()?;
    assert_eq!(metadata.settings().get("a"), Some("1"));
    assert_eq!(metadata.settings().get("b"), Some("2"));
    assert_eq!(metadata.persistent_settings().get("b"), Some("1"));
    Ok(())
}

#[test]
fn test_find_data_streams() -> anyhow::Result<()> {
    let (logs, backing) = data_stream("logs", 2);
    let mut builder = Metadata::builder();
    for index in backing {
        builder.put_index(index)?;
    }
    builder.put_index(index("plain"))?;
    builder.put_data_stream(logs);
    let metadata = builder.build()?;
    let found = metadata.find_data_streams(&[".ds-logs-000002", "plain", "missing"]);
    assert_eq!(found.len(), 1);
    assert_eq!(found[".ds-logs-000002"].name(), "logs");
    Ok(())
}

fn snapshot_fixture() -> anyhow::Result<Metadata> {
    let (logs, logs_backing) = data_stream("logs", 3);
    let (metrics, metrics_backing) = data_stream("metrics", 1);
    let mut builder = Metadata::builder();
    for index in logs_backing.into_iter().chain(metrics_backing) {
        builder.put_index(index)?;
    }
    builder.put_data_stream(logs).put_data_stream(metrics);
    builder.put_data_stream_alias("everything", "logs", Some(true), None)?;
    builder.put_data_stream_alias("everything", "metrics", None, None)?;
    builder.put_data_stream_alias("only-metrics", "metrics", None, None)?;
    builder.build()
}

#[test]
fn test_snapshot_filters_backing_indices() -> anyhow::Result<()> {
    let metadata = snapshot_fixture()?;
    let snapshot = snapshot_with_policy(
        &metadata,
        &["logs"],
        &[".ds-logs-000003", ".ds-logs-000001"],
        EmptyDataStreamPolicy::Retain,
    )?;
    must_let!(let Some(logs) = snapshot.data_stream("logs"));
    let names: Vec<&str> = logs.indices().iter().map(|i| i.name()).collect();
    assert_eq!(names, vec![".ds-logs-000001", ".ds-logs-000003"]);
    assert_eq!(logs.generation(), 3);

    // Unrequested data streams go, and so do their alias memberships.
    assert!(snapshot.data_stream("metrics").is_none());
    assert!(snapshot.data_stream_alias("only-metrics").is_none());
    must_let!(let Some(everything) = snapshot.data_stream_alias("everything"));
    assert_eq!(everything.data_streams().len(), 1);
    assert_eq!(everything.write_data_stream(), Some("logs"));
    Ok(())
}

#[test]
fn test_snapshot_empty_data_stream_policy() -> anyhow::Result<()> {
    let metadata = snapshot_fixture()?;
    let retained = snapshot_with_policy(
        &metadata,
        &["logs", "metrics"],
        &[".ds-logs-000001"],
        EmptyDataStreamPolicy::Retain,
    )?;
    must_let!(let Some(metrics) = retained.data_stream("metrics"));
    assert!(metrics.indices().is_empty());
    assert!(metrics.write_index().is_none());

    let dropped = snapshot_with_policy(
        &metadata,
        &["logs", "metrics"],
        &[".ds-logs-000001"],
        EmptyDataStreamPolicy::Drop,
    )?;
    assert!(dropped.data_stream("metrics").is_none());
    assert!(dropped.data_stream("logs").is_some());
    Ok(())
}

#[test]
fn test_snapshot_unknown_data_stream() -> anyhow::Result<()> {
    let metadata = snapshot_fixture()?;
    let err = crate::snapshot(&metadata, &["missing"], &[]).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.msg(), "unable to find data stream [missing]");
    Ok(())
}

fn round_trip(metadata: &Metadata) -> anyhow::Result<Metadata> {
    let serialized = serde_json::to_string(&SerializedMetadata::from(metadata))?;
    let deserialized: SerializedMetadata = serde_json::from_str(&serialized)?;
    deserialized.try_into()
}

#[test]
fn test_serialization_round_trip() -> anyhow::Result<()> {
    let mut builder = snapshot_fixture()?.to_builder();
    builder
        .cluster_uuid("cluster-1")
        .cluster_uuid_committed(true)
        .persistent_settings(Settings::empty().with("cluster.name", "test"));
    builder.put_custom("ingest", json!({"pipelines": [{"id": "a"}]}))?;
    builder.put_index(index_with_aliases(
        "aliased",
        vec![
            alias("filtered")
                .with_filter(json!({"term": {"user": "a"}}))
                .with_index_routing("1")
                .with_search_routing("1,2")
                .with_write_index(Some(true))
                .with_hidden(Some(false)),
        ],
    ))?;
    builder.put_index(index_with_mapping("mapped-1", mapping_source()))?;
    builder.put_index(index_with_mapping("mapped-2", mapping_source()))?;
    builder.delete_index("aliased", 5)?;
    builder.put_index(index_with_aliases(
        "aliased",
        vec![alias("filtered").with_routing("3")],
    ))?;
    let metadata = builder.build()?;

    let restored = round_trip(&metadata)?;
    assert!(Metadata::is_global_state_equal(&metadata, &restored));
    assert_eq!(metadata.indices(), restored.indices());
    assert_eq!(metadata.version(), restored.version());
    assert_eq!(restored.mapping_store().len(), 1);
    assert!(Arc::ptr_eq(
        restored.index("mapped-1").and_then(|i| i.mapping()).expect("mapped"),
        restored.index("mapped-2").and_then(|i| i.mapping()).expect("mapped"),
    ));
    assert_eq!(
        restored.indices_lookup().names().collect::<Vec<_>>(),
        metadata.indices_lookup().names().collect::<Vec<_>>()
    );
    Ok(())
}

#[test]
fn test_deserialization_rejects_tampered_mapping() -> anyhow::Result<()> {
    let metadata = build(vec![index_with_mapping("index", mapping_source())])?;
    let mut serialized = SerializedMetadata::from(&metadata);
    for mapping in serialized.mappings.values_mut() {
        mapping.source.insert("dynamic".to_owned(), json!(false));
    }
    assert!(Metadata::try_from(serialized).is_err());
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, failure_persistence: None, ..ProptestConfig::default() })]

    #[test]
    fn test_arbitrary_metadata_round_trips(metadata in arbitrary_metadata()) {
        let restored = round_trip(&metadata).unwrap();
        prop_assert!(Metadata::is_global_state_equal(&metadata, &restored));
        prop_assert_eq!(metadata.indices(), restored.indices());
    }

    #[test]
    fn test_mapping_store_matches_distinct_hashes(metadata in arbitrary_metadata()) {
        let distinct: std::collections::BTreeSet<&str> = metadata
            .indices()
            .values()
            .filter_map(|i| i.mapping_hash())
            .collect();
        prop_assert_eq!(metadata.mapping_store().len(), distinct.len());
        for hash in distinct {
            let references = metadata
                .indices()
                .values()
                .filter(|i| i.mapping_hash() == Some(hash))
                .count();
            prop_assert_eq!(metadata.mapping_store().reference_count(hash), references);
        }
    }

    #[test]
    fn test_unmodified_rebuild_reuses_lookup(metadata in arbitrary_metadata()) {
        let rebuilt = metadata.to_builder().build().unwrap();
        prop_assert!(Arc::ptr_eq(metadata.indices_lookup(), rebuilt.indices_lookup()));
        prop_assert_eq!(metadata.indices(), rebuilt.indices());
    }

    #[test]
    fn test_namespace_is_partitioned(metadata in arbitrary_metadata()) {
        let lookup = metadata.indices_lookup();
        let expected = metadata.indices().len()
            + metadata.data_streams().len()
            + metadata.data_stream_aliases().len()
            + metadata
                .indices()
                .values()
                .flat_map(|i| i.aliases().keys().cloned())
                .collect::<std::collections::BTreeSet<_>>()
                .len();
        prop_assert_eq!(lookup.len(), expected);
    }
}
