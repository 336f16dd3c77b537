//! Tunable limits for the metadata model.
//!
//! When running locally, these knobs can all be overridden with an environment
//! variable.
#![deny(missing_docs)]

use std::sync::LazyLock;

use cmd_util::env::env_config;
use semver::Version;

/// Maximum number of deleted-index tombstones kept in the index graveyard.
/// Adding past this limit purges the oldest tombstones first.
pub static MAX_INDEX_TOMBSTONES: LazyLock<usize> =
    LazyLock::new(|| env_config("MAX_INDEX_TOMBSTONES", 500));

/// System indices created on or after this version may not share an alias
/// with non-system indices. Older system indices are grandfathered in.
pub static SYSTEM_INDEX_ALIAS_ENFORCEMENT_VERSION: LazyLock<Version> = LazyLock::new(|| {
    env_config(
        "SYSTEM_INDEX_ALIAS_ENFORCEMENT_VERSION",
        Version::new(8, 0, 0),
    )
});

/// Whether snapshot reconciliation keeps a data stream none of whose backing
/// indices made it into the snapshot. When false such data streams are
/// dropped from the snapshot metadata.
pub static SNAPSHOT_RETAIN_EMPTY_DATA_STREAMS: LazyLock<bool> =
    LazyLock::new(|| env_config("SNAPSHOT_RETAIN_EMPTY_DATA_STREAMS", true));
