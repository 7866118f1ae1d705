//! Default constants for profile index configuration.

/// Number of partitions the keyspace is split into when not configured.
/// Matches the partition count of the queue that assigns ownership.
pub const DEFAULT_PARTITIONS: u32 = 10;

/// Empty member sets are kept attached to their keys after removals.
pub const DEFAULT_PRUNE_EMPTY_SETS: bool = false;

/// Prefix for environment variable overrides (e.g. `PROFILE_INDEX_PARTITIONS`).
pub const ENV_PREFIX: &str = "PROFILE_INDEX_";
