use thiserror::Error;

/// Failures the harness can surface before or between runner invocations.
///
/// Runner subprocess failures are not represented here; they travel as
/// nonzero return codes and feed the aggregate exit code instead.
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error(
        "shard identity incomplete: GTEST_TOTAL_SHARDS and GTEST_SHARD_INDEX must both be set \
         when no explicit benchmark list is given"
    )]
    MissingShardInfo,

    #[error("shard index {index} is not present in shard map {map}")]
    UnknownShard { index: String, map: String },

    #[error("failed to parse shard map {map}: {source}")]
    ShardMapParse {
        map: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("results for '{key}' were already written during this run")]
    DirectoryCollision { key: String },

    #[error("a reference run was requested but no browser target is configured")]
    MissingTargetSelector,

    #[error("single-executable mode requires the executable name as the first trailing argument")]
    MissingExecutable,

    #[error("failed to serialize results payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
