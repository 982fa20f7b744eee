//! Shard-to-benchmark resolution
//!
//! Each parallel shard owns a disjoint slice of the full benchmark suite.
//! The slices live in JSON map files keyed by shard index:
//!
//! ```json
//! {
//!     "0": { "benchmarks": ["speedometer2", "blink_perf.layout"] },
//!     "1": { "benchmarks": ["octane"] }
//! }
//! ```
//!
//! The resolver picks the map variant for the run, loads it once, and
//! returns the shard's benchmark list in file-declared order. Order is
//! significant: it fixes execution order and therefore reference-run
//! pairing downstream.

use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::config::ShardingConfig;
use crate::error::HarnessError;

/// Environment variable carrying the total shard count, set by the calling
/// harness per the gtest sharding protocol.
pub const TOTAL_SHARDS_ENV: &str = "GTEST_TOTAL_SHARDS";
/// Environment variable carrying this shard's index.
pub const SHARD_INDEX_ENV: &str = "GTEST_SHARD_INDEX";

/// One shard's entry in a map file
#[derive(Debug, Clone, Deserialize)]
pub struct ShardEntry {
    /// Benchmarks assigned to this shard, in execution order
    pub benchmarks: Vec<String>,
}

/// A fully loaded shard map, immutable after load
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct ShardMap {
    shards: HashMap<String, ShardEntry>,
}

impl ShardMap {
    /// Load and parse a map file. Malformed JSON is fatal, with no partial
    /// recovery.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, HarnessError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|source| HarnessError::ShardMapParse {
            map: path.display().to_string(),
            source,
        })
    }

    /// Benchmark list for one shard index, in declared order
    pub fn benchmarks(&self, index: &str) -> Option<&[String]> {
        self.shards.get(index).map(|e| e.benchmarks.as_slice())
    }

    /// Number of shards declared in the map
    pub fn len(&self) -> usize {
        self.shards.len()
    }

    /// Whether the map declares no shards at all
    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }
}

/// Which shard this process is, out of how many
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardIdentity {
    /// Total number of shards in the run
    pub total_shards: Option<u32>,
    /// This shard's zero-based index
    pub shard_index: Option<u32>,
}

impl ShardIdentity {
    /// Read shard identity from the gtest sharding environment variables.
    /// Unset or unparsable values are treated as absent; the resolver
    /// rejects incomplete identities.
    pub fn from_env() -> Self {
        Self {
            total_shards: read_env_u32(TOTAL_SHARDS_ENV),
            shard_index: read_env_u32(SHARD_INDEX_ENV),
        }
    }
}

fn read_env_u32(key: &str) -> Option<u32> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Resolves which benchmarks a shard must run
pub struct ShardResolver {
    config: ShardingConfig,
}

impl ShardResolver {
    /// Create a resolver with the given sharding policy
    pub fn new(config: ShardingConfig) -> Self {
        Self { config }
    }

    /// Resolve the benchmark list for this run.
    ///
    /// A non-empty `explicit` list is returned verbatim and bypasses the
    /// shard map entirely. Otherwise both fields of `identity` must be
    /// present; the selected map is loaded and the shard's declared list
    /// returned in order.
    ///
    /// # Errors
    ///
    /// - [`HarnessError::MissingShardInfo`] if no override is given and
    ///   either identity field is absent
    /// - [`HarnessError::ShardMapParse`] on malformed map JSON
    /// - [`HarnessError::UnknownShard`] if the index has no entry
    pub fn resolve(
        &self,
        identity: &ShardIdentity,
        testing: bool,
        explicit: &[String],
    ) -> Result<Vec<String>, HarnessError> {
        if !explicit.is_empty() {
            info!(count = explicit.len(), "using explicit benchmark list");
            return Ok(explicit.to_vec());
        }

        let (Some(total_shards), Some(shard_index)) =
            (identity.total_shards, identity.shard_index)
        else {
            return Err(HarnessError::MissingShardInfo);
        };

        let kind = self.config.select_map(total_shards, testing);
        let path = self.config.map_path(kind);
        debug!(map = %path.display(), total_shards, shard_index, "loading shard map");

        let map = ShardMap::from_file(&path)?;
        let index = shard_index.to_string();
        let benchmarks = map
            .benchmarks(&index)
            .ok_or_else(|| HarnessError::UnknownShard {
                index: index.clone(),
                map: path.display().to_string(),
            })?
            .to_vec();

        info!(
            shard = %index,
            count = benchmarks.len(),
            "resolved shard benchmark list"
        );
        Ok(benchmarks)
    }
}
