//! Policy configuration for the harness
//!
//! Every tunable the orchestration logic consults lives here: the shard-map
//! selection policy, the histogram-output whitelist, and the flags added to
//! reference-build runs. Each component receives its slice of this
//! configuration at construction time, so tests can substitute policy
//! without touching global state.
//!
//! A `harness.toml` file can override any of the built-in defaults:
//!
//! ```toml
//! [sharding]
//! desktop_shard_ceiling = 26
//! map_dir = "shard_maps"
//!
//! [formats]
//! histogram_benchmarks = ["blink_perf.layout"]
//!
//! [reference]
//! max_failures = 5
//! trace_tag = "_ref"
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level harness configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HarnessConfig {
    /// Shard-map selection policy
    #[serde(default)]
    pub sharding: ShardingConfig,
    /// Output-format negotiation policy
    #[serde(default)]
    pub formats: FormatConfig,
    /// Reference-build run policy
    #[serde(default)]
    pub reference: ReferenceConfig,
}

impl HarnessConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the TOML is malformed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("Failed to parse TOML configuration")
    }
}

/// Which shard-map variant serves a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapKind {
    /// Full desktop suite map
    Desktop,
    /// Full mobile suite map
    Mobile,
    /// Small fixed map for harness test runs
    Testing,
}

/// Shard-map selection policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardingConfig {
    /// Largest total-shard count still served by the desktop map (default: 26)
    #[serde(default = "default_desktop_shard_ceiling")]
    pub desktop_shard_ceiling: u32,
    /// Directory holding the shard-map variants
    #[serde(default = "default_map_dir")]
    pub map_dir: PathBuf,
    /// Desktop map file name
    #[serde(default = "default_desktop_map")]
    pub desktop_map: String,
    /// Mobile map file name
    #[serde(default = "default_mobile_map")]
    pub mobile_map: String,
    /// Testing map file name
    #[serde(default = "default_testing_map")]
    pub testing_map: String,
}

impl Default for ShardingConfig {
    fn default() -> Self {
        Self {
            desktop_shard_ceiling: default_desktop_shard_ceiling(),
            map_dir: default_map_dir(),
            desktop_map: default_desktop_map(),
            mobile_map: default_mobile_map(),
            testing_map: default_testing_map(),
        }
    }
}

fn default_desktop_shard_ceiling() -> u32 {
    26
}
fn default_map_dir() -> PathBuf {
    PathBuf::from("shard_maps")
}
fn default_desktop_map() -> String {
    "desktop_shard_map.json".to_string()
}
fn default_mobile_map() -> String {
    "mobile_shard_map.json".to_string()
}
fn default_testing_map() -> String {
    "testing_shard_map.json".to_string()
}

impl ShardingConfig {
    /// Select the map variant for a run. Pure function of the inputs:
    /// testing runs always use the testing map, otherwise the total shard
    /// count decides between the desktop and mobile maps.
    pub fn select_map(&self, total_shards: u32, testing: bool) -> MapKind {
        if testing {
            MapKind::Testing
        } else if total_shards <= self.desktop_shard_ceiling {
            MapKind::Desktop
        } else {
            MapKind::Mobile
        }
    }

    /// Path to the map file backing a [`MapKind`]
    pub fn map_path(&self, kind: MapKind) -> PathBuf {
        let file = match kind {
            MapKind::Desktop => &self.desktop_map,
            MapKind::Mobile => &self.mobile_map,
            MapKind::Testing => &self.testing_map,
        };
        self.map_dir.join(file)
    }
}

/// Output-format negotiation policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatConfig {
    /// Benchmarks known to emit histogram-set output; everything else
    /// defaults to chartjson.
    #[serde(default = "default_histogram_benchmarks")]
    pub histogram_benchmarks: Vec<String>,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            histogram_benchmarks: default_histogram_benchmarks(),
        }
    }
}

fn default_histogram_benchmarks() -> Vec<String> {
    [
        "dummy_benchmark.histogram_benchmark_1",
        "blink_perf.bindings",
        "blink_perf.canvas",
        "blink_perf.css",
        "blink_perf.dom",
        "blink_perf.events",
        "blink_perf.image_decoder",
        "blink_perf.layout",
        "blink_perf.owp_storage",
        "blink_perf.paint",
        "blink_perf.parser",
        "blink_perf.shadow_dom",
        "blink_perf.svg",
        "memory.top_10_mobile",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Reference-build run policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// Browser target substituted for reference runs
    #[serde(default = "default_reference_target")]
    pub target: String,
    /// Failure budget passed to the runner for reference runs
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,
    /// Trace tag appended to reference-run output
    #[serde(default = "default_trace_tag")]
    pub trace_tag: String,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            target: default_reference_target(),
            max_failures: default_max_failures(),
            trace_tag: default_trace_tag(),
        }
    }
}

fn default_reference_target() -> String {
    "reference".to_string()
}
fn default_max_failures() -> u32 {
    5
}
fn default_trace_tag() -> String {
    "_ref".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();
        assert_eq!(config.sharding.desktop_shard_ceiling, 26);
        assert_eq!(config.reference.target, "reference");
        assert_eq!(config.reference.max_failures, 5);
        assert_eq!(config.reference.trace_tag, "_ref");
        assert!(config
            .formats
            .histogram_benchmarks
            .contains(&"blink_perf.layout".to_string()));
    }

    #[test]
    fn test_map_selection_at_ceiling() {
        let config = ShardingConfig::default();
        assert_eq!(config.select_map(26, false), MapKind::Desktop);
        assert_eq!(config.select_map(27, false), MapKind::Mobile);
        assert_eq!(config.select_map(1, false), MapKind::Desktop);
    }

    #[test]
    fn test_testing_flag_wins_over_shard_count() {
        let config = ShardingConfig::default();
        assert_eq!(config.select_map(26, true), MapKind::Testing);
        assert_eq!(config.select_map(100, true), MapKind::Testing);
    }

    #[test]
    fn test_ceiling_is_configurable() {
        let config = ShardingConfig {
            desktop_shard_ceiling: 10,
            ..ShardingConfig::default()
        };
        assert_eq!(config.select_map(10, false), MapKind::Desktop);
        assert_eq!(config.select_map(11, false), MapKind::Mobile);
    }

    #[test]
    fn test_map_paths() {
        let config = ShardingConfig::default();
        assert_eq!(
            config.map_path(MapKind::Desktop),
            PathBuf::from("shard_maps/desktop_shard_map.json")
        );
        assert_eq!(
            config.map_path(MapKind::Testing),
            PathBuf::from("shard_maps/testing_shard_map.json")
        );
    }

    #[test]
    fn test_parse_toml_overrides() {
        let toml_str = r#"
            [sharding]
            desktop_shard_ceiling = 30
            map_dir = "maps"

            [formats]
            histogram_benchmarks = ["only.this"]

            [reference]
            max_failures = 2
        "#;

        let config = HarnessConfig::from_str(toml_str).unwrap();
        assert_eq!(config.sharding.desktop_shard_ceiling, 30);
        assert_eq!(config.sharding.map_dir, PathBuf::from("maps"));
        assert_eq!(config.formats.histogram_benchmarks, vec!["only.this"]);
        assert_eq!(config.reference.max_failures, 2);
        // Untouched sections keep their defaults
        assert_eq!(config.sharding.desktop_map, "desktop_shard_map.json");
        assert_eq!(config.reference.trace_tag, "_ref");
    }

    #[test]
    fn test_empty_toml_is_all_defaults() {
        let config = HarnessConfig::from_str("").unwrap();
        assert_eq!(config.sharding.desktop_shard_ceiling, 26);
        assert_eq!(config.formats.histogram_benchmarks.len(), 14);
    }
}
