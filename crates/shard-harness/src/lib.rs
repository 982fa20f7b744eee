//! Sharded benchmark-suite harness
//!
//! This crate orchestrates one shard's slice of a larger performance
//! benchmark suite. It resolves which benchmarks the shard owns, drives an
//! external benchmark runner once per benchmark (plus an optional
//! reference-build run), normalizes the heterogeneous raw output into a
//! fixed two-file-per-benchmark layout, and folds the runner return codes
//! into the single exit code the calling harness consumes.
//!
//! # Example
//!
//! ```no_run
//! use shard_harness::{
//!     executor::ExecutionContext, HarnessConfig, Orchestrator, ProcessRunner, SuiteRequest,
//! };
//! use shard_harness::sharding::ShardIdentity;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let orchestrator = Orchestrator::new(
//!     ProcessRunner::new("run_benchmark"),
//!     HarnessConfig::default(),
//!     "out",
//! );
//!
//! let request = SuiteRequest {
//!     identity: ShardIdentity::from_env(),
//!     context: ExecutionContext {
//!         target: Some("release".to_string()),
//!         run_reference: true,
//!         ..ExecutionContext::default()
//!     },
//!     ..SuiteRequest::default()
//! };
//!
//! let exit_code = orchestrator.run_suite(&request).await?;
//! std::process::exit(exit_code);
//! # }
//! ```
//!
//! The harness never interprets benchmark results; pass/fail against
//! performance thresholds, shard provisioning, and retries all live
//! elsewhere.

pub mod config;
pub mod error;
pub mod executor;
pub mod format;
pub mod orchestrator;
pub mod runner;
pub mod sharding;
pub mod writer;

// Re-export main types for convenience
pub use config::HarnessConfig;
pub use error::HarnessError;
pub use orchestrator::{Orchestrator, SuiteRequest};
pub use runner::{PerfPayload, ProcessRunner, Runner, RunnerOutput};
