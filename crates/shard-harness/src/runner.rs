//! Seam to the external benchmark runner
//!
//! The harness never measures anything itself; it drives an external runner
//! process and treats whatever that process produces as opaque. The
//! [`Runner`] trait is the seam: production code uses [`ProcessRunner`],
//! tests substitute scripted mocks.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Raw performance payload handed back by the runner.
///
/// The harness never looks inside either variant; the distinction only
/// controls how the payload reaches disk.
#[derive(Debug, Clone, PartialEq)]
pub enum PerfPayload {
    /// Already-serialized JSON text, copied to disk byte-for-byte
    Encoded(String),
    /// Structured payload, serialized at write time
    Json(serde_json::Value),
}

/// Everything one runner invocation produces
#[derive(Debug, Clone)]
pub struct RunnerOutput {
    /// The runner process's raw return code, unmodified
    pub return_code: i32,
    /// Raw performance results (chartjson, histogram, or legacy; opaque)
    pub perf: PerfPayload,
    /// Standardized test-results payload
    pub test_results: serde_json::Value,
}

/// External runner collaborator contract.
///
/// Given a fully formed invocation, a runner yields a return code plus the
/// two result payloads. Implementations must not interpret non-zero codes.
#[async_trait]
pub trait Runner: Send + Sync {
    /// Run one suite benchmark invocation. `histograms` tells the runner
    /// which result encoding the invocation was negotiated to produce.
    async fn run_benchmark(&self, args: &[String], histograms: bool) -> Result<RunnerOutput>;

    /// Run a standalone perf executable. Its perf output arrives as
    /// already-encoded JSON text and is passed through verbatim.
    async fn run_executable(&self, args: &[String]) -> Result<RunnerOutput>;
}

/// Runs the external runner as a child process.
///
/// Hand-off happens through two scratch files the runner is told to write:
/// `--perf-output=<path>` for the raw performance results and
/// `--test-results-output=<path>` for the standardized test results. The
/// scratch directory lives only for the duration of one invocation.
pub struct ProcessRunner {
    program: PathBuf,
}

impl ProcessRunner {
    /// Create a runner wrapping the given program
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    #[instrument(skip(self, args), fields(program = %self.program.display()))]
    async fn invoke(&self, args: &[String]) -> Result<(i32, String, serde_json::Value)> {
        let scratch = tempfile::tempdir().context("Failed to create runner scratch directory")?;
        let perf_path = scratch.path().join("perf_results.json");
        let results_path = scratch.path().join("test_results.json");

        let status = Command::new(&self.program)
            .args(args)
            .arg(format!("--perf-output={}", perf_path.display()))
            .arg(format!("--test-results-output={}", results_path.display()))
            .status()
            .await
            .with_context(|| format!("Failed to launch runner {}", self.program.display()))?;

        // Killed-by-signal has no code; surface it as a plain failure.
        let return_code = status.code().unwrap_or(1);
        debug!(return_code, "runner process exited");

        let perf = read_payload_text(&perf_path);
        let test_results = read_payload_json(&results_path);
        Ok((return_code, perf, test_results))
    }
}

/// Read a hand-off file the runner may or may not have produced. A failed
/// run often leaves nothing behind; that is reflected in its return code,
/// so an absent payload is only worth a warning.
fn read_payload_text(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "runner left no payload behind");
            String::new()
        }
    }
}

fn read_payload_json(path: &Path) -> serde_json::Value {
    let text = read_payload_text(path);
    match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(e) => {
            if !text.is_empty() {
                warn!(path = %path.display(), error = %e, "runner payload is not valid JSON");
            }
            serde_json::Value::Object(serde_json::Map::new())
        }
    }
}

#[async_trait]
impl Runner for ProcessRunner {
    async fn run_benchmark(&self, args: &[String], histograms: bool) -> Result<RunnerOutput> {
        debug!(histograms, "running suite benchmark");
        let (return_code, perf_text, test_results) = self.invoke(args).await?;
        // Suite results are re-serialized at write time, so parse the raw
        // text into an opaque value here. Unparsable output degrades to an
        // empty object; the return code already tells the story.
        let perf = match serde_json::from_str(&perf_text) {
            Ok(value) => PerfPayload::Json(value),
            Err(_) => PerfPayload::Json(serde_json::Value::Object(serde_json::Map::new())),
        };
        Ok(RunnerOutput {
            return_code,
            perf,
            test_results,
        })
    }

    async fn run_executable(&self, args: &[String]) -> Result<RunnerOutput> {
        let (return_code, perf_text, test_results) = self.invoke(args).await?;
        Ok(RunnerOutput {
            return_code,
            perf: PerfPayload::Encoded(perf_text),
            test_results,
        })
    }
}
