//! Per-benchmark invocation building and execution
//!
//! The executor turns a benchmark name into a full runner invocation,
//! optionally as the reference-build variant, drives the runner, and hands
//! the results to the writer. The browser target is a typed field on the
//! [`ExecutionContext`] rather than an argument scanned out of the
//! pass-through list, so a reference run without a configured target fails
//! with a clear error instead of mutating some unrelated argument.

use tracing::{debug, error, instrument};

use crate::config::ReferenceConfig;
use crate::error::HarnessError;
use crate::format::FormatNegotiator;
use crate::runner::Runner;
use crate::writer::ResultWriter;

/// Suffix appended to a benchmark's output key for its reference run
pub const REFERENCE_SUFFIX: &str = ".reference";

/// Which build of the target a benchmark runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// The build under test; its return code feeds the aggregate
    Primary,
    /// The baseline build; recorded for comparison, return code ignored
    Reference,
}

/// Caller-supplied execution settings shared by every benchmark in a run
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// Browser/target under test, emitted as `--browser=<target>`
    pub target: Option<String>,
    /// Whether the target supports an additional reference-build run
    pub run_reference: bool,
    /// Explicit output-format overrides, applied to every benchmark
    pub format_overrides: Vec<String>,
    /// Arguments forwarded verbatim to the runner
    pub passthrough: Vec<String>,
}

/// Executes one benchmark variant end to end
pub struct BenchmarkExecutor<'a, R: Runner> {
    runner: &'a R,
    negotiator: FormatNegotiator,
    reference: ReferenceConfig,
    writer: ResultWriter,
}

impl<'a, R: Runner> BenchmarkExecutor<'a, R> {
    pub fn new(
        runner: &'a R,
        negotiator: FormatNegotiator,
        reference: ReferenceConfig,
        writer: ResultWriter,
    ) -> Self {
        Self {
            runner,
            negotiator,
            reference,
            writer,
        }
    }

    /// Execute one benchmark variant and persist its results.
    ///
    /// The invocation starts with the benchmark name, then the variant's
    /// target flags, then the pass-through arguments, then the negotiated
    /// output-format flag. Reference runs substitute the reference target,
    /// add a failure budget and a trace tag, and write under the
    /// `.reference`-suffixed key.
    ///
    /// The runner's return code is returned unmodified; a runner transport
    /// failure (the process could not even be driven) is logged and folded
    /// into a nonzero code so the suite loop can continue.
    #[instrument(skip(self, context))]
    pub async fn execute(
        &self,
        benchmark: &str,
        variant: Variant,
        context: &ExecutionContext,
    ) -> Result<i32, HarnessError> {
        let mut args = Vec::with_capacity(context.passthrough.len() + 4);
        args.push(benchmark.to_string());

        let key = match variant {
            Variant::Primary => {
                if let Some(target) = &context.target {
                    args.push(format!("--browser={target}"));
                }
                benchmark.to_string()
            }
            Variant::Reference => {
                if context.target.is_none() {
                    return Err(HarnessError::MissingTargetSelector);
                }
                args.push(format!("--browser={}", self.reference.target));
                args.push(format!("--max-failures={}", self.reference.max_failures));
                args.push(format!("--output-trace-tag={}", self.reference.trace_tag));
                format!("{benchmark}{REFERENCE_SUFFIX}")
            }
        };

        args.extend(context.passthrough.iter().cloned());
        // The whitelist is keyed on the bare benchmark name for both variants.
        let histograms = self
            .negotiator
            .negotiate(benchmark, &context.format_overrides, &mut args);

        debug!(key, ?args, "invoking runner");
        let output = match self.runner.run_benchmark(&args, histograms).await {
            Ok(output) => output,
            Err(e) => {
                error!(benchmark, error = %e, "runner invocation failed");
                return Ok(1);
            }
        };

        self.writer.write(&key, &output)?;
        Ok(output.return_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormatConfig;
    use crate::runner::{PerfPayload, RunnerOutput};
    use anyhow::Result;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records every invocation and replays scripted return codes.
    struct MockRunner {
        calls: Mutex<Vec<(Vec<String>, bool)>>,
        return_code: i32,
        fail_transport: bool,
    }

    impl MockRunner {
        fn returning(return_code: i32) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                return_code,
                fail_transport: false,
            }
        }

        fn broken() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                return_code: 0,
                fail_transport: true,
            }
        }

        fn calls(&self) -> Vec<(Vec<String>, bool)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Runner for MockRunner {
        async fn run_benchmark(&self, args: &[String], histograms: bool) -> Result<RunnerOutput> {
            if self.fail_transport {
                anyhow::bail!("spawn failed");
            }
            self.calls
                .lock()
                .unwrap()
                .push((args.to_vec(), histograms));
            Ok(RunnerOutput {
                return_code: self.return_code,
                perf: PerfPayload::Json(json!({"charts": {}})),
                test_results: json!({"interrupted": false}),
            })
        }

        async fn run_executable(&self, _args: &[String]) -> Result<RunnerOutput> {
            unreachable!("executor never runs standalone executables")
        }
    }

    fn executor<'a>(runner: &'a MockRunner, root: &std::path::Path) -> BenchmarkExecutor<'a, MockRunner> {
        BenchmarkExecutor::new(
            runner,
            FormatNegotiator::new(FormatConfig::default()),
            ReferenceConfig::default(),
            ResultWriter::new(root),
        )
    }

    fn context() -> ExecutionContext {
        ExecutionContext {
            target: Some("release".to_string()),
            run_reference: true,
            format_overrides: Vec::new(),
            passthrough: vec!["--pageset-repeat=1".to_string()],
        }
    }

    #[tokio::test]
    async fn test_primary_invocation_shape() {
        let runner = MockRunner::returning(0);
        let root = tempfile::tempdir().unwrap();
        let exec = executor(&runner, root.path());

        let rc = exec
            .execute("speedometer2", Variant::Primary, &context())
            .await
            .unwrap();

        assert_eq!(rc, 0);
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].0,
            vec![
                "speedometer2",
                "--browser=release",
                "--pageset-repeat=1",
                "--output-format=chartjson",
            ]
        );
        assert!(root.path().join("speedometer2/perf_results.json").is_file());
    }

    #[tokio::test]
    async fn test_reference_rewrites_target_and_key() {
        let runner = MockRunner::returning(0);
        let root = tempfile::tempdir().unwrap();
        let exec = executor(&runner, root.path());

        exec.execute("speedometer2", Variant::Reference, &context())
            .await
            .unwrap();

        let (args, _) = &runner.calls()[0];
        assert_eq!(
            args,
            &vec![
                "speedometer2".to_string(),
                "--browser=reference".to_string(),
                "--max-failures=5".to_string(),
                "--output-trace-tag=_ref".to_string(),
                "--pageset-repeat=1".to_string(),
                "--output-format=chartjson".to_string(),
            ]
        );
        assert!(root
            .path()
            .join("speedometer2.reference/perf_results.json")
            .is_file());
        assert!(!root.path().join("speedometer2").exists());
    }

    #[tokio::test]
    async fn test_reference_without_target_fails_loudly() {
        let runner = MockRunner::returning(0);
        let root = tempfile::tempdir().unwrap();
        let exec = executor(&runner, root.path());

        let ctx = ExecutionContext {
            target: None,
            ..context()
        };
        assert!(matches!(
            exec.execute("octane", Variant::Reference, &ctx).await,
            Err(HarnessError::MissingTargetSelector)
        ));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_histogram_whitelist_reaches_runner() {
        let runner = MockRunner::returning(0);
        let root = tempfile::tempdir().unwrap();
        let exec = executor(&runner, root.path());

        exec.execute("blink_perf.layout", Variant::Primary, &context())
            .await
            .unwrap();

        let (args, histograms) = &runner.calls()[0];
        assert!(histograms);
        assert!(args.contains(&"--output-format=histograms".to_string()));
    }

    #[tokio::test]
    async fn test_nonzero_code_passed_through() {
        let runner = MockRunner::returning(3);
        let root = tempfile::tempdir().unwrap();
        let exec = executor(&runner, root.path());

        let rc = exec
            .execute("octane", Variant::Primary, &context())
            .await
            .unwrap();
        assert_eq!(rc, 3);
        // Results are still written for failing benchmarks.
        assert!(root.path().join("octane/test_results.json").is_file());
    }

    #[tokio::test]
    async fn test_transport_failure_becomes_nonzero_code() {
        let runner = MockRunner::broken();
        let root = tempfile::tempdir().unwrap();
        let exec = executor(&runner, root.path());

        let rc = exec
            .execute("octane", Variant::Primary, &context())
            .await
            .unwrap();
        assert_eq!(rc, 1);
        // Nothing to persist when the runner never produced output.
        assert!(!root.path().join("octane").exists());
    }
}
