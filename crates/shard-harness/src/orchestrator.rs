//! Top-level run control
//!
//! A run is either *single-executable* (one standalone perf binary, its
//! already-encoded results passed through) or a *suite* (this shard's
//! benchmark list, each entry run on the build under test and, when the
//! target supports it, once more on the reference build).
//!
//! The run's exit code is the sticky-nonzero fold of the primary variants'
//! return codes. Reference runs are recorded on disk but deliberately never
//! influence the exit code and never stop the loop.

use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::executor::{BenchmarkExecutor, ExecutionContext, Variant};
use crate::format::FormatNegotiator;
use crate::runner::Runner;
use crate::sharding::{ShardIdentity, ShardResolver};
use crate::writer::ResultWriter;

/// Inputs for one suite-mode run
#[derive(Debug, Clone, Default)]
pub struct SuiteRequest {
    /// Shard identity, usually read from the environment
    pub identity: ShardIdentity,
    /// Use the small fixed testing map instead of the full suite maps
    pub testing: bool,
    /// Explicit benchmark list overriding shard resolution
    pub explicit_benchmarks: Vec<String>,
    /// Execution settings shared by every benchmark
    pub context: ExecutionContext,
}

/// Drives a whole run and produces its exit code
pub struct Orchestrator<R: Runner> {
    runner: R,
    config: HarnessConfig,
    output_root: PathBuf,
}

impl<R: Runner> Orchestrator<R> {
    pub fn new(runner: R, config: HarnessConfig, output_root: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            config,
            output_root: output_root.into(),
        }
    }

    /// The runner collaborator this orchestrator drives
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Single-executable mode: the first trailing argument names the
    /// executable; it runs exactly once and its return code is the exit
    /// code. Its perf output is already JSON text and is written verbatim.
    #[instrument(skip(self, context))]
    pub async fn run_executable(&self, context: &ExecutionContext) -> Result<i32, HarnessError> {
        let name = context
            .passthrough
            .first()
            .ok_or(HarnessError::MissingExecutable)?
            .clone();
        info!(executable = %name, "running standalone perf executable");

        let output = match self.runner.run_executable(&context.passthrough).await {
            Ok(output) => output,
            Err(e) => {
                warn!(executable = %name, error = %e, "executable invocation failed");
                return Ok(1);
            }
        };

        let writer = ResultWriter::new(&self.output_root);
        writer.write(&name, &output)?;
        Ok(output.return_code)
    }

    /// Suite mode: resolve this shard's benchmark list and run it in
    /// declared order, primary variant always, reference variant when the
    /// context allows it.
    #[instrument(skip(self, request))]
    pub async fn run_suite(&self, request: &SuiteRequest) -> Result<i32, HarnessError> {
        let resolver = ShardResolver::new(self.config.sharding.clone());
        let benchmarks = resolver.resolve(
            &request.identity,
            request.testing,
            &request.explicit_benchmarks,
        )?;

        let executor = BenchmarkExecutor::new(
            &self.runner,
            FormatNegotiator::new(self.config.formats.clone()),
            self.config.reference.clone(),
            ResultWriter::new(&self.output_root),
        );

        let mut aggregate = 0;
        for benchmark in &benchmarks {
            let rc = executor
                .execute(benchmark, Variant::Primary, &request.context)
                .await?;
            if rc != 0 {
                warn!(benchmark, rc, "primary run failed");
                aggregate = rc;
            }

            if request.context.run_reference {
                // Recorded for comparison only; the code never aggregates.
                let rc = executor
                    .execute(benchmark, Variant::Reference, &request.context)
                    .await?;
                if rc != 0 {
                    debug!(benchmark, rc, "reference run returned nonzero (ignored)");
                }
            }
        }

        info!(
            count = benchmarks.len(),
            aggregate, "suite run complete"
        );
        Ok(aggregate)
    }
}
