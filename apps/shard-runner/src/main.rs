//! Shard-runner binary
//!
//! Entry point invoked by the calling test harness. Parses the command
//! line, assembles the execution context, and hands control to the
//! orchestrator; the process exit code is the run's aggregate return code.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use shard_harness::executor::ExecutionContext;
use shard_harness::sharding::ShardIdentity;
use shard_harness::{HarnessConfig, Orchestrator, ProcessRunner, SuiteRequest};

/// Browser targets containing this marker have no reference build; the
/// capability can still be forced off with --no-reference.
const NO_REFERENCE_TARGET_MARKER: &str = "webview";

#[derive(Parser, Debug)]
#[command(name = "shard-runner")]
#[command(
    version,
    about = "Runs this shard's slice of the performance benchmark suite"
)]
struct Args {
    /// File the calling harness reads test results from; its parent
    /// directory becomes the per-benchmark output root
    #[arg(long = "test-output")]
    test_output: PathBuf,

    /// Test name filter, forwarded verbatim to the runner
    #[arg(long = "test-filter")]
    test_filter: Option<String>,

    /// Accepted for recipe compatibility; not forwarded to the runner
    #[arg(long = "chartjson-output", hide = true)]
    _chartjson_output: Option<PathBuf>,

    /// Accepted for recipe compatibility; not forwarded to the runner
    #[arg(long = "perf-output", hide = true)]
    _perf_output: Option<PathBuf>,

    /// Treat the first trailing argument as a standalone perf executable
    /// instead of running the benchmark suite
    #[arg(long)]
    executable: bool,

    /// Comma-separated benchmark names to run in lieu of this shard's
    /// slice of the shard map
    #[arg(long, value_delimiter = ',')]
    benchmarks: Vec<String>,

    /// Explicit output-format selector; may be given more than once
    #[arg(long = "output-format")]
    output_format: Vec<String>,

    /// Test run: use the small fixed shard map
    #[arg(long)]
    testing: bool,

    /// Browser/target under test
    #[arg(long)]
    browser: Option<String>,

    /// Skip reference-build runs even when the target supports them
    #[arg(long)]
    no_reference: bool,

    /// External benchmark runner to invoke per benchmark
    #[arg(long, default_value = "run_benchmark")]
    runner: PathBuf,

    /// Optional harness.toml overriding built-in policy defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Arguments forwarded verbatim to the runner
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    rest: Vec<String>,
}

impl Args {
    fn execution_context(&self) -> ExecutionContext {
        let mut passthrough = self.rest.clone();
        if let Some(filter) = &self.test_filter {
            passthrough.push(format!("--test-filter={filter}"));
        }

        let run_reference = !self.no_reference
            && self
                .browser
                .as_deref()
                .is_some_and(|b| !b.contains(NO_REFERENCE_TARGET_MARKER));

        ExecutionContext {
            target: self.browser.clone(),
            run_reference,
            format_overrides: self.output_format.clone(),
            passthrough,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Benchmark payloads own stdout; logs go to stderr.
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    tracing::info!("Starting shard-runner v{}", env!("CARGO_PKG_VERSION"));

    let output_root = args
        .test_output
        .parent()
        .context("--test-output path has no parent directory")?
        .to_path_buf();

    let config = match &args.config {
        Some(path) => HarnessConfig::from_file(path)?,
        None => HarnessConfig::default(),
    };

    let context = args.execution_context();
    let orchestrator = Orchestrator::new(ProcessRunner::new(&args.runner), config, output_root);

    let exit_code = if args.executable {
        orchestrator.run_executable(&context).await?
    } else {
        let request = SuiteRequest {
            identity: ShardIdentity::from_env(),
            testing: args.testing,
            explicit_benchmarks: args.benchmarks.clone(),
            context,
        };
        orchestrator.run_suite(&request).await?
    };

    std::process::exit(exit_code);
}
