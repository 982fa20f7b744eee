//! Output-format negotiation
//!
//! The runner can emit either of two raw result encodings, selected by an
//! `--output-format` flag on the invocation. Until the whole suite emits a
//! single encoding, the format has to be decided per benchmark: caller
//! overrides win, otherwise a whitelist of histogram-emitting benchmarks
//! decides, and everything else falls back to chartjson.

use tracing::debug;

use crate::config::FormatConfig;

/// Raw result encoding the runner is asked to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Legacy chart format
    Chartjson,
    /// Histogram-set format
    Histograms,
}

impl OutputFormat {
    fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Chartjson => "chartjson",
            OutputFormat::Histograms => "histograms",
        }
    }
}

/// Decides which output format a benchmark invocation requests
pub struct FormatNegotiator {
    config: FormatConfig,
}

impl FormatNegotiator {
    /// Create a negotiator with the given whitelist policy
    pub fn new(config: FormatConfig) -> Self {
        Self { config }
    }

    /// Append the output-format flag(s) for one benchmark invocation.
    ///
    /// Caller-supplied `overrides` are each appended as their own
    /// `--output-format=` flag and short-circuit the whitelist. With no
    /// overrides, exactly one flag is appended: histograms for whitelist
    /// members, chartjson otherwise. Existing arguments are never removed
    /// or reordered.
    ///
    /// Returns whether histogram-specific downstream handling applies; this
    /// boolean is what callers act on, not the flag text.
    pub fn negotiate(
        &self,
        benchmark: &str,
        overrides: &[String],
        args: &mut Vec<String>,
    ) -> bool {
        let mut format_specified = false;
        let mut histograms = false;

        for format in overrides {
            if format.contains("histograms") {
                format_specified = true;
                histograms = true;
            }
            if format.contains("chartjson") {
                format_specified = true;
            }
            args.push(format!("--output-format={format}"));
        }

        if !format_specified {
            let format = if self
                .config
                .histogram_benchmarks
                .iter()
                .any(|b| b == benchmark)
            {
                OutputFormat::Histograms
            } else {
                OutputFormat::Chartjson
            };
            histograms = format == OutputFormat::Histograms;
            args.push(format!("--output-format={}", format.as_str()));
        }

        debug!(benchmark, histograms, "negotiated output format");
        histograms
    }
}
