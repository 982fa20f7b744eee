//! On-disk result layout
//!
//! Every executed benchmark variant gets its own subdirectory under the
//! shared output root, holding exactly two files:
//!
//! ```text
//! <output_root>/<name[.reference]>/perf_results.json
//! <output_root>/<name[.reference]>/test_results.json
//! ```
//!
//! Subdirectory creation doubles as the duplicate-key check: a second write
//! for the same key fails instead of silently merging results.

use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::{debug, instrument};

use crate::error::HarnessError;
use crate::runner::{PerfPayload, RunnerOutput};

/// Persists one benchmark variant's results into the fixed two-file layout
pub struct ResultWriter {
    output_root: PathBuf,
}

impl ResultWriter {
    /// Create a writer rooted at the shared output directory
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    /// Write one variant's results under `output_root/<key>`.
    ///
    /// Encoded perf payloads are written byte-for-byte; structured payloads
    /// and the test results are serialized to JSON. There is no rollback:
    /// a failed second write leaves the directory partial and propagates.
    ///
    /// # Errors
    ///
    /// [`HarnessError::DirectoryCollision`] if `key` was already written
    /// this run; I/O and serialization failures otherwise.
    #[instrument(skip(self, output), fields(root = %self.output_root.display()))]
    pub fn write(&self, key: &str, output: &RunnerOutput) -> Result<(), HarnessError> {
        fs::create_dir_all(&self.output_root)?;

        let dir = self.output_root.join(key);
        fs::create_dir(&dir).map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                HarnessError::DirectoryCollision {
                    key: key.to_string(),
                }
            } else {
                HarnessError::Io(e)
            }
        })?;

        let perf_path = dir.join("perf_results.json");
        match &output.perf {
            PerfPayload::Encoded(text) => fs::write(&perf_path, text)?,
            PerfPayload::Json(value) => fs::write(&perf_path, serde_json::to_string(value)?)?,
        }

        fs::write(
            dir.join("test_results.json"),
            serde_json::to_string(&output.test_results)?,
        )?;

        debug!(key, "wrote benchmark results");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn output(perf: PerfPayload) -> RunnerOutput {
        RunnerOutput {
            return_code: 0,
            perf,
            test_results: json!({"interrupted": false}),
        }
    }

    #[test]
    fn test_two_keys_get_disjoint_directories() {
        let root = tempfile::tempdir().unwrap();
        let writer = ResultWriter::new(root.path());

        writer
            .write("speedometer2", &output(PerfPayload::Json(json!({"a": 1}))))
            .unwrap();
        writer
            .write(
                "speedometer2.reference",
                &output(PerfPayload::Json(json!({"b": 2}))),
            )
            .unwrap();

        for key in ["speedometer2", "speedometer2.reference"] {
            let dir = root.path().join(key);
            assert!(dir.join("perf_results.json").is_file());
            assert!(dir.join("test_results.json").is_file());
            let entries = fs::read_dir(&dir).unwrap().count();
            assert_eq!(entries, 2);
        }
    }

    #[test]
    fn test_duplicate_key_is_collision() {
        let root = tempfile::tempdir().unwrap();
        let writer = ResultWriter::new(root.path());
        let out = output(PerfPayload::Json(json!({})));

        writer.write("octane", &out).unwrap();
        match writer.write("octane", &out) {
            Err(HarnessError::DirectoryCollision { key }) => assert_eq!(key, "octane"),
            other => panic!("expected DirectoryCollision, got {other:?}"),
        }
    }

    #[test]
    fn test_encoded_payload_written_verbatim() {
        let root = tempfile::tempdir().unwrap();
        let writer = ResultWriter::new(root.path());

        // Deliberately odd formatting that re-serialization would destroy.
        let raw = "{\n  \"charts\": { }  \n}\n";
        writer
            .write("my_exe", &output(PerfPayload::Encoded(raw.to_string())))
            .unwrap();

        let written = fs::read_to_string(root.path().join("my_exe/perf_results.json")).unwrap();
        assert_eq!(written, raw);
    }

    #[test]
    fn test_json_payload_reserialized() {
        let root = tempfile::tempdir().unwrap();
        let writer = ResultWriter::new(root.path());

        writer
            .write(
                "blink_perf.layout",
                &output(PerfPayload::Json(json!({"charts": {"total": 42}}))),
            )
            .unwrap();

        let written =
            fs::read_to_string(root.path().join("blink_perf.layout/perf_results.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed["charts"]["total"], json!(42));
    }

    #[test]
    fn test_test_results_always_serialized() {
        let root = tempfile::tempdir().unwrap();
        let writer = ResultWriter::new(root.path());

        writer
            .write("octane", &output(PerfPayload::Encoded(String::new())))
            .unwrap();

        let written = fs::read_to_string(root.path().join("octane/test_results.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed["interrupted"], json!(false));
    }

    #[test]
    fn test_missing_root_is_created() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("out/run-1");
        let writer = ResultWriter::new(&nested);

        writer
            .write("octane", &output(PerfPayload::Json(json!({}))))
            .unwrap();
        assert!(nested.join("octane/perf_results.json").is_file());
    }
}
