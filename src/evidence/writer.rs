//! Append-only persistence of evidence streams.

use super::models::{counter_key, validate_category, EvidenceRecord};
use super::run_manager::RunHandle;
use crate::errors::{IoResultExt, Result};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Appends JSON lines to one file; never truncates.
#[derive(Debug, Clone)]
pub struct JsonlWriter {
    path: PathBuf,
}

impl JsonlWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize every record first, then append the whole batch and flush
    /// it to disk, so a record that fails to serialize writes nothing.
    pub fn append<T: Serialize>(&self, records: &[T]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let mut buffer = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buffer, record)?;
            buffer.push(b'\n');
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_path("Failed to create evidence dir", parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_path("Failed to open evidence stream", &self.path)?;
        file.write_all(&buffer)
            .with_path("Failed to append evidence", &self.path)?;
        file.sync_data()
            .with_path("Failed to sync evidence stream", &self.path)?;
        Ok(records.len())
    }
}

/// Writes evidence streams for one run and keeps manifest counters in step.
///
/// Each call appends and syncs the stream before the manifest is rewritten,
/// so the manifest can trail the streams after a crash but never run ahead.
#[derive(Debug, Clone)]
pub struct EvidenceWriter {
    handle: RunHandle,
}

impl EvidenceWriter {
    pub fn new(handle: &RunHandle) -> Self {
        Self {
            handle: handle.clone(),
        }
    }

    pub fn handle(&self) -> &RunHandle {
        &self.handle
    }

    /// Append `records` to the stream for `category`; returns how many were written.
    pub fn write_records<T: Serialize>(
        &self,
        category: impl AsRef<str>,
        records: &[T],
    ) -> Result<usize> {
        let category = category.as_ref();
        validate_category(category)?;
        if records.is_empty() {
            return Ok(0);
        }

        let path = self.handle.stream_path(category);
        let count = JsonlWriter::new(&path).append(records)?;

        let relative = path
            .strip_prefix(&self.handle.run_dir)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");
        self.handle.update_manifest(|manifest| {
            manifest.register_file(category, relative);
            if let Some(key) = counter_key(category) {
                manifest.increment_count(key, count as u64);
            }
        })?;

        debug!(
            run_id = %self.handle.run_id,
            category,
            count,
            path = %path.display(),
            "Wrote evidence records"
        );
        Ok(count)
    }

    pub fn write_record<T: Serialize>(
        &self,
        category: impl AsRef<str>,
        record: &T,
    ) -> Result<usize> {
        self.write_records(category, std::slice::from_ref(record))
    }

    /// Write mixed records, batching consecutive runs of the same category.
    pub fn write_evidence(&self, records: &[EvidenceRecord]) -> Result<usize> {
        let mut written = 0;
        for batch in records.chunk_by(|a, b| a.category() == b.category()) {
            written += self.write_records(batch[0].category(), batch)?;
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::models::{counts, ChurnRecord, CoverageRecord};
    use crate::evidence::run_manager::RunManager;
    use crate::errors::Error;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn setup() -> (TempDir, RunHandle) {
        let tmp = TempDir::new().unwrap();
        let manager = RunManager::new(tmp.path().join("runs")).unwrap();
        let handle = manager.create_run("repo", tmp.path(), None).unwrap();
        (tmp, handle)
    }

    fn lines(path: &Path) -> Vec<serde_json::Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn appends_in_order_across_calls_and_counts() {
        let (_tmp, handle) = setup();
        let writer = EvidenceWriter::new(&handle);

        assert_eq!(
            writer
                .write_records("quality", &[json!({"n": 1}), json!({"n": 2})])
                .unwrap(),
            2
        );
        assert_eq!(writer.write_record("quality", &json!({"n": 3})).unwrap(), 1);

        let values: Vec<i64> = lines(&handle.stream_path("quality"))
            .iter()
            .map(|v| v["n"].as_i64().unwrap())
            .collect();
        assert_eq!(values, vec![1, 2, 3]);

        let manifest = handle.read_manifest().unwrap();
        assert_eq!(manifest.count(counts::FINDINGS), 3);
        assert_eq!(manifest.evidence_files["quality"], "evidence/quality.jsonl");
    }

    #[test]
    fn empty_batch_leaves_manifest_untouched() {
        let (_tmp, handle) = setup();
        let before = fs::read_to_string(handle.manifest_path()).unwrap();
        let writer = EvidenceWriter::new(&handle);
        let empty: Vec<serde_json::Value> = Vec::new();

        assert_eq!(writer.write_records("risks", &empty).unwrap(), 0);
        assert_eq!(fs::read_to_string(handle.manifest_path()).unwrap(), before);
        assert!(!handle.stream_path("risks").exists());
    }

    #[test]
    fn untracked_categories_persist_without_counts() {
        let (_tmp, handle) = setup();
        let writer = EvidenceWriter::new(&handle);
        writer
            .write_record("apis", &json!({"api_id": "API-1", "method": "GET", "path": "/"}))
            .unwrap();

        let manifest = handle.read_manifest().unwrap();
        assert_eq!(lines(&handle.stream_path("apis")).len(), 1);
        assert!(!manifest.counts.contains_key("apis"));
        assert!(manifest.counts.values().all(|&c| c == 0));
        assert!(manifest.evidence_files.contains_key("apis"));
    }

    #[test]
    fn rejects_unsafe_category_names() {
        let (_tmp, handle) = setup();
        let writer = EvidenceWriter::new(&handle);
        let err = writer
            .write_record("../escape", &json!({}))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCategory(_)));
    }

    #[test]
    fn mixed_evidence_is_routed_by_category() {
        let (_tmp, handle) = setup();
        let writer = EvidenceWriter::new(&handle);
        let records = vec![
            EvidenceRecord::Coverage(CoverageRecord::new("COV-1", "line", "a.py", 0.5)),
            EvidenceRecord::Coverage(CoverageRecord::new("COV-2", "line", "b.py", 0.7)),
            EvidenceRecord::Churn(ChurnRecord::new("CHN-1", "a.py", "90d")),
        ];
        assert_eq!(writer.write_evidence(&records).unwrap(), 3);

        let manifest = handle.read_manifest().unwrap();
        assert_eq!(manifest.count(counts::COVERAGE_COMPONENTS), 2);
        assert_eq!(manifest.count(counts::CHURN), 1);
    }
}
