//! Typed access to a run's evidence streams.
//!
//! Reads tolerate partial damage: a missing stream is an empty stream, and
//! a line that fails to decode is logged and skipped.

use super::models::{
    ApiRecord, ChurnRecord, CoverageRecord, EvidenceCategory, FindingRecord, Manifest,
    RecommendationRecord, RiskRecord, TestRecord,
};
use super::run_manager::{RunHandle, RunManager};
use crate::errors::{Error, IoResultExt, Result};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;
use tracing::{debug, warn};

/// Legacy stream name some collectors use for findings.
const FINDINGS_STREAM: &str = "findings";

#[derive(Debug, Clone)]
pub struct EvidenceReader {
    handle: RunHandle,
}

impl EvidenceReader {
    pub fn new(handle: &RunHandle) -> Self {
        Self {
            handle: handle.clone(),
        }
    }

    /// Open a run from its directory. Relative paths resolve against `runs_root`.
    pub fn from_run_path(run_dir: impl AsRef<Path>, runs_root: impl AsRef<Path>) -> Result<Self> {
        let handle = RunManager::existing(runs_root.as_ref()).load_run(run_dir)?;
        Ok(Self { handle })
    }

    pub fn handle(&self) -> &RunHandle {
        &self.handle
    }

    pub fn read_manifest(&self) -> Result<Manifest> {
        self.handle.read_manifest()
    }

    pub fn read_findings(&self) -> Result<Vec<FindingRecord>> {
        let mut findings = self.read_category(EvidenceCategory::Quality)?;
        findings.extend(self.read_category::<FindingRecord>(FINDINGS_STREAM)?);
        Ok(findings)
    }

    pub fn read_coverage(&self) -> Result<Vec<CoverageRecord>> {
        self.read_category(EvidenceCategory::Coverage)
    }

    pub fn read_churn(&self) -> Result<Vec<ChurnRecord>> {
        self.read_category(EvidenceCategory::Churn)
    }

    pub fn read_risks(&self) -> Result<Vec<RiskRecord>> {
        self.read_category(EvidenceCategory::Risks)
    }

    pub fn read_recommendations(&self) -> Result<Vec<RecommendationRecord>> {
        self.read_category(EvidenceCategory::Recommendations)
    }

    pub fn read_tests(&self) -> Result<Vec<TestRecord>> {
        self.read_category(EvidenceCategory::Tests)
    }

    pub fn read_apis(&self) -> Result<Vec<ApiRecord>> {
        self.read_category(EvidenceCategory::Apis)
    }

    /// Decode every valid line of a category's stream, in append order.
    pub fn read_category<T: DeserializeOwned>(&self, category: impl AsRef<str>) -> Result<Vec<T>> {
        read_jsonl(&self.handle.stream_path(category.as_ref()))
    }
}

fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "Evidence stream absent; treating as empty");
            return Ok(Vec::new());
        }
        Err(e) => return Err(Error::file_system("Failed to open evidence stream", path, e)),
    };

    let mut reader = BufReader::new(file);
    let mut records = Vec::new();
    let mut skipped = 0usize;
    let mut buf = Vec::new();
    let mut index = 0usize;
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .with_path("Failed to read evidence stream", path)?;
        if read == 0 {
            break;
        }
        index += 1;
        let line = buf.trim_ascii();
        if line.is_empty() {
            continue;
        }
        // Invalid UTF-8 surfaces here as a decode error, not an I/O error
        match serde_json::from_slice::<T>(line) {
            Ok(record) => records.push(record),
            Err(e) => {
                skipped += 1;
                warn!(
                    path = %path.display(),
                    line = index,
                    error = %e,
                    "Skipping malformed evidence record"
                );
            }
        }
    }
    if skipped > 0 {
        debug!(path = %path.display(), skipped, kept = records.len(), "Partial evidence read");
    }
    Ok(records)
}
