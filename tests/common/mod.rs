// Shared fixtures for riskledger integration tests
#![allow(dead_code)]

use riskledger::{
    ChurnRecord, CoverageRecord, EvidenceIdGenerator, EvidenceWriter, FindingRecord, RunHandle,
    RunManager,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tempfile::TempDir;

/// A runs root in a temp dir with one freshly created run.
pub struct TestRun {
    pub tmp: TempDir,
    pub manager: RunManager,
    pub handle: RunHandle,
    pub writer: EvidenceWriter,
    pub ids: EvidenceIdGenerator,
}

impl TestRun {
    pub fn new() -> Self {
        Self::with_git(None)
    }

    pub fn with_git(git: Option<BTreeMap<String, String>>) -> Self {
        riskledger::observability::init_test_tracing();
        let tmp = TempDir::new().expect("Failed to create temp dir");
        let manager = RunManager::new(tmp.path().join("runs")).expect("Failed to create runs root");
        let target = tmp.path().join("target-repo");
        let handle = manager
            .create_run("target-repo", &target, git)
            .expect("Failed to create run");
        let writer = EvidenceWriter::new(&handle);
        let ids = EvidenceIdGenerator::new(handle.run_id.clone()).expect("Run id is valid");
        Self {
            tmp,
            manager,
            handle,
            writer,
            ids,
        }
    }

    pub fn runs_root(&self) -> PathBuf {
        self.manager.base_dir().to_path_buf()
    }

    pub fn finding(&mut self, tool: &str, severity: &str, file: &str) -> FindingRecord {
        let id = self.ids.next_id("FND").expect("Valid prefix");
        FindingRecord::new(id, tool, severity, format!("{tool} {severity}"))
            .with_location(file, 1, 1)
    }

    pub fn coverage(&mut self, component: &str, value: f64) -> CoverageRecord {
        let id = self.ids.next_id("COV").expect("Valid prefix");
        CoverageRecord::new(id, "line", component, value)
    }

    pub fn churn(&mut self, path: &str, commits: u64) -> ChurnRecord {
        let id = self.ids.next_id("CHN").expect("Valid prefix");
        ChurnRecord::new(id, path, "90d").with_activity(commits, commits * 10, commits * 2, 1)
    }
}
