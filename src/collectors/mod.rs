//! Seam for external collectors and the sequential orchestrator that drives them.
//!
//! Collectors wrap third-party tools and live outside this crate. The
//! orchestrator runs them one at a time against a single run, records each
//! tool's status in the manifest, and keeps a JSON-lines event log per run
//! next to (not inside) the evidence store.

use crate::errors::Result;
use crate::evidence::{
    utc_now, EvidenceIdGenerator, EvidenceWriter, JsonlWriter, RunHandle, RunManager, ToolStatus,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, info_span, warn};

/// A source of evidence for one run.
///
/// Implementations write their records through `writer`, minting ids with
/// `ids`, and report what happened. Returning `Err` marks the tool as failed
/// without stopping the remaining collectors.
pub trait Collector {
    fn name(&self) -> &str;

    fn run(
        &self,
        handle: &RunHandle,
        writer: &EvidenceWriter,
        ids: &mut EvidenceIdGenerator,
    ) -> anyhow::Result<CollectorResult>;
}

/// Outcome reported by a collector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectorResult {
    pub tool_name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub exit_code: Option<i32>,
    pub executed: bool,
    #[serde(default)]
    pub findings: usize,
    #[serde(default)]
    pub diagnostics: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub started_at: String,
    #[serde(default)]
    pub finished_at: String,
}

impl CollectorResult {
    pub fn executed(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            executed: true,
            started_at: utc_now(),
            ..Self::default()
        }
    }

    /// Tool was not run, e.g. because it is not installed.
    pub fn skipped(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            diagnostics: vec![reason.into()],
            started_at: utc_now(),
            ..Self::default()
        }
    }

    pub fn failed(tool_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            errors: vec![error.into()],
            started_at: utc_now(),
            ..Self::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    pub fn with_findings(mut self, findings: usize) -> Self {
        self.findings = findings;
        self
    }

    pub fn with_diagnostic(mut self, message: impl Into<String>) -> Self {
        self.diagnostics.push(message.into());
        self
    }

    pub fn succeeded(&self) -> bool {
        self.executed && self.errors.is_empty()
    }

    /// Manifest entry for this tool; multiple errors are joined with `; `.
    pub fn to_tool_status(&self) -> ToolStatus {
        ToolStatus {
            version: self.version.clone(),
            executed: self.executed,
            exit_code: self.exit_code,
            error: (!self.errors.is_empty()).then(|| self.errors.join("; ")),
        }
    }
}

#[derive(Debug, Serialize)]
struct CollectorEvent<'a> {
    event: &'a str,
    collector: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    executed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    findings: Option<usize>,
    errors: &'a [String],
    diagnostics: &'a [String],
    timestamp: String,
}

/// Runs collectors in registration order against one run.
pub struct CollectorOrchestrator {
    collectors: Vec<Box<dyn Collector>>,
    log_dir: PathBuf,
}

impl CollectorOrchestrator {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            collectors: Vec::new(),
            log_dir: log_dir.into(),
        }
    }

    /// Orchestrator logging to the `logs/` directory beside the manager's runs root.
    pub fn for_manager(manager: &RunManager) -> Self {
        Self::new(default_log_dir(manager.base_dir()))
    }

    pub fn with_collector(mut self, collector: impl Collector + 'static) -> Self {
        self.register(Box::new(collector));
        self
    }

    pub fn register(&mut self, collector: Box<dyn Collector>) {
        self.collectors.push(collector);
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    pub fn log_path(&self, run_id: &str) -> PathBuf {
        self.log_dir.join(format!("{run_id}.jsonl"))
    }

    /// Invoke every collector in turn.
    ///
    /// Collector failures are recorded, not returned; only failures to write
    /// the event log or manifest abort the sequence.
    pub fn run_all(
        &self,
        handle: &RunHandle,
        writer: &EvidenceWriter,
        ids: &mut EvidenceIdGenerator,
    ) -> Result<Vec<CollectorResult>> {
        let log = JsonlWriter::new(self.log_path(&handle.run_id));
        let mut results = Vec::with_capacity(self.collectors.len());

        for collector in &self.collectors {
            let name = collector.name();
            let _span = info_span!("collector.run", run_id = %handle.run_id, collector = name)
                .entered();
            log.append(&[CollectorEvent {
                event: "collector.start",
                collector: name,
                executed: None,
                findings: None,
                errors: &[],
                diagnostics: &[],
                timestamp: utc_now(),
            }])?;

            let mut result = match collector.run(handle, writer, ids) {
                Ok(result) => result,
                Err(err) => {
                    warn!(collector = name, error = %format!("{err:#}"), "Collector failed");
                    CollectorResult::failed(name, format!("{err:#}"))
                }
            };
            if result.tool_name.is_empty() {
                result.tool_name = name.to_string();
            }
            if result.finished_at.is_empty() {
                result.finished_at = utc_now();
            }

            log.append(&[CollectorEvent {
                event: "collector.finish",
                collector: name,
                executed: Some(result.executed),
                findings: Some(result.findings),
                errors: &result.errors,
                diagnostics: &result.diagnostics,
                timestamp: result.finished_at.clone(),
            }])?;
            handle.register_tool(name, result.to_tool_status())?;

            info!(
                collector = name,
                executed = result.executed,
                findings = result.findings,
                errors = result.errors.len(),
                "Collector finished"
            );
            results.push(result);
        }
        Ok(results)
    }
}

/// Sibling `logs/` directory of a runs root.
pub fn default_log_dir(runs_root: &Path) -> PathBuf {
    runs_root
        .parent()
        .map(|parent| parent.join("logs"))
        .unwrap_or_else(|| runs_root.join("logs"))
}
