//! Record shapes stored in a run's evidence streams and its manifest.
//!
//! Every evidence category is one append-only JSON-lines stream. The writer
//! is shape-agnostic (anything `Serialize`); the types here are what the
//! reader decodes each stream into.

use crate::errors::{Error, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Timestamp format used for `created_at` / `collected_at` fields.
pub const ISO8601: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Component identifier of the run-wide coverage total.
pub const OVERALL_COMPONENT: &str = "overall";

const LEGACY_OVERALL_COMPONENT: &str = "__overall__";

/// Current UTC time formatted as [`ISO8601`].
pub fn utc_now() -> String {
    Utc::now().format(ISO8601).to_string()
}

/// True for the run-wide sentinel component, which never maps to code.
pub fn is_overall_component(component: &str) -> bool {
    component == OVERALL_COMPONENT || component == LEGACY_OVERALL_COMPONENT
}

// ============================================================================
// Categories
// ============================================================================

/// Manifest counter keys.
pub mod counts {
    pub const FINDINGS: &str = "findings";
    pub const COVERAGE_COMPONENTS: &str = "coverage_components";
    pub const CHURN: &str = "churn";
    pub const RISKS: &str = "risks";
    pub const RECOMMENDATIONS: &str = "recommendations";
    pub const TESTS: &str = "tests";

    /// Counters present (at zero) in every new manifest.
    pub const DEFAULTS: [&str; 6] = [
        FINDINGS,
        COVERAGE_COMPONENTS,
        CHURN,
        RISKS,
        RECOMMENDATIONS,
        TESTS,
    ];
}

/// Well-known evidence streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceCategory {
    /// Lint, security and dependency findings
    Quality,
    Coverage,
    Churn,
    Risks,
    Recommendations,
    Tests,
    Apis,
}

impl EvidenceCategory {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::Coverage => "coverage",
            Self::Churn => "churn",
            Self::Risks => "risks",
            Self::Recommendations => "recommendations",
            Self::Tests => "tests",
            Self::Apis => "apis",
        }
    }
}

impl AsRef<str> for EvidenceCategory {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for EvidenceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Manifest counter fed by a category, if the category is tracked.
pub fn counter_key(category: &str) -> Option<&'static str> {
    match category {
        "quality" | "findings" => Some(counts::FINDINGS),
        "coverage" => Some(counts::COVERAGE_COMPONENTS),
        "churn" => Some(counts::CHURN),
        "risks" => Some(counts::RISKS),
        "recommendations" => Some(counts::RECOMMENDATIONS),
        "tests" => Some(counts::TESTS),
        _ => None,
    }
}

/// Category names double as file stems, so keep them to a safe token.
pub(crate) fn validate_category(category: &str) -> Result<()> {
    let valid = !category.is_empty()
        && category
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidCategory(category.to_string()))
    }
}

// ============================================================================
// Manifest
// ============================================================================

/// Metadata describing the analyzed target repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub git: BTreeMap<String, String>,
}

/// Execution status for a single tool/collector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolStatus {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub executed: bool,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Top-level summary of a run, rewritten wholesale on every update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub run_id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub target: TargetMetadata,
    #[serde(default)]
    pub tools: BTreeMap<String, ToolStatus>,
    #[serde(default = "default_counts")]
    pub counts: BTreeMap<String, u64>,
    #[serde(default)]
    pub evidence_files: BTreeMap<String, String>,
    #[serde(default)]
    pub diagnostics: Vec<String>,
}

fn default_counts() -> BTreeMap<String, u64> {
    counts::DEFAULTS
        .iter()
        .map(|key| (key.to_string(), 0))
        .collect()
}

impl Manifest {
    pub fn new(
        run_id: impl Into<String>,
        created_at: impl Into<String>,
        target: TargetMetadata,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            created_at: created_at.into(),
            target,
            tools: BTreeMap::new(),
            counts: default_counts(),
            evidence_files: BTreeMap::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Fill in any default counters missing from an older manifest.
    pub fn with_default_counts(mut self) -> Self {
        for key in counts::DEFAULTS {
            self.counts.entry(key.to_string()).or_insert(0);
        }
        self
    }

    pub fn count(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn increment_count(&mut self, key: &str, amount: u64) {
        *self.counts.entry(key.to_string()).or_insert(0) += amount;
    }

    pub fn register_file(&mut self, category: &str, relative_path: impl Into<String>) {
        self.evidence_files
            .insert(category.to_string(), relative_path.into());
    }

    pub fn register_tool(&mut self, name: &str, status: ToolStatus) {
        self.tools.insert(name.to_string(), status);
    }

    pub fn add_diagnostic(&mut self, message: impl Into<String>) {
        self.diagnostics.push(message.into());
    }
}

// ============================================================================
// Collected evidence
// ============================================================================

/// Normalized lint/security/dependency finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingRecord {
    pub evidence_id: String,
    pub tool: String,
    pub severity: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub column: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default = "utc_now")]
    pub collected_at: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

const SECURITY_TOOLS: [&str; 5] = ["bandit", "pip-audit", "semgrep", "safety", "cargo-audit"];

impl FindingRecord {
    pub fn new(
        evidence_id: impl Into<String>,
        tool: impl Into<String>,
        severity: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            evidence_id: evidence_id.into(),
            tool: tool.into(),
            severity: severity.into(),
            code: None,
            message: message.into(),
            file: None,
            line: None,
            column: None,
            tags: Vec::new(),
            confidence: None,
            collected_at: utc_now(),
            metadata: Map::new(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_location(mut self, file: impl Into<String>, line: u32, column: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Security-relevant findings feed the `security` factor instead of `quality`.
    pub fn is_security(&self) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case("security"))
            || SECURITY_TOOLS
                .iter()
                .any(|tool| self.tool.eq_ignore_ascii_case(tool))
    }
}

/// Coverage metric for a component (or the run-wide [`OVERALL_COMPONENT`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageRecord {
    #[serde(alias = "evidence_id")]
    pub coverage_id: String,
    /// Measurement type, e.g. `line` or `branch`
    #[serde(rename = "type", default = "default_coverage_kind")]
    pub kind: String,
    pub component: String,
    /// Fraction in `[0, 1]`
    pub value: f64,
    #[serde(default)]
    pub total_statements: Option<u64>,
    #[serde(default)]
    pub covered_statements: Option<u64>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub linked_cujs: Vec<String>,
    #[serde(default = "utc_now")]
    pub collected_at: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

fn default_coverage_kind() -> String {
    "line".to_string()
}

impl CoverageRecord {
    pub fn new(
        coverage_id: impl Into<String>,
        kind: impl Into<String>,
        component: impl Into<String>,
        value: f64,
    ) -> Self {
        Self {
            coverage_id: coverage_id.into(),
            kind: kind.into(),
            component: component.into(),
            value,
            total_statements: None,
            covered_statements: None,
            sources: Vec::new(),
            linked_cujs: Vec::new(),
            collected_at: utc_now(),
            metadata: Map::new(),
        }
    }

    pub fn with_statements(mut self, total: u64, covered: u64) -> Self {
        self.total_statements = Some(total);
        self.covered_statements = Some(covered);
        self
    }

    pub fn is_overall(&self) -> bool {
        is_overall_component(&self.component)
    }

    pub fn is_line(&self) -> bool {
        self.kind.eq_ignore_ascii_case("line")
    }
}

/// Git churn statistics for a file over a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnRecord {
    pub evidence_id: String,
    pub path: String,
    #[serde(default)]
    pub window: String,
    #[serde(default)]
    pub commits: u64,
    #[serde(default)]
    pub lines_added: u64,
    #[serde(default)]
    pub lines_deleted: u64,
    #[serde(default)]
    pub contributors: u64,
    #[serde(default)]
    pub last_commit_at: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ChurnRecord {
    pub fn new(
        evidence_id: impl Into<String>,
        path: impl Into<String>,
        window: impl Into<String>,
    ) -> Self {
        Self {
            evidence_id: evidence_id.into(),
            path: path.into(),
            window: window.into(),
            commits: 0,
            lines_added: 0,
            lines_deleted: 0,
            contributors: 0,
            last_commit_at: None,
            metadata: Map::new(),
        }
    }

    pub fn with_activity(
        mut self,
        commits: u64,
        lines_added: u64,
        lines_deleted: u64,
        contributors: u64,
    ) -> Self {
        self.commits = commits;
        self.lines_added = lines_added;
        self.lines_deleted = lines_deleted;
        self.contributors = contributors;
        self
    }
}

/// Inventory entry for a test case (existing or generated).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRecord {
    pub test_id: String,
    pub kind: String,
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub last_run: Option<String>,
    #[serde(default)]
    pub evidence_refs: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// API surface entry discovered for the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRecord {
    pub api_id: String,
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub auth_required: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_api_source")]
    pub source: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub evidence_refs: Vec<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

fn default_api_source() -> String {
    "unknown".to_string()
}

// ============================================================================
// Derived evidence
// ============================================================================

/// Unvalidated risk fields; turned into a [`RiskRecord`] by [`RiskRecord::new`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RiskDraft {
    #[serde(default)]
    pub risk_id: String,
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default = "default_band")]
    pub band: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default = "default_severity")]
    pub severity: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub evidence_refs: Vec<String>,
    #[serde(default)]
    pub factors: BTreeMap<String, f64>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default = "utc_now")]
    pub created_at: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

fn default_band() -> String {
    "P3".to_string()
}

fn default_severity() -> String {
    "low".to_string()
}

/// Computed risk score for a component.
///
/// `score` and `confidence` are only reachable through validated
/// construction, so a stored risk always satisfies `0 <= score <= max_total`
/// and `0 <= confidence <= 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RiskDraft")]
pub struct RiskRecord {
    pub risk_id: String,
    pub component: String,
    score: f64,
    pub band: String,
    confidence: f64,
    pub severity: String,
    pub title: String,
    pub description: String,
    pub evidence_refs: Vec<String>,
    /// Weighted contribution of each factor to `score`
    pub factors: BTreeMap<String, f64>,
    pub recommendations: Vec<String>,
    pub created_at: String,
    pub metadata: Map<String, Value>,
}

impl RiskRecord {
    /// Validate a draft against the scoring cap in force when it was computed.
    pub fn new(draft: RiskDraft, max_total: f64) -> Result<Self> {
        if !draft.score.is_finite() || draft.score < 0.0 || draft.score > max_total {
            return Err(Error::validation(format!(
                "risk score {} for '{}' must be between 0 and {}",
                draft.score, draft.component, max_total
            )));
        }
        if !(0.0..=1.0).contains(&draft.confidence) {
            return Err(Error::validation(format!(
                "risk confidence {} for '{}' must be between 0 and 1",
                draft.confidence, draft.component
            )));
        }
        Ok(Self {
            risk_id: draft.risk_id,
            component: draft.component,
            score: draft.score,
            band: draft.band,
            confidence: draft.confidence,
            severity: draft.severity,
            title: draft.title,
            description: draft.description,
            evidence_refs: draft.evidence_refs,
            factors: draft.factors,
            recommendations: draft.recommendations,
            created_at: draft.created_at,
            metadata: draft.metadata,
        })
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

impl TryFrom<RiskDraft> for RiskRecord {
    type Error = Error;

    // The scoring cap is not stored with the record; only the lower
    // bound and finiteness can be checked when decoding.
    fn try_from(draft: RiskDraft) -> Result<Self> {
        Self::new(draft, f64::MAX)
    }
}

/// Recommendation urgency, derived from a numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    /// Fixed thresholds, independent of the configured risk bands.
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 80.0 => Self::Critical,
            s if s >= 65.0 => Self::High,
            s if s >= 50.0 => Self::Medium,
            _ => Self::Low,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recommended action derived from risk and coverage analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRecord {
    pub recommendation_id: String,
    /// Component path, or journey id for coverage-gap recommendations
    pub component: String,
    pub priority: Priority,
    pub summary: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub evidence_refs: Vec<String>,
    #[serde(default = "utc_now")]
    pub created_at: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

// ============================================================================
// Sum type
// ============================================================================

/// Any record the store knows how to decode, tagged by its category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EvidenceRecord {
    Finding(FindingRecord),
    Coverage(CoverageRecord),
    Churn(ChurnRecord),
    Test(TestRecord),
    Api(ApiRecord),
    Risk(RiskRecord),
    Recommendation(RecommendationRecord),
}

impl EvidenceRecord {
    pub fn category(&self) -> EvidenceCategory {
        match self {
            Self::Finding(_) => EvidenceCategory::Quality,
            Self::Coverage(_) => EvidenceCategory::Coverage,
            Self::Churn(_) => EvidenceCategory::Churn,
            Self::Test(_) => EvidenceCategory::Tests,
            Self::Api(_) => EvidenceCategory::Apis,
            Self::Risk(_) => EvidenceCategory::Risks,
            Self::Recommendation(_) => EvidenceCategory::Recommendations,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Finding(r) => &r.evidence_id,
            Self::Coverage(r) => &r.coverage_id,
            Self::Churn(r) => &r.evidence_id,
            Self::Test(r) => &r.test_id,
            Self::Api(r) => &r.api_id,
            Self::Risk(r) => &r.risk_id,
            Self::Recommendation(r) => &r.recommendation_id,
        }
    }
}
