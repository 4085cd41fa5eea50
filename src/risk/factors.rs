//! Raw (unweighted) risk factors per component.

use crate::coverage::component_values;
use crate::evidence::{is_overall_component, ChurnRecord, CoverageRecord, FindingRecord};
use std::collections::BTreeMap;

pub const SECURITY: &str = "security";
pub const QUALITY: &str = "quality";
pub const COVERAGE: &str = "coverage";
pub const CHURN: &str = "churn";

/// Factor names in reporting order; also the tie-break order for dominance.
pub const FACTOR_ORDER: [&str; 4] = [SECURITY, QUALITY, COVERAGE, CHURN];

/// Contribution of one finding by its severity label.
pub fn severity_weight(severity: &str) -> f64 {
    match severity.to_ascii_lowercase().as_str() {
        "critical" => 3.0,
        "high" | "error" => 2.0,
        "medium" | "warning" => 1.0,
        "low" => 0.5,
        "info" | "convention" | "refactor" => 0.25,
        _ => 1.0,
    }
}

/// Churn volume before normalization across the run.
pub fn churn_volume(record: &ChurnRecord) -> f64 {
    record.commits as f64
        + (record.lines_added + record.lines_deleted) as f64 / 100.0
        + record.contributors as f64
}

/// Everything known about one component, before weighting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentEvidence {
    pub security: f64,
    pub quality: f64,
    pub security_findings: usize,
    pub quality_findings: usize,
    /// Component coverage in `[0, 1]`, if measured
    pub coverage: Option<f64>,
    /// Raw churn volume, if any churn was recorded
    pub churn: Option<f64>,
    pub evidence_refs: Vec<String>,
}

impl ComponentEvidence {
    pub fn has_findings(&self) -> bool {
        self.security_findings + self.quality_findings > 0
    }
}

/// Factor values in `[0, ∞)` for security/quality and `[0, 1]` for coverage/churn.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawFactors {
    pub security: f64,
    pub quality: f64,
    pub coverage: f64,
    pub churn: f64,
}

impl RawFactors {
    pub fn named(&self) -> [(&'static str, f64); 4] {
        let [security, quality, coverage, churn] = FACTOR_ORDER;
        [
            (security, self.security),
            (quality, self.quality),
            (coverage, self.coverage),
            (churn, self.churn),
        ]
    }

    /// Evidence kinds (findings, coverage, churn) whose factor is non-zero.
    ///
    /// Security and quality are both findings and count once.
    pub fn contributing_kinds(&self) -> usize {
        usize::from(self.security > 0.0 || self.quality > 0.0)
            + usize::from(self.coverage > 0.0)
            + usize::from(self.churn > 0.0)
    }
}

/// Factor with the largest positive weighted contribution.
pub fn dominant_factor(weighted: &BTreeMap<String, f64>) -> Option<&'static str> {
    FACTOR_ORDER
        .iter()
        .filter_map(|name| weighted.get(*name).map(|value| (*name, *value)))
        .filter(|(_, value)| *value > 0.0)
        .fold(None, |best: Option<(&'static str, f64)>, (name, value)| match best {
            Some((_, top)) if top >= value => best,
            _ => Some((name, value)),
        })
        .map(|(name, _)| name)
}

/// Group findings, coverage and churn by component, sorted by component.
pub fn collect_evidence(
    findings: &[FindingRecord],
    coverage: &[CoverageRecord],
    churn: &[ChurnRecord],
) -> BTreeMap<String, ComponentEvidence> {
    let mut components: BTreeMap<String, ComponentEvidence> = BTreeMap::new();

    for finding in findings {
        let Some(file) = finding.file.as_deref().filter(|f| !f.is_empty()) else {
            continue;
        };
        let entry = components.entry(file.to_string()).or_default();
        let weight = severity_weight(&finding.severity);
        if finding.is_security() {
            entry.security += weight;
            entry.security_findings += 1;
        } else {
            entry.quality += weight;
            entry.quality_findings += 1;
        }
        entry.evidence_refs.push(finding.evidence_id.clone());
    }

    for (component, measured) in component_values(coverage) {
        let entry = components.entry(component).or_default();
        entry.coverage = Some(measured.value);
        entry.evidence_refs.extend(measured.evidence_refs);
    }

    for record in churn {
        if record.path.is_empty() || is_overall_component(&record.path) {
            continue;
        }
        let entry = components.entry(record.path.clone()).or_default();
        *entry.churn.get_or_insert(0.0) += churn_volume(record);
        entry.evidence_refs.push(record.evidence_id.clone());
    }

    components
}

/// Turn collected evidence into factors; churn is scaled by the run's busiest component.
pub fn raw_factors(evidence: &BTreeMap<String, ComponentEvidence>) -> BTreeMap<String, RawFactors> {
    let max_churn = evidence
        .values()
        .filter_map(|e| e.churn)
        .fold(0.0_f64, f64::max);

    evidence
        .iter()
        .map(|(component, e)| {
            let churn = match e.churn {
                Some(raw) if max_churn > 0.0 => raw / max_churn,
                _ => 0.0,
            };
            let factors = RawFactors {
                security: e.security,
                quality: e.quality,
                coverage: e.coverage.map(|v| (1.0 - v).clamp(0.0, 1.0)).unwrap_or(0.0),
                churn,
            };
            (component.clone(), factors)
        })
        .collect()
}
