//! Risk Aggregator: findings, coverage and churn fused into per-component scores.
//!
//! Each component gets four raw factors (see [`factors`]), each multiplied by
//! its configured weight and summed, then capped at `max_total`. The band is
//! the highest configured band whose threshold the score meets. Scoring is a
//! pure function of the evidence and the config; components are visited in
//! lexicographic order so ids are minted deterministically too.

pub mod bands;
pub mod factors;

pub use bands::assign_band;
pub use factors::{
    collect_evidence, dominant_factor, raw_factors, severity_weight, ComponentEvidence, RawFactors,
    FACTOR_ORDER,
};

use crate::config::RiskConfig;
use crate::errors::Result;
use crate::evidence::{
    utc_now, ChurnRecord, CoverageRecord, EvidenceCategory, EvidenceIdGenerator, EvidenceReader,
    EvidenceWriter, FindingRecord, Priority, RiskDraft, RiskRecord,
};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, info, info_span};

/// Id prefix for risk records.
pub const RISK_PREFIX: &str = "RSK";

/// Band used when the configured list is somehow empty.
const FALLBACK_BAND: &str = "P3";

/// Scored component, before it is given an id.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentScore {
    pub component: String,
    pub score: f64,
    pub band: String,
    pub confidence: f64,
    /// Weighted contribution of each factor
    pub factors: BTreeMap<String, f64>,
    pub raw: RawFactors,
    pub evidence: ComponentEvidence,
}

impl ComponentScore {
    pub fn severity(&self) -> Priority {
        Priority::from_score(self.score)
    }

    /// Factor with the largest weighted contribution; ties go to the first in
    /// security, quality, coverage, churn order.
    pub fn dominant_factor(&self) -> Option<&'static str> {
        dominant_factor(&self.factors)
    }

    /// Suggested actions, strongest signal first.
    pub fn suggested_actions(&self) -> Vec<String> {
        let mut actions = Vec::new();
        if self.evidence.security_findings > 0 {
            actions.push(format!(
                "Remediate {} security finding(s)",
                self.evidence.security_findings
            ));
        }
        if let Some(coverage) = self.evidence.coverage.filter(|_| self.raw.coverage > 0.0) {
            actions.push(format!(
                "Add tests to raise coverage above {:.0}%",
                coverage * 100.0
            ));
        }
        if self.raw.churn >= 0.5 {
            actions.push("Stabilize frequently changed code before extending it".to_string());
        }
        if self.evidence.quality_findings > 0 {
            actions.push(format!(
                "Resolve {} code quality finding(s)",
                self.evidence.quality_findings
            ));
        }
        actions
    }

    fn description(&self) -> String {
        let breakdown = self
            .raw
            .named()
            .iter()
            .map(|(name, _)| {
                format!(
                    "{name} {:.2}",
                    self.factors.get(*name).copied().unwrap_or(0.0)
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Risk score {:.1} ({}) from {} evidence record(s): {}",
            self.score,
            self.band,
            self.evidence.evidence_refs.len(),
            breakdown
        )
    }

    fn metadata(&self) -> Map<String, Value> {
        let raw: Map<String, Value> = self
            .raw
            .named()
            .iter()
            .map(|(name, value)| (name.to_string(), json!(value)))
            .collect();
        let mut metadata = Map::new();
        metadata.insert("raw_factors".into(), Value::Object(raw));
        metadata.insert(
            "security_findings".into(),
            json!(self.evidence.security_findings),
        );
        metadata.insert(
            "quality_findings".into(),
            json!(self.evidence.quality_findings),
        );
        if let Some(coverage) = self.evidence.coverage {
            metadata.insert("coverage".into(), json!(coverage));
        }
        if let Some(churn) = self.evidence.churn {
            metadata.insert("churn_volume".into(), json!(churn));
        }
        metadata
    }

    /// Validated record with the given id.
    pub fn into_record(self, risk_id: String, max_total: f64) -> Result<RiskRecord> {
        let severity = self.severity().as_str().to_string();
        let draft = RiskDraft {
            risk_id,
            title: format!("{} risk ({})", self.component, severity),
            description: self.description(),
            recommendations: self.suggested_actions(),
            metadata: self.metadata(),
            component: self.component,
            score: self.score,
            band: self.band,
            confidence: self.confidence,
            severity,
            evidence_refs: self.evidence.evidence_refs,
            factors: self.factors,
            created_at: utc_now(),
        };
        RiskRecord::new(draft, max_total)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RiskAggregator {
    config: RiskConfig,
}

impl RiskAggregator {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    // Pure function: weighted sum capped at max_total
    fn weighted(&self, raw: &RawFactors) -> (f64, BTreeMap<String, f64>) {
        let weights = &self.config.weights;
        let factors: BTreeMap<String, f64> = [
            (factors::SECURITY, raw.security * weights.security),
            (factors::QUALITY, raw.quality * weights.quality),
            (factors::COVERAGE, raw.coverage * weights.coverage),
            (factors::CHURN, raw.churn * weights.churn),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();
        let total: f64 = factors.values().sum();
        (total.clamp(0.0, self.config.max_total), factors)
    }

    /// Score every component with evidence, in component order.
    pub fn score_components(
        &self,
        findings: &[FindingRecord],
        coverage: &[CoverageRecord],
        churn: &[ChurnRecord],
    ) -> Vec<ComponentScore> {
        let mut evidence = collect_evidence(findings, coverage, churn);
        let raw = raw_factors(&evidence);

        raw.into_iter()
            .filter_map(|(component, raw)| {
                let evidence = evidence.remove(&component)?;
                let (score, factors) = self.weighted(&raw);
                let band = assign_band(score, self.config.bands())
                    .unwrap_or(FALLBACK_BAND)
                    .to_string();
                let confidence = (raw.contributing_kinds() as f64 / 3.0).min(1.0);
                Some(ComponentScore {
                    component,
                    score,
                    band,
                    confidence,
                    factors,
                    raw,
                    evidence,
                })
            })
            .collect()
    }

    /// Score the run's evidence and persist the resulting risks.
    ///
    /// Nothing is written when no component has evidence.
    pub fn aggregate(
        &self,
        reader: &EvidenceReader,
        writer: &EvidenceWriter,
        ids: &mut EvidenceIdGenerator,
    ) -> Result<Vec<RiskRecord>> {
        let _span = info_span!("risk.aggregate", run_id = %reader.handle().run_id).entered();

        let findings = reader.read_findings()?;
        let coverage = reader.read_coverage()?;
        let churn = reader.read_churn()?;
        debug!(
            findings = findings.len(),
            coverage = coverage.len(),
            churn = churn.len(),
            "Loaded evidence for aggregation"
        );

        let mut risks = Vec::new();
        for scored in self.score_components(&findings, &coverage, &churn) {
            let risk_id = ids.next_id(RISK_PREFIX)?;
            risks.push(scored.into_record(risk_id, self.config.max_total)?);
        }

        if !risks.is_empty() {
            writer.write_records(EvidenceCategory::Risks, &risks)?;
        }
        info!(count = risks.len(), "Aggregated component risks");
        Ok(risks)
    }
}
