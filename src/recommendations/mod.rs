//! Recommendation Engine: one action per risk, plus one per under-covered journey.
//!
//! Risk recommendations take their priority from the score through the fixed
//! [`Priority::from_score`] thresholds, not from the risk's configured band.
//! Journey gap recommendations are always `high`.

pub mod rationale;

pub use rationale::RationaleBuilder;

use crate::coverage::CujCoverage;
use crate::errors::Result;
use crate::evidence::{
    utc_now, EvidenceCategory, EvidenceIdGenerator, EvidenceWriter, Priority,
    RecommendationRecord, RiskRecord,
};
use serde_json::{json, Map, Value};
use tracing::{debug, info, info_span};

/// Id prefix for recommendation records.
pub const RECOMMENDATION_PREFIX: &str = "REC";

/// Slack allowed below a journey's target before it is reported.
pub const DEFAULT_COVERAGE_TOLERANCE: f64 = 0.05;

#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationEngine {
    coverage_tolerance: f64,
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self {
            coverage_tolerance: DEFAULT_COVERAGE_TOLERANCE,
        }
    }
}

impl RecommendationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Negative or non-finite tolerances are treated as zero.
    pub fn with_coverage_tolerance(mut self, tolerance: f64) -> Self {
        self.coverage_tolerance = if tolerance.is_finite() {
            tolerance.max(0.0)
        } else {
            0.0
        };
        self
    }

    pub fn coverage_tolerance(&self) -> f64 {
        self.coverage_tolerance
    }

    /// Build recommendations and persist them; nothing is written for an empty list.
    pub fn generate(
        &self,
        risks: &[RiskRecord],
        cuj_coverage: &[CujCoverage],
        writer: &EvidenceWriter,
        ids: &mut EvidenceIdGenerator,
    ) -> Result<Vec<RecommendationRecord>> {
        let _span = info_span!(
            "recommendations.generate",
            risks = risks.len(),
            journeys = cuj_coverage.len()
        )
        .entered();

        let mut recommendations = Vec::with_capacity(risks.len());
        for risk in risks {
            let id = ids.next_id(RECOMMENDATION_PREFIX)?;
            recommendations.push(from_risk(risk, id));
        }

        for journey in cuj_coverage {
            if !journey.is_below_target(self.coverage_tolerance) {
                continue;
            }
            debug!(
                journey = %journey.journey.id,
                coverage = journey.coverage,
                target = journey.target,
                "Journey below coverage target"
            );
            let id = ids.next_id(RECOMMENDATION_PREFIX)?;
            recommendations.push(from_gap(journey, id));
        }

        if !recommendations.is_empty() {
            writer.write_records(EvidenceCategory::Recommendations, &recommendations)?;
        }
        info!(count = recommendations.len(), "Generated recommendations");
        Ok(recommendations)
    }
}

fn from_risk(risk: &RiskRecord, recommendation_id: String) -> RecommendationRecord {
    let priority = Priority::from_score(risk.score());
    let mut evidence_refs = vec![risk.risk_id.clone()];
    evidence_refs.extend(risk.evidence_refs.iter().cloned());

    let mut metadata = Map::new();
    metadata.insert("kind".into(), Value::from("risk"));
    metadata.insert("risk_id".into(), Value::from(risk.risk_id.clone()));
    metadata.insert("score".into(), json!(risk.score()));
    metadata.insert("band".into(), Value::from(risk.band.clone()));

    RecommendationRecord {
        recommendation_id,
        component: risk.component.clone(),
        priority,
        summary: RationaleBuilder::risk_summary(risk),
        details: RationaleBuilder::risk_details(risk, priority),
        evidence_refs,
        created_at: utc_now(),
        metadata,
    }
}

fn from_gap(journey: &CujCoverage, recommendation_id: String) -> RecommendationRecord {
    let mut metadata = Map::new();
    metadata.insert("kind".into(), Value::from("coverage_gap"));
    metadata.insert("journey_name".into(), Value::from(journey.journey.name.clone()));
    metadata.insert("coverage".into(), json!(journey.coverage));
    metadata.insert("target".into(), json!(journey.target));
    metadata.insert("gap".into(), json!(journey.gap()));
    metadata.insert(
        "under_covered".into(),
        Value::from(
            journey
                .under_covered()
                .into_iter()
                .map(|(component, _)| component.to_string())
                .collect::<Vec<_>>(),
        ),
    );

    RecommendationRecord {
        recommendation_id,
        component: journey.journey.id.clone(),
        priority: Priority::High,
        summary: RationaleBuilder::gap_summary(journey),
        details: RationaleBuilder::gap_details(journey),
        evidence_refs: journey.evidence_refs.clone(),
        created_at: utc_now(),
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Cuj;
    use crate::evidence::{RiskDraft, RunHandle, RunManager};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn setup() -> (TempDir, RunHandle, EvidenceIdGenerator) {
        let tmp = TempDir::new().unwrap();
        let manager = RunManager::new(tmp.path().join("runs")).unwrap();
        let handle = manager.create_run("repo", tmp.path(), None).unwrap();
        let ids = EvidenceIdGenerator::new(handle.run_id.clone()).unwrap();
        (tmp, handle, ids)
    }

    fn risk(component: &str, score: f64) -> RiskRecord {
        let draft = RiskDraft {
            risk_id: format!("RSK-20250101-{:04}", score as u32),
            component: component.into(),
            score,
            confidence: 0.5,
            band: "P0".into(),
            evidence_refs: vec!["FND-20250101-0001".into()],
            factors: BTreeMap::from([("security".to_string(), score)]),
            ..RiskDraft::default()
        };
        RiskRecord::new(draft, 100.0).unwrap()
    }

    fn journey(coverage: f64, target: f64) -> CujCoverage {
        CujCoverage {
            journey: Cuj::new("checkout", "Checkout", ["src/cart/*"]),
            coverage,
            target,
            components: BTreeMap::from([("src/cart/a.py".to_string(), coverage)]),
            evidence_refs: vec!["COV-20250101-0001".into()],
        }
    }

    #[test]
    fn risk_priority_uses_fixed_thresholds() {
        let (_tmp, handle, mut ids) = setup();
        let writer = EvidenceWriter::new(&handle);
        let recs = RecommendationEngine::default()
            .generate(
                &[risk("a.py", 82.0), risk("b.py", 66.0), risk("c.py", 10.0)],
                &[],
                &writer,
                &mut ids,
            )
            .unwrap();
        let priorities: Vec<Priority> = recs.iter().map(|r| r.priority).collect();
        assert_eq!(
            priorities,
            vec![Priority::Critical, Priority::High, Priority::Low]
        );
        assert_eq!(recs[0].component, "a.py");
        assert_eq!(recs[0].evidence_refs[0], "RSK-20250101-0082");
        assert_eq!(recs[0].metadata["band"], "P0");
    }

    #[test]
    fn journey_gap_yields_one_high_recommendation() {
        let (_tmp, handle, mut ids) = setup();
        let writer = EvidenceWriter::new(&handle);
        let recs = RecommendationEngine::default()
            .generate(&[], &[journey(0.4, 0.8)], &writer, &mut ids)
            .unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].priority, Priority::High);
        assert_eq!(recs[0].component, "checkout");
        assert!((recs[0].metadata["gap"].as_f64().unwrap() - 0.4).abs() < 1e-9);
        assert_eq!(handle.read_manifest().unwrap().count("recommendations"), 1);
    }

    #[test]
    fn journey_within_tolerance_is_not_reported() {
        let (_tmp, handle, mut ids) = setup();
        let writer = EvidenceWriter::new(&handle);
        let engine = RecommendationEngine::default();
        assert!(engine
            .generate(&[], &[journey(0.76, 0.8)], &writer, &mut ids)
            .unwrap()
            .is_empty());
        let strict = engine.with_coverage_tolerance(0.0);
        assert_eq!(
            strict
                .generate(&[], &[journey(0.76, 0.8)], &writer, &mut ids)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn empty_input_writes_nothing() {
        let (_tmp, handle, mut ids) = setup();
        let writer = EvidenceWriter::new(&handle);
        let recs = RecommendationEngine::default()
            .generate(&[], &[], &writer, &mut ids)
            .unwrap();
        assert!(recs.is_empty());
        assert!(!handle.stream_path("recommendations").exists());
        assert_eq!(handle.read_manifest().unwrap().count("recommendations"), 0);
    }

    #[test]
    fn tolerance_is_never_negative() {
        let engine = RecommendationEngine::new().with_coverage_tolerance(-1.0);
        assert_eq!(engine.coverage_tolerance(), 0.0);
        let engine = RecommendationEngine::new().with_coverage_tolerance(f64::NAN);
        assert_eq!(engine.coverage_tolerance(), 0.0);
    }
}
