//! Analysis stages run in order against one run's stored evidence.
//!
//! Aggregator, then Coverage Mapper, then Recommendation Engine. The id
//! generator is seeded from risks and recommendations already in the run,
//! so analysing the same run twice appends new records with fresh ids.

use crate::config::{CujConfig, RiskConfig};
use crate::coverage::{CoverageMapper, CujCoverage};
use crate::errors::Result;
use crate::evidence::{
    EvidenceIdGenerator, EvidenceReader, EvidenceWriter, RecommendationRecord, RiskRecord,
    RunHandle, RunManager,
};
use crate::recommendations::RecommendationEngine;
use crate::risk::RiskAggregator;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Everything one analysis pass produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisOutcome {
    pub risks: Vec<RiskRecord>,
    pub journeys: Vec<CujCoverage>,
    pub recommendations: Vec<RecommendationRecord>,
}

pub struct RunAnalysis {
    aggregator: RiskAggregator,
    mapper: CoverageMapper,
    engine: RecommendationEngine,
}

impl RunAnalysis {
    pub fn new(risk_config: RiskConfig, cuj_config: CujConfig) -> Self {
        Self {
            aggregator: RiskAggregator::new(risk_config),
            mapper: CoverageMapper::new(cuj_config),
            engine: RecommendationEngine::default(),
        }
    }

    /// Load both configs; an absent path or a bad file means defaults.
    pub fn from_files(risk_config: Option<&Path>, cuj_config: Option<&Path>) -> Self {
        Self::new(
            risk_config.map(RiskConfig::load).unwrap_or_default(),
            cuj_config.map(CujConfig::load).unwrap_or_default(),
        )
    }

    pub fn with_engine(mut self, engine: RecommendationEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn run(&self, handle: &RunHandle) -> Result<AnalysisOutcome> {
        let reader = EvidenceReader::new(handle);
        let writer = EvidenceWriter::new(handle);
        let mut ids = EvidenceIdGenerator::new(handle.run_id.clone())?;
        for risk in reader.read_risks()? {
            ids.observe(&risk.risk_id);
        }
        for recommendation in reader.read_recommendations()? {
            ids.observe(&recommendation.recommendation_id);
        }

        let risks = self.aggregator.aggregate(&reader, &writer, &mut ids)?;
        let journeys = self.mapper.map_coverage(&reader.read_coverage()?);
        let recommendations = self
            .engine
            .generate(&risks, &journeys, &writer, &mut ids)?;

        info!(
            run_id = %handle.run_id,
            risks = risks.len(),
            journeys = journeys.len(),
            recommendations = recommendations.len(),
            "Analysis complete"
        );
        Ok(AnalysisOutcome {
            risks,
            journeys,
            recommendations,
        })
    }
}

/// Analyse a stored run by id or directory.
pub fn analyze_run(
    manager: &RunManager,
    run: impl AsRef<Path>,
    risk_config: Option<&Path>,
    cuj_config: Option<&Path>,
) -> Result<AnalysisOutcome> {
    let handle = manager.load_run(run)?;
    RunAnalysis::from_files(risk_config, cuj_config).run(&handle)
}
