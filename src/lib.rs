//! Evidence-driven risk assessment for software-quality work.
//!
//! External collectors record findings, coverage and churn into a run's
//! append-only evidence store. The analysis stages fuse that evidence into
//! per-component risk scores, roll coverage up into critical user journeys,
//! and derive prioritized recommendations, all written back to the same run.

pub mod collectors;
pub mod config;
pub mod coverage;
pub mod errors;
pub mod evidence;
pub mod observability;
pub mod pipeline;
pub mod recommendations;
pub mod risk;

pub use crate::collectors::{Collector, CollectorOrchestrator, CollectorResult};
pub use crate::config::{Cuj, CujConfig, RiskBand, RiskConfig, RiskWeights};
pub use crate::coverage::{CoverageMapper, CujCoverage};
pub use crate::errors::{Error, Result};
pub use crate::evidence::{
    ChurnRecord, CoverageRecord, EvidenceCategory, EvidenceIdGenerator, EvidenceReader,
    EvidenceRecord, EvidenceWriter, FindingRecord, Manifest, Priority, RecommendationRecord,
    RiskRecord, RunHandle, RunManager, TargetMetadata, ToolStatus,
};
pub use crate::pipeline::{analyze_run, AnalysisOutcome, RunAnalysis};
pub use crate::recommendations::RecommendationEngine;
pub use crate::risk::{assign_band, RiskAggregator};
