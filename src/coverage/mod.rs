//! Coverage Mapper: per-component coverage rolled up into journeys.
//!
//! A journey's coverage is the mean over every component that matches one of
//! its patterns. Components are collapsed to a single value first (line
//! measurements preferred), so a component reported as both `line` and
//! `branch` counts once.

pub mod glob;

use crate::config::{Cuj, CujConfig};
use crate::evidence::CoverageRecord;
use glob::GlobPattern;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info_span, warn};

/// Collapsed coverage for one component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentCoverage {
    /// Fraction in `[0, 1]`
    pub value: f64,
    pub evidence_refs: Vec<String>,
}

/// One value per component: the mean of its `line` records if it has any,
/// otherwise the mean of all its records.
///
/// The run-wide sentinel and non-finite values are skipped.
pub fn component_values(records: &[CoverageRecord]) -> BTreeMap<String, ComponentCoverage> {
    #[derive(Default)]
    struct Acc {
        line: Vec<f64>,
        other: Vec<f64>,
        refs: Vec<String>,
    }

    let mut by_component: BTreeMap<&str, Acc> = BTreeMap::new();
    for record in records {
        if record.is_overall() || !record.value.is_finite() {
            continue;
        }
        let acc = by_component.entry(record.component.as_str()).or_default();
        if record.is_line() {
            acc.line.push(record.value);
        } else {
            acc.other.push(record.value);
        }
        acc.refs.push(record.coverage_id.clone());
    }

    by_component
        .into_iter()
        .map(|(component, acc)| {
            let values = if acc.line.is_empty() {
                acc.other
            } else {
                acc.line
            };
            let value = (values.iter().sum::<f64>() / values.len() as f64).clamp(0.0, 1.0);
            (
                component.to_string(),
                ComponentCoverage {
                    value,
                    evidence_refs: acc.refs,
                },
            )
        })
        .collect()
}

/// Coverage of one journey against its target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CujCoverage {
    pub journey: Cuj,
    /// Mean of matched component values, `0.0` without matches
    pub coverage: f64,
    /// Target as a fraction in `[0, 1]`
    pub target: f64,
    /// Matched components and their values
    pub components: BTreeMap<String, f64>,
    pub evidence_refs: Vec<String>,
}

impl CujCoverage {
    pub fn gap(&self) -> f64 {
        (self.target - self.coverage).max(0.0)
    }

    /// True when coverage falls short of the target by more than `tolerance`.
    pub fn is_below_target(&self, tolerance: f64) -> bool {
        self.coverage < self.target - tolerance
    }

    /// Matched components below the target, lowest coverage first.
    pub fn under_covered(&self) -> Vec<(&str, f64)> {
        let mut below: Vec<(&str, f64)> = self
            .components
            .iter()
            .filter(|(_, value)| **value < self.target)
            .map(|(component, value)| (component.as_str(), *value))
            .collect();
        below.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        below
    }
}

struct CompiledJourney {
    journey: Cuj,
    patterns: Vec<GlobPattern>,
}

impl CompiledJourney {
    fn matches(&self, component: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(component))
    }
}

pub struct CoverageMapper {
    config: CujConfig,
    journeys: Vec<CompiledJourney>,
}

impl CoverageMapper {
    pub fn new(config: CujConfig) -> Self {
        let journeys = config
            .journeys
            .iter()
            .map(|journey| CompiledJourney {
                journey: journey.clone(),
                patterns: journey
                    .components
                    .iter()
                    .filter_map(|pattern| match GlobPattern::new(pattern) {
                        Ok(glob) => Some(glob),
                        Err(err) => {
                            warn!(
                                journey = %journey.id,
                                pattern = %pattern,
                                error = %err,
                                "Skipping invalid component pattern"
                            );
                            None
                        }
                    })
                    .collect(),
            })
            .collect();
        Self { config, journeys }
    }

    pub fn config(&self) -> &CujConfig {
        &self.config
    }

    /// Coverage for every configured journey, in configuration order.
    pub fn map_coverage(&self, records: &[CoverageRecord]) -> Vec<CujCoverage> {
        let _span = info_span!("coverage.map", journeys = self.journeys.len()).entered();
        let values = component_values(records);

        self.journeys
            .iter()
            .map(|compiled| {
                let mut components = BTreeMap::new();
                let mut evidence_refs = Vec::new();
                for (component, coverage) in &values {
                    if compiled.matches(component) {
                        components.insert(component.clone(), coverage.value);
                        evidence_refs.extend(coverage.evidence_refs.iter().cloned());
                    }
                }
                let coverage = if components.is_empty() {
                    0.0
                } else {
                    components.values().sum::<f64>() / components.len() as f64
                };
                let target = self.config.target_fraction(&compiled.journey.id);
                debug!(
                    journey = %compiled.journey.id,
                    matched = components.len(),
                    coverage,
                    target,
                    "Mapped journey coverage"
                );
                CujCoverage {
                    journey: compiled.journey.clone(),
                    coverage,
                    target,
                    components,
                    evidence_refs,
                }
            })
            .collect()
    }
}
