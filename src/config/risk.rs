//! Risk scoring configuration: factor weights, priority bands, score cap.
//!
//! File layout:
//!
//! ```yaml
//! scoring:
//!   weights: { security: 3.0, quality: 0.5, coverage: 2.0, churn: 2.0 }
//!   caps: { max_total: 100 }
//! prioritization:
//!   bands:
//!     - { name: P0, min_score: 80 }
//!     - { name: P3, min_score: 0 }
//! ```

use super::loader::{load_or_default, parse_document, ConfigFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Weight applied to each evidence factor before summing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskWeights {
    #[serde(default = "default_security_weight")]
    pub security: f64,

    /// Code quality issues (lint) weigh less than security findings
    #[serde(default = "default_quality_weight")]
    pub quality: f64,

    #[serde(default = "default_coverage_weight")]
    pub coverage: f64,

    #[serde(default = "default_churn_weight")]
    pub churn: f64,

    #[serde(default = "default_complexity_weight")]
    pub complexity: f64,

    #[serde(default = "default_api_exposure_weight")]
    pub api_exposure: f64,

    #[serde(default = "default_a11y_weight", alias = "accessibility")]
    pub a11y: f64,

    #[serde(default = "default_performance_weight")]
    pub performance: f64,
}

pub fn default_security_weight() -> f64 {
    3.0
}

pub fn default_quality_weight() -> f64 {
    0.5
}

pub fn default_coverage_weight() -> f64 {
    2.0
}

pub fn default_churn_weight() -> f64 {
    2.0
}

pub fn default_complexity_weight() -> f64 {
    1.5
}

pub fn default_api_exposure_weight() -> f64 {
    1.0
}

pub fn default_a11y_weight() -> f64 {
    0.5
}

pub fn default_performance_weight() -> f64 {
    1.0
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            security: default_security_weight(),
            quality: default_quality_weight(),
            coverage: default_coverage_weight(),
            churn: default_churn_weight(),
            complexity: default_complexity_weight(),
            api_exposure: default_api_exposure_weight(),
            a11y: default_a11y_weight(),
            performance: default_performance_weight(),
        }
    }
}

impl RiskWeights {
    fn named(&self) -> [(&'static str, f64); 8] {
        [
            ("security", self.security),
            ("quality", self.quality),
            ("coverage", self.coverage),
            ("churn", self.churn),
            ("complexity", self.complexity),
            ("api_exposure", self.api_exposure),
            ("a11y", self.a11y),
            ("performance", self.performance),
        ]
    }

    // Pure function: Validate a single weight with name
    pub fn validate_weight(weight: f64, name: &str) -> Result<(), String> {
        if weight.is_finite() && weight >= 0.0 {
            Ok(())
        } else {
            Err(format!("{name} weight must be a non-negative number, got {weight}"))
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.named()
            .iter()
            .try_for_each(|(name, weight)| Self::validate_weight(*weight, name))
    }
}

/// A named priority tier: scores at or above `min_score` belong to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskBand {
    pub name: String,
    #[serde(default)]
    pub min_score: f64,
}

impl RiskBand {
    pub fn new(name: impl Into<String>, min_score: f64) -> Self {
        Self {
            name: name.into(),
            min_score,
        }
    }
}

pub fn default_bands() -> Vec<RiskBand> {
    vec![
        RiskBand::new("P0", 80.0),
        RiskBand::new("P1", 65.0),
        RiskBand::new("P2", 50.0),
        RiskBand::new("P3", 0.0),
    ]
}

pub fn default_max_total() -> f64 {
    100.0
}

/// Validated scoring configuration. Bands are kept in descending `min_score` order.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskConfig {
    pub weights: RiskWeights,
    bands: Vec<RiskBand>,
    pub max_total: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            weights: RiskWeights::default(),
            bands: default_bands(),
            max_total: default_max_total(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RiskConfigFile {
    #[serde(default)]
    scoring: ScoringSection,
    #[serde(default)]
    prioritization: PrioritizationSection,
}

#[derive(Debug, Default, Deserialize)]
struct ScoringSection {
    #[serde(default)]
    weights: RiskWeights,
    #[serde(default)]
    caps: CapsSection,
}

#[derive(Debug, Default, Deserialize)]
struct CapsSection {
    #[serde(default)]
    max_total: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct PrioritizationSection {
    #[serde(default)]
    bands: Vec<RiskBand>,
}

impl RiskConfig {
    /// Build a config; an empty band list falls back to the default bands.
    pub fn new(weights: RiskWeights, bands: Vec<RiskBand>, max_total: f64) -> Result<Self, String> {
        weights.validate()?;
        if !max_total.is_finite() || max_total <= 0.0 {
            return Err(format!("max_total must be a positive number, got {max_total}"));
        }
        let mut bands = if bands.is_empty() { default_bands() } else { bands };
        for band in &bands {
            if band.name.trim().is_empty() {
                return Err("band names must not be empty".to_string());
            }
            if !band.min_score.is_finite() {
                return Err(format!("band '{}' has a non-finite min_score", band.name));
            }
        }
        bands.sort_by(|a, b| b.min_score.total_cmp(&a.min_score));
        Ok(Self {
            weights,
            bands,
            max_total,
        })
    }

    pub fn bands(&self) -> &[RiskBand] {
        &self.bands
    }

    /// Pure function to parse and validate config from file contents
    pub fn parse(contents: &str, format: ConfigFormat) -> Result<Self, String> {
        let file: RiskConfigFile = parse_document(contents, format)?;
        Self::new(
            file.scoring.weights,
            file.prioritization.bands,
            file.scoring.caps.max_total.unwrap_or_else(default_max_total),
        )
    }

    /// Load from `path`; a missing, unreadable or invalid file yields the defaults.
    pub fn load(path: &Path) -> Self {
        load_or_default(path, "risk", Self::parse)
    }
}
