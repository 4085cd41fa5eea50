//! Critical User Journey configuration.

use super::loader::{load_or_default, parse_document, ConfigFormat};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// A business workflow mapped onto code components by glob patterns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cuj {
    pub id: String,
    pub name: String,
    /// Shell-style patterns over component identifiers
    pub components: Vec<String>,
    pub apis: Vec<BTreeMap<String, String>>,
    pub acceptance: Vec<String>,
}

impl Cuj {
    pub fn new<I, S>(id: impl Into<String>, name: impl Into<String>, components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            name: name.into(),
            components: components.into_iter().map(Into::into).collect(),
            apis: Vec::new(),
            acceptance: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CujConfig {
    pub product: String,
    pub journeys: Vec<Cuj>,
    /// Journey id to target coverage, in percent
    pub coverage_targets: BTreeMap<String, f64>,
}

#[derive(Debug, Default, Deserialize)]
struct CujConfigFile {
    #[serde(default)]
    product: String,
    #[serde(default)]
    journeys: Vec<JourneyEntry>,
    #[serde(default)]
    coverage_targets: BTreeMap<String, TargetValue>,
}

#[derive(Debug, Deserialize)]
struct JourneyEntry {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    components: Vec<String>,
    #[serde(default)]
    apis: Vec<BTreeMap<String, String>>,
    #[serde(default)]
    acceptance: Vec<String>,
}

/// Targets may be written as numbers or numeric strings; anything else is zero.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TargetValue {
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

impl TargetValue {
    fn to_percent(&self, journey: &str) -> f64 {
        let parsed = match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
            Self::Other(_) => None,
        };
        match parsed {
            Some(n) if n.is_finite() => n.clamp(0.0, 100.0),
            _ => {
                warn!(journey, "Coverage target is not a number; using 0");
                0.0
            }
        }
    }
}

impl CujConfig {
    pub fn parse(contents: &str, format: ConfigFormat) -> Result<Self, String> {
        let file: CujConfigFile = parse_document(contents, format)?;
        let journeys = file
            .journeys
            .into_iter()
            .map(|entry| Cuj {
                name: entry.name.unwrap_or_else(|| entry.id.clone()),
                id: entry.id,
                components: entry.components,
                apis: entry.apis,
                acceptance: entry.acceptance,
            })
            .collect();
        let coverage_targets = file
            .coverage_targets
            .iter()
            .map(|(id, value)| (id.clone(), value.to_percent(id)))
            .collect();
        Ok(Self {
            product: file.product,
            journeys,
            coverage_targets,
        })
    }

    /// Load from `path`; a missing, unreadable or invalid file yields an empty config.
    pub fn load(path: &Path) -> Self {
        load_or_default(path, "CUJ", Self::parse)
    }

    pub fn with_target(mut self, journey_id: impl Into<String>, percent: f64) -> Self {
        self.coverage_targets
            .insert(journey_id.into(), percent.clamp(0.0, 100.0));
        self
    }

    /// Target for a journey as a fraction in `[0, 1]`; journeys without one target 0.
    pub fn target_fraction(&self, journey_id: &str) -> f64 {
        self.coverage_targets
            .get(journey_id)
            .map(|percent| percent / 100.0)
            .unwrap_or(0.0)
    }
}
