//! Configuration inputs for the analysis stages.
//!
//! Both configs are optional: a missing file means defaults, and a file
//! that cannot be read or parsed is reported with a warning and replaced by
//! defaults so an analysis run never aborts over configuration.

pub mod cuj;
mod loader;
pub mod risk;

pub use cuj::{Cuj, CujConfig};
pub use loader::{parse_document, ConfigFormat};
pub use risk::{default_bands, default_max_total, RiskBand, RiskConfig, RiskWeights};
