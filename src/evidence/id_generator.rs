//! Evidence identifiers scoped to a single run.
//!
//! Ids look like `FND-20251024-0001`: an upper-cased prefix, the date stamp
//! taken from the run id, and a 1-based sequence kept per prefix. Counters
//! live only in the generator instance, so one instance must be threaded
//! through every writer of a run.
//!
//! Sequences are zero-padded to four digits and widen past 9999, so ids of
//! one prefix sort lexicographically only up to `-9999`; beyond that, order
//! by the numeric sequence.

use crate::errors::{Error, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

fn run_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{8})_\d{6}Z(?:_\d{2,})?$").expect("run id pattern is valid")
    })
}

/// Check a run id has the `YYYYMMDD_HHMMSSZ[_NN]` shape; returns its date stamp.
pub fn validate_run_id(run_id: &str) -> Result<&str> {
    run_id_pattern()
        .captures(run_id)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| Error::InvalidRunId(run_id.to_string()))
}

fn normalize_prefix(prefix: &str) -> Result<String> {
    if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Error::InvalidPrefix(prefix.to_string()));
    }
    Ok(prefix.to_ascii_uppercase())
}

/// Generate unique, sortable evidence ids for one run.
#[derive(Debug, Clone)]
pub struct EvidenceIdGenerator {
    run_id: String,
    date_stamp: String,
    counters: BTreeMap<String, u32>,
}

impl EvidenceIdGenerator {
    pub fn new(run_id: impl Into<String>) -> Result<Self> {
        let run_id = run_id.into();
        let date_stamp = validate_run_id(&run_id)?.to_string();
        Ok(Self {
            run_id,
            date_stamp,
            counters: BTreeMap::new(),
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Next id for `prefix`. Prefixes are case-insensitive and share a counter
    /// with their upper-cased form.
    pub fn next_id(&mut self, prefix: &str) -> Result<String> {
        let prefix = normalize_prefix(prefix)?;
        let counter = self.counters.entry(prefix.clone()).or_insert(0);
        *counter = counter
            .checked_add(1)
            .ok_or_else(|| Error::IdsExhausted(prefix.clone()))?;
        Ok(format!("{}-{}-{:04}", prefix, self.date_stamp, counter))
    }

    /// Raise a prefix's counter past an id that already exists in the run.
    ///
    /// Ids from another date stamp or with an unparseable shape are ignored.
    pub fn observe(&mut self, id: &str) {
        let mut parts = id.rsplitn(3, '-');
        let (Some(sequence), Some(date), Some(prefix)) = (parts.next(), parts.next(), parts.next())
        else {
            return;
        };
        if date != self.date_stamp {
            return;
        }
        let (Ok(prefix), Ok(sequence)) = (normalize_prefix(prefix), sequence.parse::<u32>()) else {
            return;
        };
        let counter = self.counters.entry(prefix).or_insert(0);
        *counter = (*counter).max(sequence);
    }

    /// Snapshot of the per-prefix counters.
    pub fn counters(&self) -> BTreeMap<String, u32> {
        self.counters.clone()
    }
}
