//! Run-scoped evidence store.
//!
//! A run owns a directory with a manifest and one append-only stream per
//! evidence category. [`RunManager`] allocates runs, [`EvidenceIdGenerator`]
//! mints ids, [`EvidenceWriter`] appends records and keeps manifest counters
//! in step, and [`EvidenceReader`] decodes streams back into typed records.

pub mod id_generator;
pub mod models;
pub mod reader;
pub mod run_manager;
pub mod writer;

pub use id_generator::{validate_run_id, EvidenceIdGenerator};
pub use models::{
    counter_key, counts, is_overall_component, utc_now, ApiRecord, ChurnRecord, CoverageRecord,
    EvidenceCategory, EvidenceRecord, FindingRecord, Manifest, Priority, RecommendationRecord,
    RiskDraft, RiskRecord, TargetMetadata, TestRecord, ToolStatus, OVERALL_COMPONENT,
};
pub use reader::EvidenceReader;
pub use run_manager::{default_runs_root, RunHandle, RunManager, RUNS_DIR_ENV, RUN_ID_FORMAT};
pub use writer::{EvidenceWriter, JsonlWriter};
