//! Run directories and their manifests.
//!
//! Layout of one run beneath the runs root:
//!
//! ```text
//! <runs_root>/<run_id>/
//!     manifest.json
//!     evidence/<category>.jsonl
//!     artifacts/
//! ```

use super::models::{Manifest, TargetMetadata, ToolStatus, ISO8601};
use crate::errors::{Error, IoResultExt, Result, ResultExt};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Second-resolution timestamp that also sorts lexicographically.
pub const RUN_ID_FORMAT: &str = "%Y%m%d_%H%M%SZ";

/// Environment variable overriding the default runs root.
pub const RUNS_DIR_ENV: &str = "RISKLEDGER_RUNS_DIR";

const MANIFEST_FILE: &str = "manifest.json";
const EVIDENCE_DIR: &str = "evidence";
const ARTIFACTS_DIR: &str = "artifacts";

/// Resolved locations of one run plus the manifest as it was when opened.
#[derive(Debug, Clone)]
pub struct RunHandle {
    pub run_id: String,
    pub run_dir: PathBuf,
    pub evidence_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    manifest: Manifest,
}

impl RunHandle {
    fn at(run_dir: PathBuf, manifest: Manifest) -> Self {
        Self {
            run_id: manifest.run_id.clone(),
            evidence_dir: run_dir.join(EVIDENCE_DIR),
            artifacts_dir: run_dir.join(ARTIFACTS_DIR),
            run_dir,
            manifest,
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.run_dir.join(MANIFEST_FILE)
    }

    /// Stream file backing an evidence category.
    pub fn stream_path(&self, category: &str) -> PathBuf {
        self.evidence_dir.join(format!("{category}.jsonl"))
    }

    /// Manifest snapshot taken when the handle was created or last reloaded.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Read the manifest currently on disk.
    pub fn read_manifest(&self) -> Result<Manifest> {
        read_manifest_file(&self.manifest_path())
    }

    /// Refresh the in-memory snapshot from disk.
    pub fn reload_manifest(&mut self) -> Result<&Manifest> {
        self.manifest = self.read_manifest()?;
        Ok(&self.manifest)
    }

    /// Read the on-disk manifest, apply `update`, and rewrite it wholesale.
    pub fn update_manifest<F>(&self, update: F) -> Result<Manifest>
    where
        F: FnOnce(&mut Manifest),
    {
        let mut manifest = self.read_manifest()?;
        update(&mut manifest);
        write_manifest_file(&self.manifest_path(), &manifest)?;
        Ok(manifest)
    }

    pub fn register_tool(&self, name: &str, status: ToolStatus) -> Result<()> {
        self.update_manifest(|m| m.register_tool(name, status))
            .map(|_| ())
    }

    pub fn add_diagnostic(&self, message: impl Into<String>) -> Result<()> {
        let message = message.into();
        self.update_manifest(|m| m.add_diagnostic(message))
            .map(|_| ())
    }
}

fn read_manifest_file(path: &Path) -> Result<Manifest> {
    let contents = fs::read_to_string(path).with_path("Failed to read manifest", path)?;
    let manifest: Manifest = serde_json::from_str(&contents)
        .map_err(Error::from)
        .context(format!("Failed to parse {}", path.display()))?;
    Ok(manifest.with_default_counts())
}

/// Write to a sibling temp file and rename over the manifest, so readers
/// never observe a half-written file.
fn write_manifest_file(path: &Path, manifest: &Manifest) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let payload = serde_json::to_string_pretty(manifest)?;
    {
        let mut file = File::create(&tmp).with_path("Failed to create manifest", &tmp)?;
        file.write_all(payload.as_bytes())
            .with_path("Failed to write manifest", &tmp)?;
        file.sync_all().with_path("Failed to sync manifest", &tmp)?;
    }
    fs::rename(&tmp, path).with_path("Failed to replace manifest", path)?;
    Ok(())
}

/// Creates and re-opens runs beneath a runs root.
#[derive(Debug, Clone)]
pub struct RunManager {
    base_dir: PathBuf,
}

impl RunManager {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).with_path("Failed to create runs root", &base_dir)?;
        Ok(Self { base_dir })
    }

    /// Manager over a runs root without creating it, for read-only access.
    pub(crate) fn existing(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Runs root from `RISKLEDGER_RUNS_DIR`, else `~/.riskledger/runs`.
    pub fn from_env() -> Result<Self> {
        Self::new(default_runs_root())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn create_run(
        &self,
        target_name: &str,
        target_path: &Path,
        git_metadata: Option<BTreeMap<String, String>>,
    ) -> Result<RunHandle> {
        self.create_run_at(target_name, target_path, git_metadata, Utc::now())
    }

    /// Like [`create_run`](Self::create_run) with an explicit clock reading.
    pub fn create_run_at(
        &self,
        target_name: &str,
        target_path: &Path,
        git_metadata: Option<BTreeMap<String, String>>,
        now: DateTime<Utc>,
    ) -> Result<RunHandle> {
        let (run_id, run_dir) = self.allocate_run_dir(now)?;
        for sub in [EVIDENCE_DIR, ARTIFACTS_DIR] {
            let dir = run_dir.join(sub);
            fs::create_dir(&dir).with_path("Failed to create run subdirectory", &dir)?;
        }

        let target = TargetMetadata {
            name: target_name.to_string(),
            path: target_path.display().to_string(),
            git: git_metadata.unwrap_or_default(),
        };
        let manifest = Manifest::new(&run_id, now.format(ISO8601).to_string(), target);
        write_manifest_file(&run_dir.join(MANIFEST_FILE), &manifest)?;

        info!(
            run_id = %run_id,
            run_dir = %run_dir.display(),
            "Created run directory; old runs are not pruned automatically"
        );
        Ok(RunHandle::at(run_dir, manifest))
    }

    /// Claim `<base>/<timestamp>[_NN]` with exclusive directory creation.
    fn allocate_run_dir(&self, now: DateTime<Utc>) -> Result<(String, PathBuf)> {
        let base = now.format(RUN_ID_FORMAT).to_string();
        let mut counter = 0u32;
        loop {
            let candidate = match counter {
                0 => base.clone(),
                n => format!("{base}_{n:02}"),
            };
            let run_dir = self.base_dir.join(&candidate);
            match fs::create_dir(&run_dir) {
                Ok(()) => return Ok((candidate, run_dir)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(candidate = %candidate, "Run id taken, trying next suffix");
                    counter += 1;
                }
                Err(e) => {
                    return Err(Error::file_system(
                        "Failed to create run directory",
                        run_dir,
                        e,
                    ))
                }
            }
        }
    }

    /// Re-open a run by id (relative to the runs root) or by absolute path.
    pub fn load_run(&self, run: impl AsRef<Path>) -> Result<RunHandle> {
        let run = run.as_ref();
        let run_dir = self.resolve_run_path(run);
        let manifest_path = run_dir.join(MANIFEST_FILE);
        if !run_dir.is_dir() || !manifest_path.is_file() {
            return Err(Error::RunNotFound {
                run: run.display().to_string(),
                path: run_dir,
            });
        }

        let mut manifest = read_manifest_file(&manifest_path)?;
        if manifest.run_id.is_empty() {
            manifest.run_id = run_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        Ok(RunHandle::at(run_dir, manifest))
    }

    /// Every run with a readable manifest, oldest first.
    pub fn list_runs(&self) -> Result<Vec<RunHandle>> {
        let entries =
            fs::read_dir(&self.base_dir).with_path("Failed to list runs root", &self.base_dir)?;
        let mut runs = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.join(MANIFEST_FILE).is_file() {
                continue;
            }
            match self.load_run(&path) {
                Ok(handle) => runs.push(handle),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable run"),
            }
        }
        runs.sort_by(|a, b| a.run_id.cmp(&b.run_id));
        Ok(runs)
    }

    fn resolve_run_path(&self, run: &Path) -> PathBuf {
        if run.is_absolute() {
            run.to_path_buf()
        } else {
            self.base_dir.join(run)
        }
    }
}

pub fn default_runs_root() -> PathBuf {
    match std::env::var_os(RUNS_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".riskledger")
            .join("runs"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::models::counts;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 24, 19, 30, 12).unwrap()
    }

    fn manager(tmp: &TempDir) -> RunManager {
        RunManager::new(tmp.path().join("runs")).unwrap()
    }

    #[test]
    fn create_run_lays_out_directories_and_manifest() {
        let tmp = TempDir::new().unwrap();
        let manager = manager(&tmp);
        let git = BTreeMap::from([("commit".to_string(), "abc123".to_string())]);
        let handle = manager
            .create_run_at("synthetic", Path::new("/repo"), Some(git), fixed_now())
            .unwrap();

        assert_eq!(handle.run_id, "20251024_193012Z");
        assert!(handle.evidence_dir.is_dir());
        assert!(handle.artifacts_dir.is_dir());

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(handle.manifest_path()).unwrap()).unwrap();
        assert_eq!(raw["run_id"], "20251024_193012Z");
        assert_eq!(raw["created_at"], "2025-10-24T19:30:12Z");
        assert_eq!(raw["target"]["name"], "synthetic");
        assert_eq!(raw["target"]["git"]["commit"], "abc123");
        assert_eq!(raw["counts"][counts::FINDINGS], 0);
        assert_eq!(raw["tools"], serde_json::json!({}));
    }

    #[test]
    fn runs_in_the_same_second_get_suffixes() {
        let tmp = TempDir::new().unwrap();
        let manager = manager(&tmp);
        let ids: Vec<String> = (0..3)
            .map(|_| {
                manager
                    .create_run_at("t", Path::new("/repo"), None, fixed_now())
                    .unwrap()
                    .run_id
            })
            .collect();
        assert_eq!(
            ids,
            vec![
                "20251024_193012Z".to_string(),
                "20251024_193012Z_01".to_string(),
                "20251024_193012Z_02".to_string(),
            ]
        );
    }

    #[test]
    fn load_run_round_trips_and_reports_missing() {
        let tmp = TempDir::new().unwrap();
        let manager = manager(&tmp);
        let created = manager
            .create_run_at("t", Path::new("/repo"), None, fixed_now())
            .unwrap();

        let by_id = manager.load_run(&created.run_id).unwrap();
        assert_eq!(by_id.run_dir, created.run_dir);
        assert_eq!(by_id.manifest(), created.manifest());

        let by_path = manager.load_run(&created.run_dir).unwrap();
        assert_eq!(by_path.run_id, created.run_id);

        let err = manager.load_run("20000101_000000Z").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn update_manifest_rewrites_wholesale() {
        let tmp = TempDir::new().unwrap();
        let manager = manager(&tmp);
        let mut handle = manager
            .create_run_at("t", Path::new("/repo"), None, fixed_now())
            .unwrap();

        handle
            .register_tool(
                "flake8",
                ToolStatus {
                    executed: true,
                    exit_code: Some(1),
                    ..ToolStatus::default()
                },
            )
            .unwrap();
        handle.add_diagnostic("flake8 reported issues").unwrap();

        assert!(handle.manifest().tools.is_empty());
        let manifest = handle.reload_manifest().unwrap();
        assert!(manifest.tools["flake8"].executed);
        assert_eq!(manifest.diagnostics, vec!["flake8 reported issues".to_string()]);
        assert!(!handle.run_dir.join("manifest.json.tmp").exists());
    }

    #[test]
    fn list_runs_is_sorted_and_skips_strays() {
        let tmp = TempDir::new().unwrap();
        let manager = manager(&tmp);
        let later = fixed_now() + chrono::Duration::seconds(5);
        manager
            .create_run_at("t", Path::new("/repo"), None, later)
            .unwrap();
        manager
            .create_run_at("t", Path::new("/repo"), None, fixed_now())
            .unwrap();
        fs::create_dir(manager.base_dir().join("not-a-run")).unwrap();

        let ids: Vec<String> = manager
            .list_runs()
            .unwrap()
            .into_iter()
            .map(|h| h.run_id)
            .collect();
        assert_eq!(ids, vec!["20251024_193012Z", "20251024_193017Z"]);
    }
}
