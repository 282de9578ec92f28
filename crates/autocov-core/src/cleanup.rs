use crate::CoreError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub build_dir_removed: bool,
    pub artifacts_removed: usize,
}

/// Owns the isolated build directory of one run.
///
/// Dropping the guard (including while an error propagates) removes the
/// directory and sweeps stray coverage artifacts from the tests directory.
/// `finish` does the same and returns what was cleaned. Failures are logged
/// and never returned, so they cannot mask the error that caused the unwind.
pub struct RunGuard {
    build_dir: Option<TempDir>,
    path: PathBuf,
    tests_dir: PathBuf,
    artifact_extensions: Vec<String>,
}

impl RunGuard {
    pub fn create(tests_dir: &Path, artifact_extensions: &[String]) -> Result<Self, CoreError> {
        let dir = tempfile::Builder::new().prefix("autocov-build-").tempdir()?;
        let path = dir.path().to_path_buf();
        debug!("created build directory {}", path.display());
        Ok(Self {
            build_dir: Some(dir),
            path,
            tests_dir: tests_dir.to_path_buf(),
            artifact_extensions: artifact_extensions.to_vec(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn finish(mut self) -> CleanupReport {
        self.release()
    }

    fn release(&mut self) -> CleanupReport {
        let mut report = CleanupReport::default();
        if let Some(dir) = self.build_dir.take() {
            match dir.close() {
                Ok(()) => {
                    debug!("removed build directory {}", self.path.display());
                    report.build_dir_removed = true;
                }
                Err(e) => warn!(
                    "failed to remove build directory {}: {e}",
                    self.path.display()
                ),
            }
        }
        report.artifacts_removed = sweep_artifacts(&self.tests_dir, &self.artifact_extensions);
        if report.artifacts_removed > 0 {
            info!(
                "cleaned up {} coverage artifact(s) in {}",
                report.artifacts_removed,
                self.tests_dir.display()
            );
        }
        report
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if self.build_dir.is_some() {
            let _ = self.release();
        }
    }
}

/// Delete regular files in `dir` (not recursively) whose extension is one of
/// `extensions`. Returns how many were removed.
pub fn sweep_artifacts(dir: &Path, extensions: &[String]) -> usize {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("cannot scan {} for coverage artifacts: {e}", dir.display());
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|e| e == ext));
        if !matches || !entry.file_type().is_ok_and(|t| t.is_file()) {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => warn!("failed to remove {}: {e}", path.display()),
        }
    }
    removed
}
