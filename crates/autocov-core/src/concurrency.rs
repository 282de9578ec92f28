use crate::CoreError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Advisory lock held for the duration of one run against a project root.
pub struct RunLock {
    lock_file: File,
    path: PathBuf,
}

impl RunLock {
    /// Lock file for `project_root`, in the system temp directory so the
    /// source tree stays clean.
    pub fn lock_path(project_root: &Path) -> PathBuf {
        let digest = blake3::hash(project_root.as_os_str().as_encoded_bytes()).to_hex();
        std::env::temp_dir().join(format!("autocov-run-{}.lock", &digest.as_str()[..16]))
    }

    /// Take the lock without waiting; a held lock is `CoreError::Busy`.
    pub fn acquire(project_root: &Path) -> Result<Self, CoreError> {
        Self::acquire_at(&Self::lock_path(project_root), project_root)
    }

    fn acquire_at(lock_path: &Path, project_root: &Path) -> Result<Self, CoreError> {
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(lock_path)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                lock_file: file,
                path: lock_path.to_path_buf(),
            }),
            Err(_) => Err(CoreError::Busy(project_root.display().to_string())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = self.lock_file.unlock();
    }
}

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Keep the harness alive on the first Ctrl-C so the running child gets the
/// interrupt and cleanup still happens; a second Ctrl-C exits at once.
pub fn install_signal_handler() {
    let _ = ctrlc::set_handler(move || {
        if SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
            std::process::exit(130);
        }
        SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
        eprintln!("\ninterrupt received, cleaning up after the current command...");
    });
}

pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}
