//! Orchestration engine for autocov.
//!
//! `Harness::run` performs one isolated out-of-tree build of an autotools
//! project: bootstrap the configure script if needed, configure and install
//! into a fresh temporary directory with an additive `CFLAGS` overlay, run
//! the test program against the installed libraries, optionally render an
//! lcov HTML report, and clean up on every exit path through `RunGuard`.

pub mod bootstrap;
pub mod build;
pub mod cleanup;
pub mod concurrency;
pub mod coverage;
pub mod harness;
pub mod test_step;

pub use bootstrap::bootstrap_if_needed;
pub use build::{compose_cflags, CFLAGS_VAR, LIBRARY_PATH_VAR};
pub use cleanup::{sweep_artifacts, CleanupReport, RunGuard};
pub use concurrency::{install_signal_handler, shutdown_requested, RunLock};
pub use coverage::{CoverageOutcome, CoveragePlan};
pub use harness::{Harness, HarnessPaths, RunOutcome, NOT_RUN};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("config error: {0}")]
    Config(#[from] autocov_schema::ConfigError),
    #[error("toolchain failure: {0}")]
    Runtime(#[from] autocov_runtime::RuntimeError),
    #[error("another run is already in progress for {0}")]
    Busy(String),
    #[error("interrupted")]
    Interrupted,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// True for a non-zero exit of an external tool (or one that could not
    /// be started), as opposed to harness-internal failures.
    pub fn is_command_failure(&self) -> bool {
        matches!(
            self,
            Self::Runtime(autocov_runtime::RuntimeError::CommandFailed { .. })
        )
    }
}
