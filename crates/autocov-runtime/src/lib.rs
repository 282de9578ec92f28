//! Execution layer for autocov.
//!
//! Every external tool the harness drives (bootstrap, configure, install, the
//! test program, coverage capture and report) is described as an
//! `Invocation`: an argument vector, an explicit working directory and an
//! additive `EnvOverlay`. Invocations go through the `CommandRunner` trait,
//! with the real `SystemRunner` and a recording `MockRunner` for tests. The
//! `probe` module answers whether tools are resolvable on PATH.

pub mod command;
pub mod env;
pub mod mock;
pub mod probe;

pub use command::{CommandRunner, Invocation, SystemRunner};
pub use env::{EnvOverlay, EnvSnapshot};
pub use mock::MockRunner;
pub use probe::{check_tools, find_executable, format_missing, MissingTool};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("command `{command}` failed: {reason}")]
    CommandFailed { command: String, reason: String },
}
