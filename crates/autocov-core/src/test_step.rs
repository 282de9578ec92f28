use crate::CoreError;
use autocov_runtime::{CommandRunner, EnvOverlay, Invocation};
use autocov_schema::{RunOptions, TestSection};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Run the test program in `tests_dir` and return its exit status.
///
/// A non-zero status is a result, not an error; only a program that cannot
/// be started fails here.
pub fn run_test_program(
    runner: &dyn CommandRunner,
    tests_dir: &Path,
    test: &TestSection,
    options: &RunOptions,
    overlay: &EnvOverlay,
) -> Result<i32, CoreError> {
    let invocation = Invocation::new(resolve_program(tests_dir, &test.program), tests_dir)
        .args(options.test_args())
        .env(overlay.clone());
    info!("running `{invocation}`");

    let status = runner.status(&invocation)?;
    if status == 0 {
        info!("test program passed");
    } else {
        warn!("test program exited with status {status}");
    }
    Ok(status)
}

// Relative paths such as `./support/test.py` are anchored at the tests
// directory; bare names are left for PATH lookup.
fn resolve_program(tests_dir: &Path, program: &str) -> PathBuf {
    let path = Path::new(program);
    if path.is_relative() && program.contains('/') {
        tests_dir.join(path)
    } else {
        path.to_path_buf()
    }
}
