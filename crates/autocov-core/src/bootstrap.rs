use crate::CoreError;
use autocov_runtime::{CommandRunner, Invocation};
use autocov_schema::{BuildSection, ConfigError};
use std::path::Path;
use tracing::{debug, info};

/// Generate the configure script with the bootstrap command unless it is
/// already present. Returns whether the bootstrap command ran.
///
/// The command runs with `project_root` as its working directory; the
/// harness's own working directory is never changed.
pub fn bootstrap_if_needed(
    runner: &dyn CommandRunner,
    project_root: &Path,
    build: &BuildSection,
) -> Result<bool, CoreError> {
    let configure = project_root.join(&build.configure);
    if configure.is_file() {
        debug!("found {}, skipping bootstrap", configure.display());
        return Ok(false);
    }

    let invocation = Invocation::from_argv(&build.bootstrap, project_root)
        .ok_or(ConfigError::EmptyField("build.bootstrap"))?;
    info!(
        "no '{}' script in {}",
        build.configure,
        project_root.display()
    );
    info!("running `{invocation}` to generate it");
    runner.run_checked(&invocation)?;
    Ok(true)
}
