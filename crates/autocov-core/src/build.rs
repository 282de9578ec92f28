use crate::CoreError;
use autocov_runtime::{CommandRunner, EnvOverlay, EnvSnapshot, Invocation};
use autocov_schema::{BuildSection, ConfigError, RunOptions};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{debug, info};

pub const CFLAGS_VAR: &str = "CFLAGS";
pub const LIBRARY_PATH_VAR: &str = "LD_LIBRARY_PATH";

/// Libtool's uninstalled library directory inside the build tree.
const LIBTOOL_OUTPUT_DIR: &str = ".libs";
/// Where `make install` puts shared libraries under the prefix.
const INSTALLED_LIB_DIR: &str = "lib";

/// Compiler and linker flags appended to the caller's `CFLAGS`.
///
/// `instrument` must be the same decision the coverage step uses.
pub fn compose_cflags(
    build: &BuildSection,
    options: &RunOptions,
    instrument: bool,
    project_root: &Path,
    build_dir: &Path,
) -> Vec<String> {
    let mut flags: Vec<String> = build.defines.iter().map(|d| format!("-D{d}")).collect();
    flags.push(format!("-fvisibility={}", build.visibility));
    flags.push(format!(
        "-I{}",
        project_root.join(&build.include_dir).display()
    ));
    flags.push(format!(
        "-L{}",
        build_dir.join(LIBTOOL_OUTPUT_DIR).display()
    ));
    if options.package_tests {
        flags.push(format!("-l{}", build.archive_lib));
    }
    if instrument {
        flags.push("--coverage".to_owned());
    }
    flags
}

pub fn build_overlay(base: &EnvSnapshot, cflags: &[String]) -> EnvOverlay {
    EnvOverlay::new().with_appended(CFLAGS_VAR, base, cflags)
}

/// Extend the build overlay so spawned processes resolve the freshly
/// installed shared libraries before anything else.
pub fn runtime_overlay(build: EnvOverlay, base: &EnvSnapshot, build_dir: &Path) -> EnvOverlay {
    build.with_prepended_path(LIBRARY_PATH_VAR, base, &build_dir.join(INSTALLED_LIB_DIR))
}

/// Run `configure --prefix <build_dir>` followed by the install command,
/// both inside `build_dir`.
pub fn configure_and_install(
    runner: &dyn CommandRunner,
    project_root: &Path,
    build_dir: &Path,
    build: &BuildSection,
    overlay: &EnvOverlay,
) -> Result<(), CoreError> {
    debug!(
        "{CFLAGS_VAR}={}",
        overlay
            .get_os(CFLAGS_VAR)
            .map(OsStr::to_string_lossy)
            .unwrap_or_default()
    );

    let configure = Invocation::new(project_root.join(&build.configure), build_dir)
        .arg("--prefix")
        .arg(build_dir)
        .env(overlay.clone());
    info!("configuring into {}", build_dir.display());
    runner.run_checked(&configure)?;

    let install = Invocation::from_argv(&build.install, build_dir)
        .ok_or(ConfigError::EmptyField("build.install"))?
        .env(overlay.clone());
    info!("running `{install}`");
    runner.run_checked(&install)?;
    Ok(())
}
