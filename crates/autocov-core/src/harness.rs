use crate::bootstrap::bootstrap_if_needed;
use crate::build::{build_overlay, compose_cflags, configure_and_install, runtime_overlay};
use crate::cleanup::{CleanupReport, RunGuard};
use crate::concurrency::{shutdown_requested, RunLock};
use crate::coverage::{generate_report, CoverageOutcome, CoveragePlan};
use crate::test_step::run_test_program;
use crate::CoreError;
use autocov_runtime::{format_missing, CommandRunner, EnvOverlay, EnvSnapshot};
use autocov_schema::{HarnessConfig, RunOptions};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Orchestration result when the test program never ran.
pub const NOT_RUN: i32 = -1;

/// Directories one run works against, resolved to absolute paths up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessPaths {
    /// Top of the autotools source tree.
    pub project_root: PathBuf,
    /// Directory holding the test program; swept for coverage artifacts.
    pub tests_dir: PathBuf,
    /// Working directory of the invoking process; receives the report.
    pub invoker_dir: PathBuf,
}

impl HarnessPaths {
    /// Relative inputs are taken against `invoker_dir`. Without an explicit
    /// project root, the tests directory's parent is used.
    pub fn resolve(
        tests_dir: &Path,
        project_root: Option<&Path>,
        invoker_dir: &Path,
    ) -> Result<Self, CoreError> {
        let tests_dir = invoker_dir.join(tests_dir).canonicalize()?;
        let project_root = match project_root {
            Some(root) => invoker_dir.join(root).canonicalize()?,
            None => tests_dir.join("..").canonicalize()?,
        };
        Ok(Self {
            project_root,
            tests_dir,
            invoker_dir: invoker_dir.to_path_buf(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    /// Exit status of the test program.
    pub status: i32,
    pub options: RunOptions,
    pub bootstrapped: bool,
    pub coverage: CoverageOutcome,
    pub cleanup: CleanupReport,
}

impl RunOutcome {
    pub fn passed(&self) -> bool {
        self.status == 0
    }
}

/// One configured harness. `run` may be called repeatedly; each call gets
/// its own build directory.
pub struct Harness<'a> {
    config: &'a HarnessConfig,
    paths: &'a HarnessPaths,
    env: &'a EnvSnapshot,
    runner: &'a dyn CommandRunner,
}

impl<'a> Harness<'a> {
    pub fn new(
        config: &'a HarnessConfig,
        paths: &'a HarnessPaths,
        env: &'a EnvSnapshot,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        Self {
            config,
            paths,
            env,
            runner,
        }
    }

    /// Bootstrap, build, test and optionally report coverage.
    ///
    /// Toolchain failures abort the run with an error; a failing test
    /// program is reported through `RunOutcome::status`. The build
    /// directory is removed on every path.
    pub fn run(&self, options: RunOptions) -> Result<RunOutcome, CoreError> {
        let _lock = RunLock::acquire(&self.paths.project_root)?;
        let guard = RunGuard::create(
            &self.paths.tests_dir,
            &self.config.coverage.artifact_extensions,
        )?;
        let build_dir = guard.path().to_path_buf();
        debug!("options: {options:?}, build directory: {}", build_dir.display());

        let bootstrapped =
            bootstrap_if_needed(self.runner, &self.paths.project_root, &self.config.build)?;
        check_interrupt()?;

        let plan =
            CoveragePlan::decide(&options, &self.config.coverage, self.env.get_os("PATH"));
        let cflags = compose_cflags(
            &self.config.build,
            &options,
            plan.instruments(),
            &self.paths.project_root,
            &build_dir,
        );
        let build_env = build_overlay(self.env, &cflags);
        configure_and_install(
            self.runner,
            &self.paths.project_root,
            &build_dir,
            &self.config.build,
            &build_env,
        )?;
        check_interrupt()?;

        let runtime_env = runtime_overlay(build_env, self.env, &build_dir);
        let status = run_test_program(
            self.runner,
            &self.paths.tests_dir,
            &self.config.test,
            &options,
            &runtime_env,
        )?;

        // The test status is recorded; an interrupt from here on only
        // skips the report.
        let coverage =
            self.coverage_step(plan, &build_dir, &runtime_env, shutdown_requested())?;

        let cleanup = guard.finish();
        Ok(RunOutcome {
            status,
            options,
            bootstrapped,
            coverage,
            cleanup,
        })
    }

    fn coverage_step(
        &self,
        plan: CoveragePlan,
        build_dir: &Path,
        runtime_env: &EnvOverlay,
        interrupted: bool,
    ) -> Result<CoverageOutcome, CoreError> {
        match plan {
            CoveragePlan::Off => Ok(CoverageOutcome::NotRequested),
            CoveragePlan::Unavailable(missing) => {
                info!("{}", format_missing(&missing));
                Ok(CoverageOutcome::ToolsMissing { missing })
            }
            CoveragePlan::Instrument if interrupted => {
                warn!("interrupted, skipping the coverage report");
                Ok(CoverageOutcome::Interrupted)
            }
            CoveragePlan::Instrument => {
                let report_dir = generate_report(
                    self.runner,
                    build_dir,
                    &self.paths.invoker_dir,
                    &self.config.coverage,
                    runtime_env,
                )?;
                info!("coverage report written to {}", report_dir.display());
                Ok(CoverageOutcome::Generated { report_dir })
            }
        }
    }
}

fn check_interrupt() -> Result<(), CoreError> {
    if shutdown_requested() {
        Err(CoreError::Interrupted)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autocov_runtime::MockRunner;

    #[test]
    fn resolve_defaults_project_root_to_parent() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("tests")).unwrap();

        let paths = HarnessPaths::resolve(Path::new("tests"), None, root.path()).unwrap();

        let canonical_root = root.path().canonicalize().unwrap();
        assert_eq!(paths.project_root, canonical_root);
        assert_eq!(paths.tests_dir, canonical_root.join("tests"));
        assert_eq!(paths.invoker_dir, root.path());
    }

    #[test]
    fn resolve_honors_explicit_root() {
        let root = tempfile::tempdir().unwrap();
        let tests = tempfile::tempdir().unwrap();

        let paths = HarnessPaths::resolve(tests.path(), Some(root.path()), tests.path()).unwrap();

        assert_eq!(paths.project_root, root.path().canonicalize().unwrap());
    }

    #[test]
    fn resolve_rejects_missing_tests_dir() {
        let root = tempfile::tempdir().unwrap();
        assert!(matches!(
            HarnessPaths::resolve(Path::new("missing"), None, root.path()),
            Err(CoreError::Io(_))
        ));
    }

    fn harness_fixture() -> (tempfile::TempDir, HarnessPaths) {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("tests")).unwrap();
        let paths = HarnessPaths::resolve(Path::new("tests"), None, root.path()).unwrap();
        (root, paths)
    }

    #[test]
    fn interrupt_after_tests_skips_only_the_report() {
        let (root, paths) = harness_fixture();
        let config = HarnessConfig::default();
        let env = EnvSnapshot::default();
        let runner = MockRunner::new();
        let harness = Harness::new(&config, &paths, &env, &runner);

        let coverage = harness
            .coverage_step(
                CoveragePlan::Instrument,
                root.path(),
                &EnvOverlay::new(),
                true,
            )
            .unwrap();

        assert_eq!(coverage, CoverageOutcome::Interrupted);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn uninterrupted_instrumented_run_writes_report() {
        let (root, paths) = harness_fixture();
        let config = HarnessConfig::default();
        let env = EnvSnapshot::default();
        let runner = MockRunner::new();
        let harness = Harness::new(&config, &paths, &env, &runner);

        let coverage = harness
            .coverage_step(
                CoveragePlan::Instrument,
                root.path(),
                &EnvOverlay::new(),
                false,
            )
            .unwrap();

        assert!(matches!(coverage, CoverageOutcome::Generated { .. }));
        assert_eq!(runner.programs(), vec!["lcov", "genhtml"]);
    }

    #[test]
    fn outcome_passed_only_on_zero() {
        let mut outcome = RunOutcome {
            status: 0,
            options: RunOptions::default(),
            bootstrapped: false,
            coverage: CoverageOutcome::NotRequested,
            cleanup: CleanupReport::default(),
        };
        assert!(outcome.passed());
        outcome.status = 1;
        assert!(!outcome.passed());
        assert_ne!(NOT_RUN, 0);
    }
}
