use crate::CoreError;
use autocov_runtime::{check_tools, CommandRunner, EnvOverlay, Invocation, MissingTool};
use autocov_schema::{CoverageSection, RunOptions};
use serde::Serialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;

/// Coverage decision for one run, taken once before the build.
///
/// Both the instrumentation flag and the report step read this value, so a
/// report is never attempted on an uninstrumented build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoveragePlan {
    Off,
    Unavailable(Vec<MissingTool>),
    Instrument,
}

impl CoveragePlan {
    pub fn decide(
        options: &RunOptions,
        coverage: &CoverageSection,
        search_path: Option<&OsStr>,
    ) -> Self {
        let missing = check_tools(&coverage.probe, search_path);
        match (options.coverage, missing.is_empty()) {
            (false, _) => Self::Off,
            (true, true) => Self::Instrument,
            (true, false) => Self::Unavailable(missing),
        }
    }

    pub fn instruments(&self) -> bool {
        matches!(self, Self::Instrument)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CoverageOutcome {
    NotRequested,
    ToolsMissing { missing: Vec<MissingTool> },
    Generated { report_dir: PathBuf },
    /// Coverage was instrumented but the run was interrupted before the
    /// report step.
    Interrupted,
}

/// Capture coverage data in `build_dir` and render the HTML report into
/// `invoker_dir`. Returns the report directory.
pub fn generate_report(
    runner: &dyn CommandRunner,
    build_dir: &Path,
    invoker_dir: &Path,
    coverage: &CoverageSection,
    overlay: &EnvOverlay,
) -> Result<PathBuf, CoreError> {
    let report_dir = invoker_dir.join(&coverage.output_dir);

    let capture = Invocation::new(&coverage.capture, build_dir)
        .args(["--capture", "--directory", ".", "--output-file"])
        .arg(&coverage.info_file)
        .env(overlay.clone());
    info!("capturing coverage data with `{capture}`");
    runner.run_checked(&capture)?;

    let report = Invocation::new(&coverage.report, build_dir)
        .arg(&coverage.info_file)
        .arg("--output-directory")
        .arg(&report_dir)
        .env(overlay.clone());
    info!("rendering coverage report with `{report}`");
    runner.run_checked(&report)?;

    Ok(report_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use autocov_runtime::MockRunner;
    use std::os::unix::fs::PermissionsExt;

    fn tool_dir(names: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            let path = dir.path().join(name);
            std::fs::write(&path, "#!/bin/sh\n").unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        dir
    }

    fn with_coverage() -> RunOptions {
        RunOptions {
            coverage: true,
            ..RunOptions::default()
        }
    }

    #[test]
    fn not_requested_is_off_even_with_tools() {
        let tools = tool_dir(&["lcov", "gcov"]);
        let search = tools.path().display().to_string();
        let plan = CoveragePlan::decide(
            &RunOptions::default(),
            &CoverageSection::default(),
            Some(OsStr::new(&search)),
        );
        assert_eq!(plan, CoveragePlan::Off);
        assert!(!plan.instruments());
    }

    #[test]
    fn requested_with_tools_instruments() {
        let tools = tool_dir(&["lcov", "gcov"]);
        let search = tools.path().display().to_string();
        let plan = CoveragePlan::decide(
            &with_coverage(),
            &CoverageSection::default(),
            Some(OsStr::new(&search)),
        );
        assert!(plan.instruments());
    }

    #[test]
    fn requested_without_gcov_is_unavailable() {
        let tools = tool_dir(&["lcov"]);
        let search = tools.path().display().to_string();
        let plan = CoveragePlan::decide(
            &with_coverage(),
            &CoverageSection::default(),
            Some(OsStr::new(&search)),
        );
        match plan {
            CoveragePlan::Unavailable(missing) => {
                assert_eq!(missing.len(), 1);
                assert_eq!(missing[0].name, "gcov");
            }
            other => panic!("unexpected plan: {other:?}"),
        }
    }

    #[test]
    fn report_runs_capture_then_genhtml() {
        let build = tempfile::tempdir().unwrap();
        let invoker = tempfile::tempdir().unwrap();
        let runner = MockRunner::new();

        let report_dir = generate_report(
            &runner,
            build.path(),
            invoker.path(),
            &CoverageSection::default(),
            &EnvOverlay::new(),
        )
        .unwrap();

        assert_eq!(report_dir, invoker.path().join("coverage-html"));
        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[0].to_string(),
            "lcov --capture --directory . --output-file gcov.info"
        );
        assert_eq!(
            calls[1].to_string(),
            format!(
                "genhtml gcov.info --output-directory {}",
                report_dir.display()
            )
        );
        assert!(calls.iter().all(|c| c.cwd() == build.path()));
    }

    #[test]
    fn capture_failure_stops_before_report() {
        let build = tempfile::tempdir().unwrap();
        let invoker = tempfile::tempdir().unwrap();
        let runner = MockRunner::new().with_exit("lcov", 1);

        let err = generate_report(
            &runner,
            build.path(),
            invoker.path(),
            &CoverageSection::default(),
            &EnvOverlay::new(),
        )
        .unwrap_err();

        assert!(err.is_command_failure());
        assert!(!runner.invoked("genhtml"));
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let outcome = CoverageOutcome::Generated {
            report_dir: PathBuf::from("/work/coverage-html"),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "generated");
        assert_eq!(json["report_dir"], "/work/coverage-html");
    }
}
