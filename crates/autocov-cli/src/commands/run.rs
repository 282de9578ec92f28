use super::{colorize_status, exit_byte, json_pretty, EXIT_FAILURE, EXIT_NOT_RUN};
use autocov_core::{CoreError, CoverageOutcome, Harness, HarnessPaths, RunOutcome};
use autocov_runtime::{EnvSnapshot, SystemRunner};
use autocov_schema::{load_config, RunOptions};
use std::path::Path;

pub fn run(
    paths: &HarnessPaths,
    config_path: Option<&Path>,
    options: RunOptions,
    json: bool,
) -> Result<u8, String> {
    let config = load_config(config_path, &paths.tests_dir).map_err(|e| format!("config error: {e}"))?;
    let env = EnvSnapshot::capture();
    let runner = SystemRunner::new();

    let outcome = match Harness::new(&config, paths, &env, &runner).run(options) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(error_exit_code(&e));
        }
    };

    if json {
        println!("{}", json_pretty(&outcome)?);
    } else {
        print_summary(&outcome);
    }
    Ok(exit_byte(outcome.status))
}

/// Configuration problems are usage errors; anything else that stops the
/// orchestration means the tests never produced a status.
fn error_exit_code(err: &CoreError) -> u8 {
    match err {
        CoreError::Config(_) => EXIT_FAILURE,
        CoreError::Runtime(_) | CoreError::Busy(_) | CoreError::Interrupted | CoreError::Io(_) => {
            EXIT_NOT_RUN
        }
    }
}

fn print_summary(outcome: &RunOutcome) {
    if outcome.passed() {
        println!("test program passed (status {})", colorize_status(outcome.status));
    } else {
        println!("test program failed (status {})", colorize_status(outcome.status));
    }
    match &outcome.coverage {
        CoverageOutcome::NotRequested => {}
        CoverageOutcome::Generated { report_dir } => {
            println!("coverage report: {}", report_dir.display());
        }
        CoverageOutcome::Interrupted => println!("coverage report skipped: interrupted"),
        CoverageOutcome::ToolsMissing { missing } => {
            let names: Vec<_> = missing.iter().map(|m| m.name.as_str()).collect();
            println!("coverage report skipped: missing {}", names.join(", "));
        }
    }
    if outcome.cleanup.artifacts_removed > 0 {
        println!(
            "removed {} stray coverage artifact(s)",
            outcome.cleanup.artifacts_removed
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autocov_schema::ConfigError;

    #[test]
    fn orchestration_errors_exit_not_run() {
        let busy = CoreError::Busy("/src/proj".to_owned());
        let io = CoreError::Io(std::io::Error::other("no space left"));
        assert_eq!(error_exit_code(&busy), EXIT_NOT_RUN);
        assert_eq!(error_exit_code(&io), EXIT_NOT_RUN);
        assert_eq!(error_exit_code(&CoreError::Interrupted), EXIT_NOT_RUN);
    }

    #[test]
    fn config_errors_exit_failure() {
        let err = CoreError::Config(ConfigError::EmptyField("test.program"));
        assert_eq!(error_exit_code(&err), EXIT_FAILURE);
    }
}
