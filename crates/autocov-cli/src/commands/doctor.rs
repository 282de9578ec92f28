use super::{json_pretty, EXIT_FAILURE, EXIT_SUCCESS};
use autocov_core::HarnessPaths;
use autocov_runtime::{check_tools, find_executable, format_missing, EnvSnapshot};
use autocov_schema::{load_config, HarnessConfig};
use std::ffi::OsStr;
use std::path::Path;

pub fn run(paths: &HarnessPaths, config_path: Option<&Path>, json_output: bool) -> Result<u8, String> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;

    let config = match load_config(config_path, &paths.tests_dir) {
        Ok(config) => {
            checks.push(Check::pass("config", "Harness configuration valid"));
            config
        }
        Err(e) => {
            checks.push(Check::fail("config", &format!("Invalid configuration: {e}")));
            return print_results(&checks, false, json_output);
        }
    };

    let env = EnvSnapshot::capture();
    let search_path = env.get_os("PATH");

    check_configure(paths, &config, search_path, &mut checks, &mut all_pass);
    check_install_tool(&config, search_path, &mut checks, &mut all_pass);
    check_test_program(paths, &config, search_path, &mut checks, &mut all_pass);
    check_coverage_tools(&config, search_path, &mut checks);

    print_results(&checks, all_pass, json_output)
}

fn check_configure(
    paths: &HarnessPaths,
    config: &HarnessConfig,
    search_path: Option<&OsStr>,
    checks: &mut Vec<Check>,
    all_pass: &mut bool,
) {
    let configure = paths.project_root.join(&config.build.configure);
    if configure.is_file() {
        checks.push(Check::pass(
            "configure",
            &format!("Found {}", configure.display()),
        ));
        return;
    }
    let bootstrap = config.build.bootstrap.join(" ");
    let tool = config.build.bootstrap.first().map_or("", String::as_str);
    if find_executable(tool, search_path).is_some() {
        checks.push(Check::info(
            "configure",
            &format!("No configure script yet (will run `{bootstrap}`)"),
        ));
    } else {
        *all_pass = false;
        checks.push(Check::fail(
            "configure",
            &format!("No configure script and `{tool}` is not on PATH"),
        ));
    }
}

fn check_install_tool(
    config: &HarnessConfig,
    search_path: Option<&OsStr>,
    checks: &mut Vec<Check>,
    all_pass: &mut bool,
) {
    let tool = config.build.install.first().map_or("", String::as_str);
    if find_executable(tool, search_path).is_some() {
        checks.push(Check::pass("install", &format!("`{tool}` is available")));
    } else {
        *all_pass = false;
        checks.push(Check::fail("install", &format!("`{tool}` is not on PATH")));
    }
}

fn check_test_program(
    paths: &HarnessPaths,
    config: &HarnessConfig,
    search_path: Option<&OsStr>,
    checks: &mut Vec<Check>,
    all_pass: &mut bool,
) {
    let program = &config.test.program;
    let found = if program.contains('/') {
        let path = paths.tests_dir.join(program);
        find_executable(&path.to_string_lossy(), search_path).is_some()
    } else {
        find_executable(program, search_path).is_some()
    };
    if found {
        checks.push(Check::pass("test_program", &format!("Found test program {program}")));
    } else {
        *all_pass = false;
        checks.push(Check::fail(
            "test_program",
            &format!(
                "Test program {program} not found or not executable in {}",
                paths.tests_dir.display()
            ),
        ));
    }
}

// Missing coverage tools only disable --coverage, so this never fails.
fn check_coverage_tools(config: &HarnessConfig, search_path: Option<&OsStr>, checks: &mut Vec<Check>) {
    let missing = check_tools(&config.coverage.probe, search_path);
    if missing.is_empty() {
        checks.push(Check::pass(
            "coverage_tools",
            &format!("Coverage tools available ({})", config.coverage.probe.join(", ")),
        ));
    } else {
        checks.push(Check::warn("coverage_tools", &format_missing(&missing)));
    }
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, String> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status,
                "message": c.message,
            })).collect::<Vec<_>>(),
        });
        println!("{}", json_pretty(&json)?);
    } else {
        println!("autocov doctor\n");
        for check in checks {
            let icon = match check.status {
                "pass" => "✓",
                "fail" => "✗",
                "warn" => "⚠",
                _ => "ℹ",
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

struct Check {
    name: &'static str,
    status: &'static str,
    message: String,
}

impl Check {
    fn new(name: &'static str, status: &'static str, message: &str) -> Self {
        Self {
            name,
            status,
            message: message.to_owned(),
        }
    }

    fn pass(name: &'static str, message: &str) -> Self {
        Self::new(name, "pass", message)
    }

    fn fail(name: &'static str, message: &str) -> Self {
        Self::new(name, "fail", message)
    }

    fn warn(name: &'static str, message: &str) -> Self {
        Self::new(name, "warn", message)
    }

    fn info(name: &'static str, message: &str) -> Self {
        Self::new(name, "info", message)
    }
}
