pub mod completions;
pub mod doctor;
pub mod man_pages;
pub mod run;

use autocov_core::{HarnessPaths, NOT_RUN};
use std::path::Path;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
/// A toolchain failure stopped the run; `NOT_RUN` reduced to an exit byte.
pub const EXIT_NOT_RUN: u8 = NOT_RUN as u8;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

/// Map a test program status onto a process exit byte.
pub fn exit_byte(status: i32) -> u8 {
    u8::try_from(status).unwrap_or(EXIT_FAILURE)
}

pub fn colorize_status(status: i32) -> String {
    use console::Style;
    let text = status.to_string();
    if status == 0 {
        Style::new().green().apply_to(text).to_string()
    } else {
        Style::new().red().bold().apply_to(text).to_string()
    }
}

/// Resolve the harness directories against the current working directory.
pub fn resolve_paths(tests_dir: &Path, project_root: Option<&Path>) -> Result<HarnessPaths, String> {
    let invoker = std::env::current_dir()
        .map_err(|e| format!("cannot determine working directory: {e}"))?;
    HarnessPaths::resolve(tests_dir, project_root, &invoker).map_err(|e| {
        format!(
            "cannot resolve tests directory '{}' or its project root: {e}",
            tests_dir.display()
        )
    })
}
