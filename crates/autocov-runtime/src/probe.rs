use serde::Serialize;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

/// A tool that is not resolvable on the search path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingTool {
    pub name: String,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

impl MissingTool {
    fn new(name: &str) -> Self {
        let (purpose, install_hint) = match name {
            "lcov" | "genhtml" => (
                "coverage capture and HTML reports",
                "zypper install lcov | apt install lcov | dnf install lcov | pacman -S lcov",
            ),
            "gcov" => (
                "per-file coverage data from gcc",
                "ships with gcc (apt install gcc | dnf install gcc | pacman -S gcc)",
            ),
            _ => ("required by the harness configuration", "install it and make sure it is on PATH"),
        };
        Self {
            name: name.to_owned(),
            purpose,
            install_hint,
        }
    }
}

/// Resolve `name` against `search_path` (a `PATH`-style list).
///
/// Names containing a `/` are checked as paths and not searched.
pub fn find_executable(name: &str, search_path: Option<&OsStr>) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    if name.contains('/') {
        let path = PathBuf::from(name);
        return is_executable(&path).then_some(path);
    }
    let search_path = search_path?;
    std::env::split_paths(search_path)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

/// Check every tool in `names`. An empty result means all are available.
pub fn check_tools<S: AsRef<str>>(names: &[S], search_path: Option<&OsStr>) -> Vec<MissingTool> {
    names
        .iter()
        .map(AsRef::<str>::as_ref)
        .filter(|name| find_executable(name, search_path).is_none())
        .map(MissingTool::new)
        .collect()
}

/// Format missing tools into the message shown when coverage is skipped.
pub fn format_missing(missing: &[MissingTool]) -> String {
    use fmt::Write as _;
    let mut msg = String::from("missing coverage tools:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\nCoverage information will not be generated.");
    msg
}

fn is_executable(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt as _;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}
