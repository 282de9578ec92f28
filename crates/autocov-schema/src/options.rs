use serde::{Deserialize, Serialize};

/// Per-run selection, fixed at invocation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Run the extended ("large") test subset.
    pub large_tests: bool,
    /// Run tests that depend on the archive-format library.
    pub package_tests: bool,
    /// Instrument the build and produce an HTML coverage report.
    pub coverage: bool,
}

impl RunOptions {
    /// Flags forwarded to the test program, in the harness's own vocabulary.
    pub fn test_args(&self) -> Vec<String> {
        [
            (self.large_tests, "--large_tests"),
            (self.package_tests, "--package_tests"),
            (self.coverage, "--coverage"),
        ]
        .into_iter()
        .filter_map(|(enabled, flag)| enabled.then(|| flag.to_owned()))
        .collect()
    }
}
