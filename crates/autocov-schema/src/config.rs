use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File looked up in the tests directory when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "autocov.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("config field '{0}' must not be empty")]
    EmptyField(&'static str),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    #[serde(default)]
    pub build: BuildSection,
    #[serde(default)]
    pub test: TestSection,
    #[serde(default)]
    pub coverage: CoverageSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    /// Generated configure script, relative to the project root.
    #[serde(default = "default_configure")]
    pub configure: String,
    #[serde(default = "default_bootstrap")]
    pub bootstrap: Vec<String>,
    #[serde(default = "default_install")]
    pub install: Vec<String>,
    /// Preprocessor definitions passed as `-D<define>`.
    #[serde(default = "default_defines")]
    pub defines: Vec<String>,
    #[serde(default = "default_visibility")]
    pub visibility: String,
    /// Header directory, relative to the project root.
    #[serde(default = "default_include_dir")]
    pub include_dir: String,
    /// Library linked in when the archive-dependent tests are selected.
    #[serde(default = "default_archive_lib")]
    pub archive_lib: String,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            configure: default_configure(),
            bootstrap: default_bootstrap(),
            install: default_install(),
            defines: default_defines(),
            visibility: default_visibility(),
            include_dir: default_include_dir(),
            archive_lib: default_archive_lib(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TestSection {
    /// Test-execution program, resolved against the tests directory.
    #[serde(default = "default_test_program")]
    pub program: String,
}

impl Default for TestSection {
    fn default() -> Self {
        Self {
            program: default_test_program(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CoverageSection {
    /// Executables that must all be on PATH before instrumentation is enabled.
    #[serde(default = "default_probe")]
    pub probe: Vec<String>,
    #[serde(default = "default_capture")]
    pub capture: String,
    #[serde(default = "default_report")]
    pub report: String,
    #[serde(default = "default_info_file")]
    pub info_file: String,
    /// Report directory, created in the invoker's working directory.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_artifact_extensions")]
    pub artifact_extensions: Vec<String>,
}

impl Default for CoverageSection {
    fn default() -> Self {
        Self {
            probe: default_probe(),
            capture: default_capture(),
            report: default_report(),
            info_file: default_info_file(),
            output_dir: default_output_dir(),
            artifact_extensions: default_artifact_extensions(),
        }
    }
}

fn default_configure() -> String {
    "configure".to_owned()
}

fn default_bootstrap() -> Vec<String> {
    vec!["autoreconf".to_owned(), "-i".to_owned()]
}

fn default_install() -> Vec<String> {
    vec!["make".to_owned(), "install".to_owned()]
}

// A small arena increment makes the out-of-memory tests hit allocation
// failures outside the large arena too.
fn default_defines() -> Vec<String> {
    vec!["EVENTS_ARENA_INCREMENT=100".to_owned()]
}

fn default_visibility() -> String {
    "default".to_owned()
}

fn default_include_dir() -> String {
    "src/".to_owned()
}

fn default_archive_lib() -> String {
    "archive".to_owned()
}

fn default_test_program() -> String {
    "./support/test.py".to_owned()
}

fn default_probe() -> Vec<String> {
    vec!["lcov".to_owned(), "gcov".to_owned()]
}

fn default_capture() -> String {
    "lcov".to_owned()
}

fn default_report() -> String {
    "genhtml".to_owned()
}

fn default_info_file() -> String {
    "gcov.info".to_owned()
}

fn default_output_dir() -> String {
    "coverage-html".to_owned()
}

fn default_artifact_extensions() -> Vec<String> {
    vec!["gcda".to_owned(), "gcno".to_owned()]
}

impl HarnessConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.build.configure.trim().is_empty() {
            return Err(ConfigError::EmptyField("build.configure"));
        }
        if self.build.bootstrap.is_empty() {
            return Err(ConfigError::EmptyField("build.bootstrap"));
        }
        if self.build.install.is_empty() {
            return Err(ConfigError::EmptyField("build.install"));
        }
        if self.test.program.trim().is_empty() {
            return Err(ConfigError::EmptyField("test.program"));
        }
        if self.coverage.capture.trim().is_empty() {
            return Err(ConfigError::EmptyField("coverage.capture"));
        }
        if self.coverage.report.trim().is_empty() {
            return Err(ConfigError::EmptyField("coverage.report"));
        }
        if self.coverage.output_dir.trim().is_empty() {
            return Err(ConfigError::EmptyField("coverage.output_dir"));
        }
        Ok(())
    }
}

pub fn parse_config_str(input: &str) -> Result<HarnessConfig, ConfigError> {
    let config: HarnessConfig = toml::from_str(input)?;
    config.validate()?;
    Ok(config)
}

pub fn parse_config_file(path: impl AsRef<Path>) -> Result<HarnessConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Load the harness configuration.
///
/// An explicit path must exist. Without one, `autocov.toml` in the tests
/// directory is used when present, and built-in defaults otherwise.
pub fn load_config(explicit: Option<&Path>, tests_dir: &Path) -> Result<HarnessConfig, ConfigError> {
    if let Some(path) = explicit {
        return parse_config_file(path);
    }
    let candidate = tests_dir.join(CONFIG_FILE_NAME);
    if candidate.is_file() {
        parse_config_file(&candidate)
    } else {
        Ok(HarnessConfig::default())
    }
}
