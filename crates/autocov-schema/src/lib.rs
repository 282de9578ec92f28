//! Configuration layer for autocov.
//!
//! This crate defines the optional `autocov.toml` harness configuration
//! (`HarnessConfig`) with defaults for every tool and path the orchestration
//! touches, and the immutable per-run selection of test subsets and coverage
//! (`RunOptions`).

pub mod config;
pub mod options;

pub use config::{
    load_config, parse_config_file, parse_config_str, BuildSection, ConfigError, CoverageSection,
    HarnessConfig, TestSection, CONFIG_FILE_NAME,
};
pub use options::RunOptions;
