mod commands;

use autocov_core::install_signal_handler;
use autocov_schema::RunOptions;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use commands::EXIT_FAILURE;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "autocov",
    version,
    about = "Build an autotools project out of tree, run its tests against the fresh build, and report coverage"
)]
struct Cli {
    #[command(flatten)]
    run: RunArgs,

    /// Directory holding the test program (swept for coverage artifacts).
    #[arg(long, default_value = ".", global = true)]
    tests_dir: PathBuf,

    /// Top of the source tree. Defaults to the parent of --tests-dir.
    #[arg(long, global = true)]
    project_root: Option<PathBuf>,

    /// Harness config file. Defaults to autocov.toml in --tests-dir, if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Test selection, forwarded to the test program under the same names.
#[derive(Debug, Clone, Copy, Args)]
struct RunArgs {
    /// Run the extended ("large") test subset.
    #[arg(long = "large_tests", visible_alias = "large-tests")]
    large_tests: bool,
    /// Link the archive library and run the tests that need it.
    #[arg(long = "package_tests", visible_alias = "package-tests")]
    package_tests: bool,
    /// Instrument the build and write an HTML report to ./coverage-html.
    #[arg(long)]
    coverage: bool,
}

impl From<RunArgs> for RunOptions {
    fn from(args: RunArgs) -> Self {
        Self {
            large_tests: args.large_tests,
            package_tests: args.package_tests,
            coverage: args.coverage,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check that the tools and files a run needs are in place.
    Doctor,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("AUTOCOV_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Some(Commands::Completions { shell }) => commands::completions::run::<Cli>(shell),
        Some(Commands::ManPages { dir }) => commands::man_pages::run::<Cli>(&dir),
        Some(Commands::Doctor) => commands::resolve_paths(&cli.tests_dir, cli.project_root.as_deref())
            .and_then(|paths| commands::doctor::run(&paths, cli.config.as_deref(), cli.json)),
        None => {
            install_signal_handler();
            commands::resolve_paths(&cli.tests_dir, cli.project_root.as_deref()).and_then(
                |paths| {
                    commands::run::run(&paths, cli.config.as_deref(), cli.run.into(), cli.json)
                },
            )
        }
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
