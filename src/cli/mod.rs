//! CLI module for the imake conformance harness
//!
//! ## Commands
//!
//! - `run` - build, fetch, wire and run the regression suite (default)
//! - `fetch` - prepare the corpus workspace only
//! - `plan [--json]` - show what `run` would change in the workspace
//! - `clean` - reap leftover test processes and reset the transient artifact
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

use crate::config::HarnessConfig;
use crate::version::CTS_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Conformance-test harness for imake
#[derive(Parser, Debug)]
#[command(name = "imake-cts")]
#[command(version = CTS_VERSION)]
#[command(about = "Run the GNU make regression suite against imake", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub options: HarnessArgs,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Build the candidate, prepare the corpus and run the regression suite
    Run,

    /// Fetch and unpack the corpus without building or testing
    Fetch,

    /// Show the workspace state and the actions `run` would take
    Plan {
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reap leftover test processes and remove the transient artifact
    Clean,
}

/// Options shared by every command. Unset options keep their defaults.
#[derive(Args, Debug, Default)]
pub struct HarnessArgs {
    /// Project root where the build runs
    #[arg(long, value_name = "DIR", global = true)]
    pub project_root: Option<PathBuf>,

    /// Workspace directory for archives and corpora (default: cts)
    #[arg(long, value_name = "DIR", global = true)]
    pub workspace: Option<PathBuf>,

    /// Corpus release to test against (default: 4.3)
    #[arg(long, value_name = "VERSION", global = true)]
    pub corpus_version: Option<String>,

    /// Base URL the corpus archive is fetched from
    #[arg(long, value_name = "URL", global = true)]
    pub mirror: Option<String>,

    /// Harness link target, relative to the corpus directory (default: the project's target/debug/imake)
    #[arg(long, value_name = "PATH", global = true)]
    pub candidate: Option<PathBuf>,

    /// HTTP client used to fetch the corpus (default: wget)
    #[arg(long, value_name = "PROG", global = true)]
    pub fetch_tool: Option<String>,

    /// Program driving the corpus Makefile (default: make)
    #[arg(long, value_name = "PROG", global = true)]
    pub test_driver: Option<String>,

    /// Process name reaped after the run (default: make)
    #[arg(long, value_name = "NAME", global = true)]
    pub reap_name: Option<String>,

    /// Do not build the candidate before testing
    #[arg(long, global = true)]
    pub skip_build: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl HarnessArgs {
    /// Overlay the given options on the default configuration.
    pub fn to_config(&self) -> HarnessConfig {
        let mut config = HarnessConfig::default().with_skip_build(self.skip_build);
        if let Some(root) = &self.project_root {
            config = config.with_project_root(root);
        }
        if let Some(dir) = &self.workspace {
            config = config.with_workspace_dir(dir);
        }
        if let Some(version) = &self.corpus_version {
            config = config.with_corpus_version(version);
        }
        if let Some(mirror) = &self.mirror {
            config = config.with_mirror(mirror);
        }
        if let Some(candidate) = &self.candidate {
            config = config.with_candidate(candidate);
        }
        if let Some(tool) = &self.fetch_tool {
            config = config.with_fetch_tool(tool);
        }
        if let Some(driver) = &self.test_driver {
            config = config.with_test_driver(driver);
        }
        if let Some(name) = &self.reap_name {
            config = config.with_reap_name(name);
        }
        config
    }
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();
    init_tracing(cli.options.verbose);

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Initialize structured logging with env-based filter, defaulting to info (debug when verbose).
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .try_init();
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    let config = cli.options.to_config();
    let verbose = cli.options.verbose;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => commands::run_workflow(&config, verbose),
        Command::Fetch => commands::fetch_corpus(&config, verbose),
        Command::Plan { json } => commands::show_plan(&config, json),
        Command::Clean => commands::clean_workspace(&config, verbose),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_to_run() {
        let cli = Cli::try_parse_from(["imake-cts"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.options.to_config(), HarnessConfig::default());
    }

    #[test]
    fn test_cli_parse_plan_json() {
        let cli = Cli::try_parse_from(["imake-cts", "plan", "--json"]).unwrap();
        assert_eq!(cli.command, Some(Command::Plan { json: true }));
    }

    #[test]
    fn test_cli_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "imake-cts",
            "run",
            "--candidate",
            "/usr/bin/make",
            "--corpus-version",
            "4.2.1",
            "--skip-build",
        ])
        .unwrap();
        let config = cli.options.to_config();

        assert_eq!(config.candidate, Some(PathBuf::from("/usr/bin/make")));
        assert_eq!(config.corpus_version, "4.2.1");
        assert!(config.skip_build);
        assert_eq!(config.fetch_tool, "wget");
    }

    #[test]
    fn test_cli_parse_clean_and_fetch() {
        let cli = Cli::try_parse_from(["imake-cts", "clean", "--reap-name", "imake"]).unwrap();
        assert_eq!(cli.command, Some(Command::Clean));
        assert_eq!(cli.options.to_config().reap_name, "imake");

        let cli = Cli::try_parse_from(["imake-cts", "-v", "fetch", "--workspace", "/tmp/cts"]).unwrap();
        assert_eq!(cli.command, Some(Command::Fetch));
        assert!(cli.options.verbose);
        assert_eq!(cli.options.to_config().workspace_dir, PathBuf::from("/tmp/cts"));
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
