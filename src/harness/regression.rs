//! Regression execution
//!
//! Runs the corpus' own regression entry point (`make check-regression MAKETESTFLAGS=`). The
//! harness does not look at individual test results; the runner prints its own report. Whether
//! a failing run halts the workflow is up to the orchestrator, which always tolerates it.

use cts_core::CorpusLayout;
use cts_core::corpus::{REGRESSION_TARGET, TEST_FLAGS_VAR};

use super::errors::HarnessError;
use super::process::{CommandRunner, CommandStatus, Invocation};
use super::workflow::Stage;
use crate::config::HarnessConfig;

/// `make check-regression MAKETESTFLAGS=` inside the corpus directory.
///
/// The flags variable is passed explicitly empty so nothing from the caller's environment leaks
/// into the runner's options.
pub fn regression_invocation(layout: &CorpusLayout, config: &HarnessConfig) -> Invocation {
    Invocation::new(config.test_driver.as_str())
        .arg(REGRESSION_TARGET)
        .arg(format!("{}=", TEST_FLAGS_VAR))
        .current_dir(layout.corpus_dir())
}

/// Run the regression suite and return its status.
///
/// A started run that fails is returned as [`HarnessError::CommandFailed`] carrying the status,
/// so the orchestrator can record it before tolerating it.
pub fn run_regression(
    layout: &CorpusLayout,
    config: &HarnessConfig,
    runner: &mut dyn CommandRunner,
) -> Result<CommandStatus, HarnessError> {
    let invocation = regression_invocation(layout, config);
    tracing::info!(command = %invocation, "running regression suite");
    let result = runner.run(&invocation);
    HarnessError::check_status(Stage::Regression, &invocation, result)
}
