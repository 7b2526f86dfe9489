//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use crate::config::HarnessConfig;
use crate::harness::{ConsoleObserver, HarnessError, SessionMarker, SystemRunner, Workflow};

use super::{CliError, CliResult, ExitCode};

/// Render a harness error with its diagnostic code and help text.
fn harness_failure(err: HarnessError) -> CliError {
    CliError::failure(format!("{:?}", miette::Report::new(err)))
}

fn workflow(config: &HarnessConfig, verbose: bool) -> CliResult<Workflow<'_, SystemRunner, ConsoleObserver>> {
    let runner = SystemRunner::new(SessionMarker::generate());
    Workflow::new(config, runner, ConsoleObserver::new(verbose)).map_err(harness_failure)
}

/// Full conformance run.
///
/// Succeeds whenever the harness's own steps succeed; a failing regression suite is reported by
/// the suite's runner and in the summary line, not through the exit code.
pub fn run_workflow(config: &HarnessConfig, verbose: bool) -> CliResult<ExitCode> {
    let mut wf = workflow(config, verbose)?;
    let report = wf.run().map_err(harness_failure)?;

    if let Some(status) = report.regression.filter(|s| !s.success()) {
        tracing::info!(%status, "regression suite reported failures");
    }
    Ok(ExitCode::SUCCESS)
}

/// Prepare the corpus workspace without building or testing.
pub fn fetch_corpus(config: &HarnessConfig, verbose: bool) -> CliResult<ExitCode> {
    let mut wf = workflow(config, verbose)?;
    wf.fetch().map_err(harness_failure)?;
    println!("✓ Corpus ready in {}", wf.layout().corpus_dir().display());
    Ok(ExitCode::SUCCESS)
}

/// Print the reconcile plan for the configured workspace.
pub fn show_plan(config: &HarnessConfig, json: bool) -> CliResult<ExitCode> {
    let wf = workflow(config, false)?;
    let (state, plan) = wf.plan();

    if json {
        let value = plan.to_json(&state, wf.layout(), config);
        let text = serde_json::to_string_pretty(&value)
            .map_err(|e| CliError::failure(format!("Error serializing plan: {}", e)))?;
        println!("{}", text);
    } else {
        print!("{}", plan.render(&state, wf.layout(), config));
    }
    Ok(ExitCode::SUCCESS)
}

/// Reap processes left behind by interrupted runs and reset the transient artifact.
pub fn clean_workspace(config: &HarnessConfig, verbose: bool) -> CliResult<ExitCode> {
    let mut wf = workflow(config, verbose)?;
    wf.clean().map_err(harness_failure)?;
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_version_is_rendered_as_diagnostic() {
        let config = HarnessConfig::default().with_corpus_version("../4.3");
        let err = show_plan(&config, false).unwrap_err();

        assert_eq!(err.exit_code, ExitCode::FAILURE);
        assert!(err.message.contains("invalid corpus version"), "{}", err.message);
    }
}
