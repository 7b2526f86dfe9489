//! Build trigger: produce a fresh candidate binary.

use super::errors::HarnessError;
use super::process::{CommandRunner, Invocation};
use super::workflow::{Stage, StageOutcome};
use crate::config::HarnessConfig;

/// Invocation of the configured build command in the project root.
///
/// Returns `None` when no build command is configured.
pub fn build_invocation(config: &HarnessConfig) -> Option<Invocation> {
    let (program, args) = config.build_command.split_first()?;
    Some(
        Invocation::new(program.as_str())
            .args(args.iter().map(String::as_str))
            .current_dir(&config.project_root),
    )
}

/// Run the project build. Any failure is returned as-is; partial build output stays on disk.
pub fn build_candidate(config: &HarnessConfig, runner: &mut dyn CommandRunner) -> Result<StageOutcome, HarnessError> {
    if config.skip_build {
        return Ok(StageOutcome::Skipped("build disabled".to_string()));
    }
    let Some(build) = build_invocation(config) else {
        return Ok(StageOutcome::Skipped("no build command configured".to_string()));
    };

    tracing::info!(command = %build, "building candidate");
    let result = runner.run(&build);
    HarnessError::check_status(Stage::Build, &build, result)?;
    Ok(StageOutcome::Completed)
}
