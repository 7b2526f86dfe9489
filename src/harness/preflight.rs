//! Capability preflight
//!
//! Probes the fetch tool before anything touches the filesystem. A run that fails here leaves
//! no trace: the workspace directory has not been created yet.

use super::errors::HarnessError;
use super::process::{CommandRunner, Invocation};
use super::workflow::StageOutcome;

/// Invocation used to check that `tool` can be started.
pub fn probe_invocation(tool: &str) -> Invocation {
    Invocation::new(tool).arg("--version").quiet()
}

/// Fail with [`HarnessError::MissingCapability`] unless `tool --version` runs successfully.
pub fn check_fetch_capability(tool: &str, runner: &mut dyn CommandRunner) -> Result<StageOutcome, HarnessError> {
    let probe = probe_invocation(tool);
    match runner.run(&probe) {
        Ok(status) if status.success() => {
            tracing::debug!(tool, "fetch capability present");
            Ok(StageOutcome::Completed)
        }
        Ok(status) => {
            tracing::debug!(tool, %status, "fetch capability probe failed");
            Err(HarnessError::MissingCapability { tool: tool.to_string() })
        }
        Err(e) => {
            tracing::debug!(tool, error = %e, "fetch capability not invocable");
            Err(HarnessError::MissingCapability { tool: tool.to_string() })
        }
    }
}
