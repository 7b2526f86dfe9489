//! Harness error taxonomy
//!
//! Every stage reports failures as a [`HarnessError`]. Whether a failure halts the run or is
//! absorbed is decided by the stage's [`FailurePolicy`](super::workflow::FailurePolicy), not here.

use std::io;
use std::path::PathBuf;

use cts_core::VersionError;
use miette::Diagnostic;
use thiserror::Error;

use super::process::CommandStatus;
use super::workflow::Stage;

#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    #[error("required fetch tool '{tool}' is not available")]
    #[diagnostic(
        code(cts::preflight::missing_capability),
        help("install it, or point --fetch-tool at an equivalent HTTP client")
    )]
    MissingCapability { tool: String },

    #[error("{stage}: failed to start '{program}': {source}")]
    #[diagnostic(code(cts::process::spawn))]
    Spawn {
        stage: Stage,
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{stage}: '{command}' failed with {status}")]
    #[diagnostic(code(cts::process::failed))]
    CommandFailed {
        stage: Stage,
        command: String,
        status: CommandStatus,
    },

    #[error("{stage}: cannot {action} {}: {source}", .path.display())]
    #[diagnostic(code(cts::io))]
    Io {
        stage: Stage,
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{stage}: {action} reported success but {} does not exist", .path.display())]
    #[diagnostic(
        code(cts::reconcile::postcondition),
        help("inspect the workspace; partial artifacts are kept for diagnosis")
    )]
    MissingAfterAction {
        stage: Stage,
        action: String,
        path: PathBuf,
    },

    #[error("invalid corpus version: {0}")]
    #[diagnostic(code(cts::config::version))]
    InvalidVersion(#[from] VersionError),
}

impl HarnessError {
    /// Stage the error was raised in, when it is tied to one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            HarnessError::MissingCapability { .. } => Some(Stage::Preflight),
            HarnessError::Spawn { stage, .. }
            | HarnessError::CommandFailed { stage, .. }
            | HarnessError::Io { stage, .. }
            | HarnessError::MissingAfterAction { stage, .. } => Some(*stage),
            HarnessError::InvalidVersion(_) => None,
        }
    }

    /// Map the outcome of running `command` into a stage error when it did not succeed.
    pub(crate) fn check_status(
        stage: Stage,
        command: &super::process::Invocation,
        result: io::Result<CommandStatus>,
    ) -> Result<CommandStatus, HarnessError> {
        match result {
            Ok(status) if status.success() => Ok(status),
            Ok(status) => Err(HarnessError::CommandFailed {
                stage,
                command: command.command_line(),
                status,
            }),
            Err(source) => Err(HarnessError::Spawn {
                stage,
                program: command.program.clone(),
                source,
            }),
        }
    }
}
