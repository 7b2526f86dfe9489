//! Cleanup: reap leftover processes and reset the transient artifact.
//!
//! Reaping happens in two passes:
//! 1. processes carrying this session's marker (found by scanning `/proc/<pid>/environ`) are
//!    killed by pid;
//! 2. anything still running under the build tool's name is terminated with `pkill -x`.
//!
//! `pkill` exiting 1 means nothing matched, which is the common case and not a failure.

use std::fs;
use std::io;
use std::path::Path;

use cts_core::CorpusLayout;
use cts_core::corpus::SESSION_ENV_VAR;

use super::errors::HarnessError;
use super::process::{CommandRunner, Invocation};
use super::workflow::{Stage, StageOutcome};
use crate::config::HarnessConfig;

/// `pkill` exit status when no process matched.
const PKILL_NO_MATCH: i32 = 1;

/// Which session markers count as ours when scanning for processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFilter<'a> {
    /// Only processes spawned by the given session.
    Exact(&'a str),
    /// Processes left by harness runs that are no longer alive (used by `clean` after an
    /// interrupted run). Markers whose owning harness pid is still present are skipped.
    Orphaned,
}

impl SessionFilter<'_> {
    fn matches(&self, value: &[u8], proc_root: &Path) -> bool {
        match self {
            SessionFilter::Exact(expected) => value == expected.as_bytes(),
            SessionFilter::Orphaned => match marker_owner(value) {
                Some(owner) => !proc_root.join(owner.to_string()).exists(),
                None => true,
            },
        }
    }
}

/// Harness pid encoded in a `<pid>-<nanos>` session marker.
fn marker_owner(value: &[u8]) -> Option<u32> {
    let (pid, _) = std::str::from_utf8(value).ok()?.split_once('-')?;
    pid.parse().ok()
}

/// Pids under `proc_root` whose environment carries a matching session marker.
///
/// Unreadable entries (processes that exited mid-scan, other users' processes) are skipped; a
/// missing `proc_root` yields no pids. The harness's own pid is never returned.
pub fn find_marked_processes(proc_root: &Path, filter: SessionFilter<'_>) -> Vec<u32> {
    let entries = match fs::read_dir(proc_root) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(proc_root = %proc_root.display(), error = %e, "process table unavailable");
            return Vec::new();
        }
    };

    let own_pid = std::process::id();
    let mut key = SESSION_ENV_VAR.as_bytes().to_vec();
    key.push(b'=');

    let mut pids: Vec<u32> = entries
        .flatten()
        .filter_map(|entry| entry.file_name().to_str()?.parse::<u32>().ok())
        .filter(|&pid| pid != own_pid)
        .filter(|pid| {
            fs::read(proc_root.join(pid.to_string()).join("environ"))
                .map(|environ| {
                    environ
                        .split(|&b| b == 0)
                        .filter_map(|var| var.strip_prefix(key.as_slice()))
                        .any(|value| filter.matches(value, proc_root))
                })
                .unwrap_or(false)
        })
        .collect();
    pids.sort_unstable();
    pids
}

/// `pkill -x <name>`
pub fn pkill_invocation(name: &str) -> Invocation {
    Invocation::new("pkill").arg("-x").arg(name)
}

/// Terminate leftover test processes.
///
/// Failures of the precise pass are logged and do not stop the name-based pass. A failing
/// `pkill` (other than "no match") is returned so the orchestrator can record it.
pub fn reap_processes(
    config: &HarnessConfig,
    runner: &mut dyn CommandRunner,
    filter: SessionFilter<'_>,
) -> Result<StageOutcome, HarnessError> {
    let marked = find_marked_processes(&config.proc_root, filter);
    if !marked.is_empty() {
        tracing::info!(count = marked.len(), "killing session processes");
        let kill = Invocation::new("kill")
            .arg("-KILL")
            .args(marked.iter().map(u32::to_string));
        match runner.run(&kill) {
            Ok(status) if status.success() => {}
            // Processes may exit between the scan and the kill.
            Ok(status) => tracing::warn!(%status, "session reap incomplete"),
            Err(e) => tracing::warn!(error = %e, "session reap failed"),
        }
    }

    let pkill = pkill_invocation(&config.reap_name);
    match runner.run(&pkill) {
        Ok(status) if status.success() => {
            tracing::info!(name = %config.reap_name, "terminated leftover processes");
            Ok(StageOutcome::Completed)
        }
        Ok(status) if status.code() == Some(PKILL_NO_MATCH) => {
            tracing::debug!(name = %config.reap_name, "no leftover processes");
            Ok(StageOutcome::Unchanged)
        }
        result => HarnessError::check_status(Stage::Reap, &pkill, result).map(|_| StageOutcome::Completed),
    }
}

/// Remove the transient artifact so the next run starts clean.
///
/// A missing artifact is fine; any other removal error is returned.
pub fn reset_artifact(layout: &CorpusLayout) -> Result<StageOutcome, HarnessError> {
    let artifact = layout.transient_artifact();
    match fs::remove_file(&artifact) {
        Ok(()) => {
            tracing::info!(path = %artifact.display(), "removed transient artifact");
            Ok(StageOutcome::Completed)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(StageOutcome::Unchanged),
        Err(source) => Err(HarnessError::Io {
            stage: Stage::ArtifactReset,
            action: "remove",
            path: artifact,
            source,
        }),
    }
}
