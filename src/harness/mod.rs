//! Conformance harness
//!
//! ## Modules
//!
//! - `process` - command execution boundary (`CommandRunner`, real and recording runners)
//! - `preflight` - fetch capability probe
//! - `build` - candidate build trigger
//! - `reconcile` - workspace desired-state reconciliation (fetch, unpack, link, configure)
//! - `regression` - corpus regression run
//! - `cleanup` - process reaping and transient artifact reset
//! - `workflow` - stage sequencing and failure policies
//! - `observer` - progress reporting

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod build;
pub mod cleanup;
pub mod errors;
pub mod observer;
pub mod preflight;
pub mod process;
pub mod reconcile;
pub mod regression;
pub mod workflow;

pub use errors::HarnessError;
pub use observer::{ConsoleObserver, StageObserver};
pub use process::{CommandRunner, CommandStatus, Invocation, RecordingRunner, SessionMarker, SystemRunner};
pub use reconcile::{Action, ReconcilePlan, WorkspaceState};
pub use workflow::{FailurePolicy, Stage, StageOutcome, StageRecord, Workflow, WorkflowReport};
