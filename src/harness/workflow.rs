//! Workflow orchestration
//!
//! A run is a fixed sequence of stages. Each stage returns `Result<StageOutcome, HarnessError>`
//! and carries a [`FailurePolicy`]:
//!
//! | Stage          | Policy  |
//! |----------------|---------|
//! | preflight      | strict  |
//! | build          | strict  |
//! | acquisition    | strict  |
//! | wiring         | strict  |
//! | regression     | relaxed |
//! | reap           | relaxed |
//! | artifact reset | strict  |
//!
//! A strict failure ends the run immediately; nothing after it (cleanup included) runs. A
//! relaxed failure is recorded as [`StageOutcome::Tolerated`] and the run continues. In
//! particular, the regression outcome never decides the harness's own success.

use std::fmt;
use std::time::{Duration, Instant};

use cts_core::CorpusLayout;

use super::cleanup::{self, SessionFilter};
use super::errors::HarnessError;
use super::observer::StageObserver;
use super::process::{CommandRunner, CommandStatus};
use super::reconcile::{ReconcilePlan, Reconciler, WorkspaceState};
use super::{build, preflight, regression};
use crate::config::HarnessConfig;

/// A workflow stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Preflight,
    Build,
    Acquisition,
    Wiring,
    Regression,
    Reap,
    ArtifactReset,
}

impl Stage {
    /// Stages of a full run.
    pub const ALL: [Stage; 7] = [
        Stage::Preflight,
        Stage::Build,
        Stage::Acquisition,
        Stage::Wiring,
        Stage::Regression,
        Stage::Reap,
        Stage::ArtifactReset,
    ];

    pub fn policy(self) -> FailurePolicy {
        match self {
            Stage::Regression | Stage::Reap => FailurePolicy::Relaxed,
            _ => FailurePolicy::Strict,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Preflight => "preflight",
            Stage::Build => "build",
            Stage::Acquisition => "acquisition",
            Stage::Wiring => "wiring",
            Stage::Regression => "regression",
            Stage::Reap => "reap",
            Stage::ArtifactReset => "artifact reset",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a stage failure is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Halt the run and report the error.
    Strict,
    /// Record the error and continue.
    Relaxed,
}

/// What a stage did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// The stage performed its work.
    Completed,
    /// Desired state already held; nothing was done.
    Unchanged,
    /// The stage was not run.
    Skipped(String),
    /// The stage failed under a relaxed policy.
    Tolerated(String),
}

impl StageOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            StageOutcome::Completed => "done",
            StageOutcome::Unchanged => "unchanged",
            StageOutcome::Skipped(_) => "skipped",
            StageOutcome::Tolerated(_) => "tolerated",
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            StageOutcome::Skipped(d) | StageOutcome::Tolerated(d) => Some(d),
            _ => None,
        }
    }
}

/// Outcome and timing of one executed stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRecord {
    pub stage: Stage,
    pub outcome: StageOutcome,
    pub elapsed: Duration,
}

/// Summary of a finished run.
#[derive(Debug, Clone, Default)]
pub struct WorkflowReport {
    pub stages: Vec<StageRecord>,
    /// Status of the regression run, when it was started
    pub regression: Option<CommandStatus>,
    pub duration: Duration,
}

impl WorkflowReport {
    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.stages.iter().find(|r| r.stage == stage).map(|r| &r.outcome)
    }

    pub fn executed(&self) -> Vec<Stage> {
        self.stages.iter().map(|r| r.stage).collect()
    }
}

/// Drives the stages of a conformance run.
pub struct Workflow<'a, R: CommandRunner, O: StageObserver> {
    config: &'a HarnessConfig,
    layout: CorpusLayout,
    runner: R,
    observer: O,
}

impl<'a, R: CommandRunner, O: StageObserver> Workflow<'a, R, O> {
    pub fn new(config: &'a HarnessConfig, runner: R, observer: O) -> Result<Self, HarnessError> {
        let layout = config.layout()?;
        Ok(Self {
            config,
            layout,
            runner,
            observer,
        })
    }

    pub fn layout(&self) -> &CorpusLayout {
        &self.layout
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Observe the workspace and compute the pending reconcile actions without running anything.
    pub fn plan(&self) -> (WorkspaceState, ReconcilePlan) {
        let state = WorkspaceState::observe(&self.layout);
        let plan = ReconcilePlan::for_state(&state);
        (state, plan)
    }

    /// Full run: preflight, build, acquisition, wiring, regression, cleanup.
    #[tracing::instrument(skip_all, fields(version = %self.layout.version()))]
    pub fn run(&mut self) -> Result<WorkflowReport, HarnessError> {
        let start = Instant::now();
        let mut report = WorkflowReport::default();

        self.step(&mut report, Stage::Preflight, |wf| wf.preflight())?;
        self.step(&mut report, Stage::Build, |wf| {
            build::build_candidate(wf.config, &mut wf.runner)
        })?;
        self.step(&mut report, Stage::Acquisition, |wf| wf.reconcile(Stage::Acquisition))?;
        self.step(&mut report, Stage::Wiring, |wf| wf.reconcile(Stage::Wiring))?;

        let mut regression_status = None;
        self.step(&mut report, Stage::Regression, |wf| {
            match regression::run_regression(&wf.layout, wf.config, &mut wf.runner) {
                Ok(status) => {
                    regression_status = Some(status);
                    Ok(StageOutcome::Completed)
                }
                Err(err) => {
                    if let HarnessError::CommandFailed { status, .. } = &err {
                        regression_status = Some(*status);
                    }
                    Err(err)
                }
            }
        })?;
        report.regression = regression_status;

        self.cleanup_steps(&mut report)?;
        self.finish(report, start)
    }

    /// Preflight and acquisition only, to prepare a workspace for offline runs.
    pub fn fetch(&mut self) -> Result<WorkflowReport, HarnessError> {
        let start = Instant::now();
        let mut report = WorkflowReport::default();

        self.step(&mut report, Stage::Preflight, |wf| wf.preflight())?;
        self.step(&mut report, Stage::Acquisition, |wf| wf.reconcile(Stage::Acquisition))?;
        self.finish(report, start)
    }

    /// Cleanup only: reap processes left by dead harness runs and reset the artifact.
    pub fn clean(&mut self) -> Result<WorkflowReport, HarnessError> {
        let start = Instant::now();
        let mut report = WorkflowReport::default();

        self.step(&mut report, Stage::Reap, |wf| {
            cleanup::reap_processes(wf.config, &mut wf.runner, SessionFilter::Orphaned)
        })?;
        self.step(&mut report, Stage::ArtifactReset, |wf| cleanup::reset_artifact(&wf.layout))?;
        self.finish(report, start)
    }

    fn cleanup_steps(&mut self, report: &mut WorkflowReport) -> Result<(), HarnessError> {
        self.step(report, Stage::Reap, |wf| {
            let session = wf.runner.session().map(|s| s.as_str().to_string());
            let filter = match &session {
                Some(marker) => SessionFilter::Exact(marker),
                None => SessionFilter::Orphaned,
            };
            cleanup::reap_processes(wf.config, &mut wf.runner, filter)
        })?;
        self.step(report, Stage::ArtifactReset, |wf| cleanup::reset_artifact(&wf.layout))
    }

    fn preflight(&mut self) -> Result<StageOutcome, HarnessError> {
        preflight::check_fetch_capability(&self.config.fetch_tool, &mut self.runner)
    }

    fn reconcile(&mut self, stage: Stage) -> Result<StageOutcome, HarnessError> {
        let applied = Reconciler::new(&self.layout, self.config).reconcile_stage(stage, &mut self.runner)?;
        Ok(if applied.is_empty() {
            StageOutcome::Unchanged
        } else {
            StageOutcome::Completed
        })
    }

    /// Run one stage and apply its failure policy.
    fn step<F>(&mut self, report: &mut WorkflowReport, stage: Stage, f: F) -> Result<(), HarnessError>
    where
        F: FnOnce(&mut Self) -> Result<StageOutcome, HarnessError>,
    {
        self.observer.on_stage_start(stage);
        let start = Instant::now();

        let outcome = match (f(self), stage.policy()) {
            (Ok(outcome), _) => outcome,
            (Err(err), FailurePolicy::Relaxed) => {
                tracing::warn!(%stage, error = %err, "tolerated failure");
                StageOutcome::Tolerated(err.to_string())
            }
            (Err(err), FailurePolicy::Strict) => {
                tracing::error!(%stage, error = %err, "stage failed");
                self.observer.on_stage_failed(stage, &err);
                return Err(err);
            }
        };

        let record = StageRecord {
            stage,
            outcome,
            elapsed: start.elapsed(),
        };
        self.observer.on_stage_complete(&record);
        report.stages.push(record);
        Ok(())
    }

    fn finish(&mut self, mut report: WorkflowReport, start: Instant) -> Result<WorkflowReport, HarnessError> {
        report.duration = start.elapsed();
        self.observer.on_run_complete(&report);
        Ok(report)
    }
}
