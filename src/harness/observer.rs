//! Stage observers
//!
//! The workflow reports progress through the [`StageObserver`] trait so presentation stays out
//! of the orchestration logic. [`ConsoleObserver`] is the default terminal output.

use super::errors::HarnessError;
use super::workflow::{Stage, StageOutcome, StageRecord, WorkflowReport};

/// Receives workflow progress events.
pub trait StageObserver {
    /// Called before a stage runs
    fn on_stage_start(&mut self, _stage: Stage) {}

    /// Called when a stage finished (including tolerated failures)
    fn on_stage_complete(&mut self, record: &StageRecord);

    /// Called when a strict stage failed; the run ends right after
    fn on_stage_failed(&mut self, stage: Stage, error: &HarnessError);

    /// Called once all stages of a successful run have executed
    fn on_run_complete(&mut self, report: &WorkflowReport);
}

impl<T: StageObserver + ?Sized> StageObserver for &mut T {
    fn on_stage_start(&mut self, stage: Stage) {
        (**self).on_stage_start(stage);
    }

    fn on_stage_complete(&mut self, record: &StageRecord) {
        (**self).on_stage_complete(record);
    }

    fn on_stage_failed(&mut self, stage: Stage, error: &HarnessError) {
        (**self).on_stage_failed(stage, error);
    }

    fn on_run_complete(&mut self, report: &WorkflowReport) {
        (**self).on_run_complete(report);
    }
}

/// Default console observer
#[derive(Default)]
pub struct ConsoleObserver {
    pub verbose: bool,
}

impl ConsoleObserver {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl StageObserver for ConsoleObserver {
    fn on_stage_start(&mut self, stage: Stage) {
        if self.verbose {
            eprintln!("\x1b[1m==> {}\x1b[0m", stage);
        }
    }

    fn on_stage_complete(&mut self, record: &StageRecord) {
        let color = match record.outcome {
            StageOutcome::Completed => "\x1b[32m",
            StageOutcome::Unchanged | StageOutcome::Skipped(_) => "\x1b[36m",
            StageOutcome::Tolerated(_) => "\x1b[33m",
        };
        let mut line = format!(
            "{:<15}{}{}\x1b[0m",
            record.stage.as_str(),
            color,
            record.outcome.label()
        );
        if let Some(detail) = record.outcome.detail() {
            line.push_str(&format!(" ({})", detail));
        }
        if self.verbose {
            line.push_str(&format!(" [{:.0}ms]", record.elapsed.as_millis()));
        }
        eprintln!("{}", line);
    }

    fn on_stage_failed(&mut self, stage: Stage, _error: &HarnessError) {
        // The error itself is printed by the CLI entry point.
        eprintln!("{:<15}\x1b[31mfailed\x1b[0m", stage.as_str());
    }

    fn on_run_complete(&mut self, report: &WorkflowReport) {
        let regression = match report.regression {
            Some(status) if status.success() => "\x1b[32mregression suite passed\x1b[0m".to_string(),
            Some(status) => format!("\x1b[33mregression suite finished with {}\x1b[0m", status),
            None if report.outcome(Stage::Regression).is_some() => {
                "\x1b[33mregression suite did not start\x1b[0m".to_string()
            }
            None => format!("{} stage(s) done", report.stages.len()),
        };
        eprintln!(
            "====== {} in {:.2}s ======",
            regression,
            report.duration.as_secs_f64()
        );
    }
}
