//! Workspace reconciliation
//!
//! The corpus workspace has a declared desired state: archive present, corpus unpacked, harness
//! link in place, Makefile configured. [`WorkspaceState::observe`] records what is on disk,
//! [`ReconcilePlan::for_state`] lists only the missing pieces, and [`Reconciler::apply`] performs
//! them in order, checking each one's postcondition.
//!
//! Nothing that already exists is ever replaced. A pre-existing harness link, even one pointing
//! somewhere else, is left alone; this is how a reference make is substituted for the candidate.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use cts_core::CorpusLayout;

use super::errors::HarnessError;
use super::process::{CommandRunner, Invocation};
use super::workflow::Stage;
use crate::config::HarnessConfig;

/// Presence of each desired workspace entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkspaceState {
    pub archive: bool,
    pub corpus_dir: bool,
    pub harness_link: bool,
    pub makefile: bool,
}

impl WorkspaceState {
    /// Observe the workspace. Links count as present even when dangling.
    pub fn observe(layout: &CorpusLayout) -> Self {
        Self {
            archive: entry_exists(&layout.archive()),
            corpus_dir: layout.corpus_dir().is_dir(),
            harness_link: entry_exists(&layout.harness_link()),
            makefile: entry_exists(&layout.makefile()),
        }
    }
}

fn entry_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// One step towards the desired workspace state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    FetchArchive,
    UnpackArchive,
    LinkCandidate,
    Configure,
}

impl Action {
    /// All actions in application order.
    pub const ORDER: [Action; 4] = [
        Action::FetchArchive,
        Action::UnpackArchive,
        Action::LinkCandidate,
        Action::Configure,
    ];

    /// Workflow stage the action belongs to.
    pub fn stage(self) -> Stage {
        match self {
            Action::FetchArchive | Action::UnpackArchive => Stage::Acquisition,
            Action::LinkCandidate | Action::Configure => Stage::Wiring,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::FetchArchive => "fetch",
            Action::UnpackArchive => "unpack",
            Action::LinkCandidate => "link",
            Action::Configure => "configure",
        }
    }

    fn is_satisfied(self, state: &WorkspaceState) -> bool {
        match self {
            Action::FetchArchive => state.archive,
            Action::UnpackArchive => state.corpus_dir,
            Action::LinkCandidate => state.harness_link,
            Action::Configure => state.makefile,
        }
    }

    /// Path whose existence proves the action took effect.
    pub fn target(self, layout: &CorpusLayout) -> PathBuf {
        match self {
            Action::FetchArchive => layout.archive(),
            Action::UnpackArchive => layout.corpus_dir(),
            Action::LinkCandidate => layout.harness_link(),
            Action::Configure => layout.makefile(),
        }
    }

    /// One-line human description.
    pub fn describe(self, layout: &CorpusLayout, config: &HarnessConfig) -> String {
        match self {
            Action::FetchArchive => format!(
                "fetch {} -> {}",
                layout.archive_url(&config.mirror),
                layout.archive().display()
            ),
            Action::UnpackArchive => format!(
                "unpack {} -> {}",
                layout.archive().display(),
                layout.corpus_dir().display()
            ),
            Action::LinkCandidate => format!(
                "link {} -> {}",
                layout.harness_link().display(),
                config.link_target(layout).display()
            ),
            Action::Configure => format!("configure {}", layout.corpus_dir().display()),
        }
    }
}

/// Actions needed to reach the desired state, in application order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    actions: Vec<Action>,
}

impl ReconcilePlan {
    pub fn for_state(state: &WorkspaceState) -> Self {
        Self {
            actions: Action::ORDER
                .into_iter()
                .filter(|action| !action.is_satisfied(state))
                .collect(),
        }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Restrict the plan to the actions of one stage.
    pub fn for_stage(&self, stage: Stage) -> Self {
        Self {
            actions: self.actions.iter().copied().filter(|a| a.stage() == stage).collect(),
        }
    }

    /// Human-readable report of the observed state and pending actions.
    pub fn render(&self, state: &WorkspaceState, layout: &CorpusLayout, config: &HarnessConfig) -> String {
        let mut out = format!(
            "corpus make-{} in {}\n",
            layout.version(),
            layout.workspace().display()
        );
        for action in Action::ORDER {
            let mark = if action.is_satisfied(state) { "present" } else { "missing" };
            out.push_str(&format!(
                "  [{}] {:<9} {}\n",
                mark,
                action.as_str(),
                action.target(layout).display()
            ));
        }
        if self.actions.is_empty() {
            out.push_str("nothing to do\n");
        } else {
            out.push_str("planned actions:\n");
            for (i, action) in self.actions.iter().enumerate() {
                out.push_str(&format!("  {}. {}\n", i + 1, action.describe(layout, config)));
            }
        }
        out
    }

    /// Machine-readable form of [`render`](Self::render).
    pub fn to_json(&self, state: &WorkspaceState, layout: &CorpusLayout, config: &HarnessConfig) -> serde_json::Value {
        let entries: Vec<serde_json::Value> = Action::ORDER
            .into_iter()
            .map(|action| {
                serde_json::json!({
                    "action": action.as_str(),
                    "path": action.target(layout).display().to_string(),
                    "present": action.is_satisfied(state),
                })
            })
            .collect();
        let actions: Vec<serde_json::Value> = self
            .actions
            .iter()
            .map(|action| {
                serde_json::json!({
                    "action": action.as_str(),
                    "stage": action.stage().as_str(),
                    "description": action.describe(layout, config),
                })
            })
            .collect();
        serde_json::json!({
            "version": layout.version(),
            "workspace": layout.workspace().display().to_string(),
            "url": layout.archive_url(&config.mirror),
            "entries": entries,
            "actions": actions,
        })
    }
}

/// Applies reconcile actions against a real workspace.
pub struct Reconciler<'a> {
    layout: &'a CorpusLayout,
    config: &'a HarnessConfig,
}

impl<'a> Reconciler<'a> {
    pub fn new(layout: &'a CorpusLayout, config: &'a HarnessConfig) -> Self {
        Self { layout, config }
    }

    /// Observe the workspace and apply the missing actions belonging to `stage`.
    ///
    /// Returns the actions that were applied (empty when the state already held).
    pub fn reconcile_stage(&self, stage: Stage, runner: &mut dyn CommandRunner) -> Result<Vec<Action>, HarnessError> {
        let state = WorkspaceState::observe(self.layout);
        let plan = ReconcilePlan::for_state(&state).for_stage(stage);

        for action in Action::ORDER.into_iter().filter(|a| a.stage() == stage) {
            if !plan.actions().contains(&action) {
                tracing::debug!(action = action.as_str(), path = %action.target(self.layout).display(), "already present");
            }
        }
        for &action in plan.actions() {
            self.apply(action, runner)?;
        }
        Ok(plan.actions)
    }

    /// Apply one action and verify its postcondition.
    pub fn apply(&self, action: Action, runner: &mut dyn CommandRunner) -> Result<(), HarnessError> {
        tracing::info!("{}", action.describe(self.layout, self.config));
        let stage = action.stage();

        match action {
            Action::FetchArchive => {
                let workspace = self.layout.workspace();
                fs::create_dir_all(workspace).map_err(|source| HarnessError::Io {
                    stage,
                    action: "create workspace",
                    path: workspace.to_path_buf(),
                    source,
                })?;
                self.run(stage, &self.fetch_invocation(), runner)?;
            }
            Action::UnpackArchive => self.run(stage, &self.unpack_invocation(), runner)?,
            Action::LinkCandidate => {
                let link = self.layout.harness_link();
                create_link(&self.config.link_target(self.layout), &link).map_err(|source| HarnessError::Io {
                    stage,
                    action: "create harness link",
                    path: link.clone(),
                    source,
                })?;
            }
            Action::Configure => self.run(stage, &self.configure_invocation(), runner)?,
        }

        let target = action.target(self.layout);
        if !entry_exists(&target) {
            return Err(HarnessError::MissingAfterAction {
                stage,
                action: action.as_str().to_string(),
                path: target,
            });
        }
        Ok(())
    }

    fn run(&self, stage: Stage, invocation: &Invocation, runner: &mut dyn CommandRunner) -> Result<(), HarnessError> {
        let result = runner.run(invocation);
        HarnessError::check_status(stage, invocation, result).map(|_| ())
    }

    /// `wget -O cts/make-4.3.tar.gz <url>`
    pub fn fetch_invocation(&self) -> Invocation {
        Invocation::new(self.config.fetch_tool.as_str())
            .arg("-O")
            .arg(self.layout.archive().display().to_string())
            .arg(self.layout.archive_url(&self.config.mirror))
    }

    /// `tar -xzf cts/make-4.3.tar.gz -C cts`
    pub fn unpack_invocation(&self) -> Invocation {
        Invocation::new("tar")
            .arg("-xzf")
            .arg(self.layout.archive().display().to_string())
            .arg("-C")
            .arg(self.layout.workspace().display().to_string())
    }

    /// `./configure`, run inside the corpus directory
    pub fn configure_invocation(&self) -> Invocation {
        Invocation::new(format!("./{}", cts_core::corpus::CONFIGURE_SCRIPT)).current_dir(self.layout.corpus_dir())
    }
}

#[cfg(unix)]
fn create_link(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn create_link(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "harness links require a unix filesystem",
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::harness::process::{CommandStatus, RecordingRunner};

    fn layout_in(dir: &Path) -> CorpusLayout {
        CorpusLayout::new(dir.join("cts"), "4.3").unwrap()
    }

    #[test]
    fn test_fresh_workspace_plans_everything() {
        let plan = ReconcilePlan::for_state(&WorkspaceState::default());
        assert_eq!(plan.actions(), Action::ORDER);
    }

    #[test]
    fn test_seeded_workspace_plans_only_configure() {
        let state = WorkspaceState {
            archive: true,
            corpus_dir: true,
            harness_link: true,
            makefile: false,
        };
        let plan = ReconcilePlan::for_state(&state);
        assert_eq!(plan.actions(), [Action::Configure]);
        assert!(plan.for_stage(Stage::Acquisition).is_empty());
    }

    #[test]
    fn test_render_fresh_plan() {
        let layout = CorpusLayout::new("cts", "4.3").unwrap();
        let config = HarnessConfig::default();
        let state = WorkspaceState::default();
        let rendered = ReconcilePlan::for_state(&state).render(&state, &layout, &config);

        insta::assert_snapshot!(rendered, @r"
        corpus make-4.3 in cts
          [missing] fetch     cts/make-4.3.tar.gz
          [missing] unpack    cts/make-4.3
          [missing] link      cts/make-4.3/make
          [missing] configure cts/make-4.3/Makefile
        planned actions:
          1. fetch http://ftp.gnu.org/gnu/make/make-4.3.tar.gz -> cts/make-4.3.tar.gz
          2. unpack cts/make-4.3.tar.gz -> cts/make-4.3
          3. link cts/make-4.3/make -> ../../target/debug/imake
          4. configure cts/make-4.3
        ");
    }

    #[test]
    fn test_plan_json_lists_entries_and_actions() {
        let layout = CorpusLayout::new("cts", "4.3").unwrap();
        let config = HarnessConfig::default();
        let state = WorkspaceState {
            archive: true,
            ..WorkspaceState::default()
        };
        let json = ReconcilePlan::for_state(&state).to_json(&state, &layout, &config);

        assert_eq!(json["version"], "4.3");
        assert_eq!(json["entries"][0]["present"], true);
        assert_eq!(json["entries"][1]["present"], false);
        assert_eq!(json["actions"].as_array().unwrap().len(), 3);
        assert_eq!(json["actions"][0]["action"], "unpack");
        assert_eq!(json["actions"][0]["stage"], "acquisition");
    }

    #[test]
    fn test_fetch_creates_workspace_and_verifies_archive() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = layout_in(tmp.path());
        let config = HarnessConfig::default();
        let archive = layout.archive();
        let mut runner = RecordingRunner::new().on_run("wget", move |_| fs::write(&archive, b"tarball"));

        Reconciler::new(&layout, &config)
            .apply(Action::FetchArchive, &mut runner)
            .unwrap();

        assert!(layout.archive().is_file());
        assert_eq!(
            runner.command_lines(),
            [format!(
                "wget -O {} http://ftp.gnu.org/gnu/make/make-4.3.tar.gz",
                layout.archive().display()
            )]
        );
    }

    #[test]
    fn test_action_without_effect_fails_postcondition() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = layout_in(tmp.path());
        let config = HarnessConfig::default();
        let mut runner = RecordingRunner::new();

        let err = Reconciler::new(&layout, &config)
            .apply(Action::FetchArchive, &mut runner)
            .unwrap_err();
        assert!(matches!(err, HarnessError::MissingAfterAction { stage: Stage::Acquisition, .. }));
    }

    #[test]
    fn test_fetch_failure_is_command_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = layout_in(tmp.path());
        let config = HarnessConfig::default();
        let mut runner = RecordingRunner::new().respond("wget", CommandStatus::from_code(4));

        let err = Reconciler::new(&layout, &config)
            .apply(Action::FetchArchive, &mut runner)
            .unwrap_err();
        assert!(matches!(
            err,
            HarnessError::CommandFailed { stage: Stage::Acquisition, status, .. } if status.code() == Some(4)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_link_points_at_candidate() {
        let tmp = tempfile::tempdir().unwrap();
        let config = HarnessConfig::default().with_project_root(tmp.path());
        let layout = config.layout().unwrap();
        fs::create_dir_all(layout.corpus_dir()).unwrap();
        let mut runner = RecordingRunner::new();

        Reconciler::new(&layout, &config)
            .apply(Action::LinkCandidate, &mut runner)
            .unwrap();

        assert_eq!(
            fs::read_link(layout.harness_link()).unwrap(),
            PathBuf::from("../../target/debug/imake")
        );
        assert!(runner.invocations().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_link_resolves_from_nested_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        let config = HarnessConfig::default()
            .with_project_root(tmp.path())
            .with_workspace_dir("build/cts");
        let layout = config.layout().unwrap();
        fs::create_dir_all(layout.corpus_dir()).unwrap();
        let binary = config.candidate_binary();
        fs::create_dir_all(binary.parent().unwrap()).unwrap();
        fs::write(&binary, "#!/bin/sh\n").unwrap();

        Reconciler::new(&layout, &config)
            .apply(Action::LinkCandidate, &mut RecordingRunner::new())
            .unwrap();

        assert_eq!(
            fs::read_link(layout.harness_link()).unwrap(),
            PathBuf::from("../../../target/debug/imake")
        );
        assert_eq!(
            fs::canonicalize(layout.harness_link()).unwrap(),
            fs::canonicalize(&binary).unwrap()
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_link_counts_as_present() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = layout_in(tmp.path());
        fs::create_dir_all(layout.corpus_dir()).unwrap();
        std::os::unix::fs::symlink("/nonexistent/make", layout.harness_link()).unwrap();

        let state = WorkspaceState::observe(&layout);
        assert!(state.corpus_dir);
        assert!(state.harness_link);
        assert!(!state.archive);
    }

    #[test]
    fn test_configure_runs_in_corpus_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = layout_in(tmp.path());
        fs::create_dir_all(layout.corpus_dir()).unwrap();
        let config = HarnessConfig::default();
        let makefile = layout.makefile();
        let mut runner = RecordingRunner::new().on_run("./configure", move |_| fs::write(&makefile, "all:\n"));

        let applied = Reconciler::new(&layout, &config)
            .reconcile_stage(Stage::Wiring, &mut runner)
            .unwrap();

        assert_eq!(applied, [Action::LinkCandidate, Action::Configure]);
        assert_eq!(runner.invocations()[0].cwd, Some(layout.corpus_dir()));
    }
}
