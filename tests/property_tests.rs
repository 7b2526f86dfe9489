//! Property-based tests for workspace reconciliation planning.

use cts_core::CorpusLayout;
use imake_cts::harness::{Action, ReconcilePlan, Stage, WorkspaceState};
use proptest::prelude::*;

fn workspace_state() -> impl Strategy<Value = WorkspaceState> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(archive, corpus_dir, harness_link, makefile)| WorkspaceState {
            archive,
            corpus_dir,
            harness_link,
            makefile,
        },
    )
}

fn present(state: &WorkspaceState, action: Action) -> bool {
    match action {
        Action::FetchArchive => state.archive,
        Action::UnpackArchive => state.corpus_dir,
        Action::LinkCandidate => state.harness_link,
        Action::Configure => state.makefile,
    }
}

fn apply(mut state: WorkspaceState, action: Action) -> WorkspaceState {
    match action {
        Action::FetchArchive => state.archive = true,
        Action::UnpackArchive => state.corpus_dir = true,
        Action::LinkCandidate => state.harness_link = true,
        Action::Configure => state.makefile = true,
    }
    state
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The plan holds exactly the missing entries, in execution order.
    #[test]
    fn plan_lists_missing_entries_in_order(state in workspace_state()) {
        let plan = ReconcilePlan::for_state(&state);
        let expected: Vec<Action> = Action::ORDER
            .into_iter()
            .filter(|a| !present(&state, *a))
            .collect();
        prop_assert_eq!(plan.actions(), expected.as_slice());
    }

    /// Applying every planned action converges, and a second plan is empty.
    #[test]
    fn applying_plan_converges(state in workspace_state()) {
        let plan = ReconcilePlan::for_state(&state);
        let after = plan
            .actions()
            .iter()
            .fold(state, |s, action| apply(s, *action));

        prop_assert!(Action::ORDER.into_iter().all(|a| present(&after, a)));
        prop_assert!(ReconcilePlan::for_state(&after).is_empty());
    }

    /// Splitting the plan by stage loses nothing and keeps acquisition before wiring.
    #[test]
    fn stage_split_partitions_plan(state in workspace_state()) {
        let plan = ReconcilePlan::for_state(&state);
        let acquisition = plan.for_stage(Stage::Acquisition);
        let wiring = plan.for_stage(Stage::Wiring);

        let rejoined: Vec<Action> = acquisition
            .actions()
            .iter()
            .chain(wiring.actions())
            .copied()
            .collect();
        prop_assert_eq!(rejoined.as_slice(), plan.actions());
    }

    /// Any well-formed version yields paths under the workspace.
    #[test]
    fn layout_paths_stay_in_workspace(version in "[0-9]{1,2}(\\.[0-9]{1,2}){0,2}") {
        let layout = CorpusLayout::new("cts", version.as_str()).unwrap();
        for path in [
            layout.archive(),
            layout.corpus_dir(),
            layout.harness_link(),
            layout.makefile(),
            layout.transient_artifact(),
        ] {
            prop_assert!(path.starts_with("cts"));
        }
        prop_assert!(layout.archive().to_string_lossy().ends_with(".tar.gz"));
    }
}
