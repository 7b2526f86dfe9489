//! Layering guardrails.
//!
//! - `cts_core` is pure vocabulary: its manifest must not grow a `[dependencies]` entry.
//! - Only `harness/process.rs` may touch `std::process::Command`; every other stage goes through
//!   `CommandRunner` so it stays scriptable in tests.

#[test]
fn core_crate_has_no_dependencies() {
    let manifest = include_str!("../crates/cts_core/Cargo.toml");
    let mut in_dependencies = false;

    for raw_line in manifest.lines() {
        let line = raw_line.trim();
        if line.starts_with('[') {
            in_dependencies = line == "[dependencies]";
            continue;
        }

        let line_no_comment = line.split('#').next().unwrap_or("").trim();
        if in_dependencies && !line_no_comment.is_empty() {
            panic!("cts_core must stay dependency-free, found `{}`", line_no_comment);
        }
    }
}

#[test]
fn only_process_module_spawns_commands() {
    let sources = [
        ("build.rs", include_str!("../src/harness/build.rs")),
        ("cleanup.rs", include_str!("../src/harness/cleanup.rs")),
        ("preflight.rs", include_str!("../src/harness/preflight.rs")),
        ("reconcile.rs", include_str!("../src/harness/reconcile.rs")),
        ("regression.rs", include_str!("../src/harness/regression.rs")),
        ("workflow.rs", include_str!("../src/harness/workflow.rs")),
        ("commands.rs", include_str!("../src/cli/commands.rs")),
    ];

    for (name, source) in sources {
        assert!(
            !source.contains("std::process::Command") && !source.contains("Command::new("),
            "{} spawns processes directly; use CommandRunner",
            name
        );
    }
}
