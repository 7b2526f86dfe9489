#![forbid(unsafe_code)]
//! imake conformance-test harness
//!
//! Validates a freshly built `imake` against the GNU make regression suite: it fetches a pinned
//! release of the suite, links the candidate binary where the suite expects `make`, runs the
//! suite's own regression target and cleans up afterwards. Individual test results are left to
//! the suite's runner; the harness only fails when one of its own steps does.
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` with `?` / `map_err`. The `cli` and `harness` modules
//!   enforce `#![deny(clippy::unwrap_used)]`.
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod cli;
pub mod config;
pub mod harness;
pub mod version;

pub use config::HarnessConfig;
pub use harness::{HarnessError, Stage, StageOutcome, Workflow, WorkflowReport};
