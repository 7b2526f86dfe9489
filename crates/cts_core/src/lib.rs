//! Provide the canonical vocabulary of the imake conformance corpus.
//!
//! This crate names everything the harness and its tests need to agree on: the pinned GNU make
//! release, where it is downloaded from, and how the unpacked corpus is laid out on disk.
//!
//! ## Notes
//!
//! - This is a “vocabulary” crate: **no IO**, no global state, no process handling.
//! - Path helpers only join components. Whether a path exists is for the caller to observe.
//!
//! ## Examples
//! ```rust
//! use cts_core::corpus;
//! use cts_core::layout::CorpusLayout;
//!
//! let layout = CorpusLayout::new("cts", corpus::PINNED_VERSION).unwrap();
//! assert_eq!(layout.archive().to_str(), Some("cts/make-4.3.tar.gz"));
//! assert_eq!(layout.harness_link().to_str(), Some("cts/make-4.3/make"));
//! ```

pub mod corpus;
pub mod errors;
pub mod layout;

pub use errors::VersionError;
pub use layout::CorpusLayout;
