//! Errors raised while validating corpus vocabulary.

use std::fmt;

/// A corpus version string that cannot be used to build a workspace layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// The version string was empty (or only whitespace).
    Empty,
    /// The version contains a character outside `[A-Za-z0-9._-]`.
    InvalidChar { version: String, ch: char },
    /// The version is made only of dots (`.` or `..`), which would escape the workspace.
    DotsOnly(String),
}

impl fmt::Display for VersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionError::Empty => write!(f, "corpus version must not be empty"),
            VersionError::InvalidChar { version, ch } => {
                write!(f, "corpus version '{}' contains invalid character {:?}", version, ch)
            }
            VersionError::DotsOnly(version) => {
                write!(f, "corpus version '{}' is not a release name", version)
            }
        }
    }
}

impl std::error::Error for VersionError {}
