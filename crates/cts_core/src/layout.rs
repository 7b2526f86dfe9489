//! On-disk layout of a conformance workspace.
//!
//! ```text
//! <workspace>/
//! ├── make-<VERSION>.tar.gz      fetched archive
//! └── make-<VERSION>/            unpacked corpus
//!     ├── make -> <candidate>    harness link
//!     ├── Makefile               generated by ./configure
//!     └── tests/all              transient artifact
//! ```

use std::path::{Component, Path, PathBuf};

use crate::corpus;
use crate::errors::VersionError;

/// Paths of one pinned corpus inside a workspace directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusLayout {
    workspace: PathBuf,
    version: String,
}

impl CorpusLayout {
    /// Create a layout rooted at `workspace` for `version`.
    pub fn new(workspace: impl AsRef<Path>, version: &str) -> Result<Self, VersionError> {
        corpus::validate_version(version)?;
        Ok(Self {
            workspace: workspace.as_ref().to_path_buf(),
            version: version.to_string(),
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// The workspace directory (`cts/`).
    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// `cts/make-<VERSION>.tar.gz`
    pub fn archive(&self) -> PathBuf {
        self.workspace.join(corpus::archive_name(&self.version))
    }

    /// `cts/make-<VERSION>/`
    pub fn corpus_dir(&self) -> PathBuf {
        self.workspace.join(corpus::release_name(&self.version))
    }

    /// `cts/make-<VERSION>/make`
    pub fn harness_link(&self) -> PathBuf {
        self.corpus_dir().join(corpus::HARNESS_LINK_NAME)
    }

    /// `cts/make-<VERSION>/Makefile`
    pub fn makefile(&self) -> PathBuf {
        self.corpus_dir().join(corpus::MAKEFILE)
    }

    /// `cts/make-<VERSION>/tests/all`
    pub fn transient_artifact(&self) -> PathBuf {
        corpus::TRANSIENT_ARTIFACT
            .iter()
            .fold(self.corpus_dir(), |path, segment| path.join(segment))
    }

    /// Download URL for this layout's archive on `mirror`.
    pub fn archive_url(&self, mirror: &str) -> String {
        corpus::archive_url(mirror, &self.version)
    }
}

/// Path leading from directory `from_dir` to `to`, computed lexically.
///
/// Both paths must be relative (to the same base) or both absolute. Returns `None` when no
/// lexical answer exists, e.g. when `from_dir` climbs above its base with `..`.
///
/// ## Examples
/// ```rust
/// use std::path::Path;
/// use cts_core::layout::relative_path;
///
/// let target = relative_path(Path::new("cts/make-4.3"), Path::new("target/debug/imake"));
/// assert_eq!(target.as_deref(), Some(Path::new("../../target/debug/imake")));
/// ```
pub fn relative_path(from_dir: &Path, to: &Path) -> Option<PathBuf> {
    if from_dir.is_absolute() != to.is_absolute() {
        return None;
    }
    let from = normalize(from_dir)?;
    let to = normalize(to)?;

    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();
    let climb = &from[common..];
    if climb.iter().any(|c| matches!(c, Component::ParentDir)) {
        return None;
    }

    let mut path: PathBuf = climb.iter().map(|_| Component::ParentDir).collect();
    path.extend(&to[common..]);
    if path.as_os_str().is_empty() {
        path.push(Component::CurDir);
    }
    Some(path)
}

/// Drop `.` and fold `name/..` pairs. Leading `..` of a relative path are kept.
fn normalize(path: &Path) -> Option<Vec<Component<'_>>> {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => return None,
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    Some(out)
}
