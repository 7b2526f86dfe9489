//! Harness configuration
//!
//! Defaults reproduce the canonical setup: GNU make 4.3 from ftp.gnu.org, unpacked under `cts/`,
//! wired to the project's debug build of `imake`.

use std::path::{Path, PathBuf};

use cts_core::corpus;
use cts_core::layout::relative_path;
use cts_core::{CorpusLayout, VersionError};

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Directory where the build step runs; the workspace is resolved against it
    pub project_root: PathBuf,
    /// Workspace directory holding archives and unpacked corpora
    pub workspace_dir: PathBuf,
    /// Pinned corpus release
    pub corpus_version: String,
    /// Base URL the archive is fetched from
    pub mirror: String,
    /// Explicit harness link target, relative to the corpus directory (or absolute).
    /// `None` links the project's own debug build.
    pub candidate: Option<PathBuf>,
    /// HTTP client used for the preflight probe and the fetch
    pub fetch_tool: String,
    /// Program and arguments producing the candidate binary
    pub build_command: Vec<String>,
    /// Program that drives the corpus Makefile
    pub test_driver: String,
    /// Process name targeted by the fallback reap
    pub reap_name: String,
    /// Skip the build step (e.g. when the link points at a reference make)
    pub skip_build: bool,
    /// procfs mount scanned for session-marked processes
    pub proc_root: PathBuf,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            workspace_dir: PathBuf::from(corpus::DEFAULT_WORKSPACE_DIR),
            corpus_version: corpus::PINNED_VERSION.to_string(),
            mirror: corpus::DEFAULT_MIRROR.to_string(),
            candidate: None,
            fetch_tool: "wget".to_string(),
            build_command: vec!["cargo".to_string(), "build".to_string()],
            test_driver: "make".to_string(),
            reap_name: "make".to_string(),
            skip_build: false,
            proc_root: PathBuf::from("/proc"),
        }
    }
}

impl HarnessConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = root.into();
        self
    }

    pub fn with_workspace_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workspace_dir = dir.into();
        self
    }

    pub fn with_corpus_version(mut self, version: impl Into<String>) -> Self {
        self.corpus_version = version.into();
        self
    }

    pub fn with_mirror(mut self, mirror: impl Into<String>) -> Self {
        self.mirror = mirror.into();
        self
    }

    /// Set the harness link target (e.g. `/usr/bin/make` to validate against GNU make itself)
    pub fn with_candidate(mut self, candidate: impl Into<PathBuf>) -> Self {
        self.candidate = Some(candidate.into());
        self
    }

    pub fn with_fetch_tool(mut self, tool: impl Into<String>) -> Self {
        self.fetch_tool = tool.into();
        self
    }

    pub fn with_build_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.build_command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_test_driver(mut self, driver: impl Into<String>) -> Self {
        self.test_driver = driver.into();
        self
    }

    pub fn with_reap_name(mut self, name: impl Into<String>) -> Self {
        self.reap_name = name.into();
        self
    }

    pub fn with_skip_build(mut self, skip: bool) -> Self {
        self.skip_build = skip;
        self
    }

    pub fn with_proc_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.proc_root = root.into();
        self
    }

    /// Workspace directory resolved against the project root.
    pub fn workspace_path(&self) -> PathBuf {
        resolve(&self.project_root, &self.workspace_dir)
    }

    /// Corpus layout for the configured workspace and version.
    pub fn layout(&self) -> Result<CorpusLayout, VersionError> {
        CorpusLayout::new(self.workspace_path(), &self.corpus_version)
    }

    /// The binary `cargo build` produces, resolved against the project root.
    pub fn candidate_binary(&self) -> PathBuf {
        resolve(&self.project_root, Path::new(corpus::DEFAULT_CANDIDATE_PATH))
    }

    /// What the harness link in `layout` should point at.
    ///
    /// An explicit candidate is used verbatim. Otherwise the link leads to
    /// [`candidate_binary`](Self::candidate_binary), relative to the corpus directory when such
    /// a path exists and absolute when it does not.
    pub fn link_target(&self, layout: &CorpusLayout) -> PathBuf {
        if let Some(candidate) = &self.candidate {
            return candidate.clone();
        }
        let binary = self.candidate_binary();
        let corpus_dir = layout.corpus_dir();

        relative_path(&corpus_dir, &binary)
            .or_else(|| {
                let from = std::path::absolute(&corpus_dir).ok()?;
                let to = std::path::absolute(&binary).ok()?;
                relative_path(&from, &to)
            })
            .or_else(|| std::path::absolute(&binary).ok())
            .unwrap_or(binary)
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() || root == Path::new(".") {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_canonical_setup() {
        let config = HarnessConfig::default();
        assert_eq!(config.corpus_version, "4.3");
        assert_eq!(config.mirror, "http://ftp.gnu.org/gnu/make");
        assert_eq!(config.candidate, None);
        assert_eq!(config.fetch_tool, "wget");
        assert_eq!(config.build_command, ["cargo", "build"]);
        assert_eq!(config.reap_name, "make");
        assert!(!config.skip_build);
    }

    #[test]
    fn test_workspace_path_resolution() {
        let config = HarnessConfig::new();
        assert_eq!(config.workspace_path(), PathBuf::from("cts"));

        let config = HarnessConfig::new().with_project_root("/src/imake");
        assert_eq!(config.workspace_path(), PathBuf::from("/src/imake/cts"));

        let config = HarnessConfig::new()
            .with_project_root("/src/imake")
            .with_workspace_dir("/var/cache/cts");
        assert_eq!(config.workspace_path(), PathBuf::from("/var/cache/cts"));
    }

    #[test]
    fn test_link_target_follows_workspace() {
        let config = HarnessConfig::new();
        let layout = config.layout().unwrap();
        assert_eq!(config.link_target(&layout), PathBuf::from("../../target/debug/imake"));

        let config = HarnessConfig::new()
            .with_project_root("/src/imake")
            .with_workspace_dir("build/cts");
        let layout = config.layout().unwrap();
        assert_eq!(config.link_target(&layout), PathBuf::from("../../../target/debug/imake"));

        let config = HarnessConfig::new()
            .with_project_root("/src/imake")
            .with_workspace_dir("/var/cache/cts");
        let layout = config.layout().unwrap();
        assert_eq!(
            config.link_target(&layout),
            PathBuf::from("../../../../src/imake/target/debug/imake")
        );
    }

    #[test]
    fn test_link_target_mixed_relative_and_absolute() {
        let config = HarnessConfig::new().with_workspace_dir("/var/cache/cts");
        let layout = config.layout().unwrap();
        let target = config.link_target(&layout);

        let resolved = layout.corpus_dir().join(&target);
        let expected = std::path::absolute("target/debug/imake").unwrap();
        assert_eq!(
            relative_path(Path::new("/"), &resolved),
            relative_path(Path::new("/"), &expected)
        );
    }

    #[test]
    fn test_explicit_candidate_is_verbatim() {
        let config = HarnessConfig::new()
            .with_workspace_dir("build/cts")
            .with_candidate("/usr/bin/make");
        let layout = config.layout().unwrap();
        assert_eq!(config.link_target(&layout), PathBuf::from("/usr/bin/make"));
    }

    #[test]
    fn test_layout_uses_configured_version() {
        let layout = HarnessConfig::new().with_corpus_version("4.2.1").layout().unwrap();
        assert_eq!(layout.archive(), PathBuf::from("cts/make-4.2.1.tar.gz"));

        assert!(HarnessConfig::new().with_corpus_version("").layout().is_err());
    }
}
