//! Canonical names for the GNU make regression corpus.
//!
//! The harness pins a single upstream release so that every run exercises the same tests.
//! Changing [`PINNED_VERSION`] is the only supported way to move to a newer corpus.

use crate::errors::VersionError;

/// The GNU make release whose test suite is used as the reference corpus.
pub const PINNED_VERSION: &str = "4.3";

/// Base URL of the upstream release mirror (no trailing slash).
pub const DEFAULT_MIRROR: &str = "http://ftp.gnu.org/gnu/make";

/// Prefix shared by the archive and the unpacked directory (`make-<VERSION>`).
pub const RELEASE_PREFIX: &str = "make";

/// Archive suffix for upstream tarballs.
pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

/// Name of the workspace directory holding archives and unpacked corpora.
pub const DEFAULT_WORKSPACE_DIR: &str = "cts";

/// File name the corpus' own tooling resolves as "the make under test".
pub const HARNESS_LINK_NAME: &str = "make";

/// Executable name of the candidate build tool.
pub const CANDIDATE_NAME: &str = "imake";

/// Candidate binary produced by `cargo build`, relative to the project root.
pub const DEFAULT_CANDIDATE_PATH: &str = "target/debug/imake";

/// Configuration script shipped with the corpus.
pub const CONFIGURE_SCRIPT: &str = "configure";

/// Build-configuration artifact produced by [`CONFIGURE_SCRIPT`].
pub const MAKEFILE: &str = "Makefile";

/// Makefile target that runs the corpus' regression suite.
pub const REGRESSION_TARGET: &str = "check-regression";

/// Variable carrying extra flags for the regression runner. The harness always passes it empty.
pub const TEST_FLAGS_VAR: &str = "MAKETESTFLAGS";

/// Transient artifact the regression runner leaves behind, relative to the corpus directory.
pub const TRANSIENT_ARTIFACT: &[&str] = &["tests", "all"];

/// Environment variable that marks every process spawned by one harness session.
pub const SESSION_ENV_VAR: &str = "IMAKE_CTS_SESSION";

/// Directory name of an unpacked corpus, e.g. `make-4.3`.
pub fn release_name(version: &str) -> String {
    format!("{}-{}", RELEASE_PREFIX, version)
}

/// Archive file name for a release, e.g. `make-4.3.tar.gz`.
pub fn archive_name(version: &str) -> String {
    format!("{}{}", release_name(version), ARCHIVE_SUFFIX)
}

/// Download URL for a release on `mirror`.
///
/// ## Examples
/// ```rust
/// use cts_core::corpus::{archive_url, DEFAULT_MIRROR};
///
/// assert_eq!(
///     archive_url(DEFAULT_MIRROR, "4.3"),
///     "http://ftp.gnu.org/gnu/make/make-4.3.tar.gz"
/// );
/// ```
pub fn archive_url(mirror: &str, version: &str) -> String {
    format!("{}/{}", mirror.trim_end_matches('/'), archive_name(version))
}

/// Check that `version` can be embedded in file names without escaping the workspace.
pub fn validate_version(version: &str) -> Result<(), VersionError> {
    if version.trim().is_empty() {
        return Err(VersionError::Empty);
    }
    if let Some(ch) = version
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')))
    {
        return Err(VersionError::InvalidChar {
            version: version.to_string(),
            ch,
        });
    }
    if version.chars().all(|c| c == '.') {
        return Err(VersionError::DotsOnly(version.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_and_archive_names() {
        assert_eq!(release_name("4.3"), "make-4.3");
        assert_eq!(archive_name("4.3"), "make-4.3.tar.gz");
    }

    #[test]
    fn test_archive_url_tolerates_trailing_slash() {
        assert_eq!(
            archive_url("http://mirror.example/make/", "4.2.1"),
            "http://mirror.example/make/make-4.2.1.tar.gz"
        );
    }

    #[test]
    fn test_validate_version() {
        assert!(validate_version("4.3").is_ok());
        assert!(validate_version("4.4.1_rc-2").is_ok());
        assert_eq!(validate_version(""), Err(VersionError::Empty));
        assert_eq!(validate_version("  "), Err(VersionError::Empty));
        assert!(matches!(
            validate_version("../4.3"),
            Err(VersionError::InvalidChar { ch: '/', .. })
        ));
        assert_eq!(validate_version(".."), Err(VersionError::DotsOnly("..".to_string())));
    }
}
