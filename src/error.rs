//! Crate-level error type for dependency extraction.

use std::path::PathBuf;

use crate::parser::ParseError;

/// Errors that abort an extraction.
///
/// Problems with individual dependencies never surface here; those are
/// skipped and reported through [`crate::extract::SkippedDependencies`].
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// `npm ls` failed and there is no node_modules directory to list.
    #[error(
        "node_modules isn't found in '{}'. Hint: Restore node_modules folder by running npm install or npm ci.",
        .project_dir.display()
    )]
    NodeModulesMissing { project_dir: PathBuf },

    /// The npm cache directory reported by `npm config get cache` does not exist.
    #[error(
        "_cacache folder is not found in '{}'. Hint: Delete node_modules directory and run npm install or npm ci.",
        .path.display()
    )]
    CacheDirMissing { path: PathBuf },

    /// A node with a version could not be decoded.
    #[error("failed to parse '{node}' from npm ls output: {source}")]
    MalformedNode {
        node: String,
        #[source]
        source: serde_json::Error,
    },

    /// A node had neither a version nor any sign of being an unresolved peer.
    #[error("failed to parse '{node}' from npm ls output: missing version")]
    MissingVersion { node: String },

    /// The `npm ls` output as a whole is not JSON.
    #[error("failed to parse npm ls output: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// An npm command other than `npm ls` failed.
    #[error("{0}")]
    NpmFailed(String),

    /// `npm --version` printed something that is not a semantic version.
    #[error("failed to parse npm version '{output}': {source}")]
    InvalidNpmVersion {
        output: String,
        #[source]
        source: semver::Error,
    },

    /// The project's package.json could not be read.
    #[error(transparent)]
    Manifest(#[from] ParseError),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;
