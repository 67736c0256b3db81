//! Error types for dependency resolution

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while parsing a dependency coordinate string.
///
/// Coordinates have the form `server/owner/repo-version`. Each way a
/// coordinate can be malformed gets its own variant so callers (and tests)
/// can distinguish them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DepParseError {
    #[error(
        "unable to parse dependency '{input}': invalid format\nSuggestion: Coordinates look like 'github.com/owner/repo-v1.2.3'"
    )]
    InvalidFormat { input: String },

    #[error("unable to parse dependency '{input}': server name is required")]
    MissingServer { input: String },

    #[error("unable to parse dependency '{input}': owner name is required")]
    MissingOwner { input: String },

    #[error("unable to parse dependency '{input}': no version")]
    MissingVersion { input: String },

    #[error("unable to parse dependency '{input}': repo name is required")]
    MissingRepo { input: String },

    #[error("unable to parse dependency '{input}': version prefix should be 'v' not 'V'")]
    WrongVersionCase { input: String },

    #[error("unable to parse dependency '{input}': could not find a version prefixed with 'v'")]
    MissingVersionPrefix { input: String },

    #[error("unable to parse dependency '{input}': must have a version number")]
    MissingVersionNumber { input: String },
}

/// Errors produced while extracting a downloaded archive.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("archive file extension not supported: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error(
        "illegal entry path '{entry}' escapes destination '{}'\nSuggestion: The archive may be crafted maliciously; do not extract it by hand either", dest.display()
    )]
    PathTraversal { entry: String, dest: PathBuf },

    #[error("unsupported entry type for '{entry}' (only regular files and directories are allowed)")]
    UnsupportedEntryType { entry: String },

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Top-level error for resolution operations.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Parse(#[from] DepParseError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("no release tagged '{tag}' for {dep}")]
    ReleaseNotFound { dep: String, tag: String },

    #[error("could not find asset {attempted} in dependency {dep}")]
    NoMatchingAsset { dep: String, attempted: String },

    #[error(
        "detected circular dependency: {path}\nSuggestion: Break the cycle by removing one of the coordinates from its .bz file"
    )]
    CycleDetected { path: String },

    #[error("failed to read descriptor '{}': {source}", path.display())]
    DescriptorRead {
        path: PathBuf,
        source: io::Error,
    },

    #[error("invalid descriptor '{}': {reason}", path.display())]
    DescriptorParse { path: PathBuf, reason: String },

    #[error("HTTP error: {0}\nSuggestion: Check network connection and server tokens")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}\nSuggestion: Check file permissions and disk space")]
    Io(#[from] io::Error),
}

/// Result type for resolution operations
pub type ResolveResult<T> = Result<T, ResolveError>;

impl ResolveError {
    /// True for errors that must terminate the whole resolution, not just
    /// the dependency that produced them.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ResolveError::CycleDetected { .. })
    }
}
