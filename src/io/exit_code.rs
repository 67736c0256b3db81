//! Exit codes for CLI operations following Unix conventions.
//!
//! # Exit Code Semantics
//!
//! - `0`: Success - dependencies resolved, command ran (its own exit code
//!   is propagated instead when a command is launched)
//! - `1`: General error - unspecified failure
//! - `2`: Blocking error - structurally broken state that should halt
//!   automation (dependency cycles, traversal attempts)
//! - `3-125`: Specific recoverable errors
//! - `126-255`: Reserved by shell

use crate::resolver::{ExtractError, ResolveError};

/// Standard exit codes for CLI operations.
///
/// These codes follow Unix conventions where 0 indicates success,
/// and non-zero values indicate various error conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Operation succeeded (code 0)
    Success = 0,

    /// Unspecified error occurred (code 1)
    GeneralError = 1,

    /// Critical error that should halt automation (code 2)
    BlockingError = 2,

    /// Release or asset not found (code 3)
    NotFound = 3,

    /// Failed to parse a dependency coordinate (code 4)
    ParseError = 4,

    /// File I/O error (code 5)
    IoError = 5,

    /// Configuration or descriptor error (code 6)
    ConfigError = 6,

    /// Operation not supported (code 7)
    UnsupportedOperation = 7,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl ExitCode {
    /// Convert a `ResolveError` to the appropriate exit code.
    ///
    /// Maps specific error types to semantic exit codes that scripts
    /// can use to determine appropriate recovery actions.
    pub fn from_error(error: &ResolveError) -> Self {
        match error {
            // A cycle means the graph can never complete
            ResolveError::CycleDetected { .. } => ExitCode::BlockingError,

            ResolveError::Parse(_) => ExitCode::ParseError,

            ResolveError::ReleaseNotFound { .. } | ResolveError::NoMatchingAsset { .. } => {
                ExitCode::NotFound
            }

            ResolveError::DescriptorParse { .. } => ExitCode::ConfigError,
            ResolveError::DescriptorRead { .. } | ResolveError::Io(_) => ExitCode::IoError,

            ResolveError::Extract(e) => match e {
                ExtractError::PathTraversal { .. } => ExitCode::BlockingError,
                ExtractError::UnsupportedFormat { .. }
                | ExtractError::UnsupportedEntryType { .. } => ExitCode::UnsupportedOperation,
                _ => ExitCode::GeneralError,
            },

            // Everything else is a general error
            _ => ExitCode::GeneralError,
        }
    }

    /// Check if this exit code indicates a blocking error.
    ///
    /// Blocking errors should halt automation pipelines.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        matches!(self, ExitCode::BlockingError)
    }

    /// Check if this exit code indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }
}
