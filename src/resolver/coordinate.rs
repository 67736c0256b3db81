//! Dependency coordinate parsing - handles server/owner/repo-version syntax

use super::error::DepParseError;
use std::fmt;

/// A resolved, immutable dependency coordinate.
///
/// The canonical textual form is `server/owner/repo-version`, e.g.
/// `github.com/bazurto/openjdk-linux-amd64-v9.0.4`. The repo name may
/// itself contain hyphens; the version is always the last hyphen-delimited
/// segment of the final path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dep {
    /// Host identifying the release provider, e.g. "github.com"
    pub server: String,

    /// Namespace (user or organization)
    pub owner: String,

    /// Artifact/repository name
    pub repo: String,

    /// Version tag, always prefixed with lowercase 'v'
    pub version: String,
}

impl Dep {
    /// Parse a coordinate string into a `Dep`.
    ///
    /// Validation runs in a fixed order so each malformed shape maps to
    /// exactly one error variant (see `DepParseError`).
    pub fn parse(input: &str) -> Result<Self, DepParseError> {
        let parts: Vec<&str> = input.split('/').collect();
        if parts.len() != 3 {
            return Err(DepParseError::InvalidFormat {
                input: input.to_string(),
            });
        }

        let server = parts[0];
        if server.is_empty() {
            return Err(DepParseError::MissingServer {
                input: input.to_string(),
            });
        }

        let owner = parts[1];
        if owner.is_empty() {
            return Err(DepParseError::MissingOwner {
                input: input.to_string(),
            });
        }

        let segments: Vec<&str> = parts[2].split('-').collect();
        if segments.len() < 2 {
            return Err(DepParseError::MissingVersion {
                input: input.to_string(),
            });
        }

        let repo = segments[..segments.len() - 1].join("-");
        if repo.is_empty() {
            return Err(DepParseError::MissingRepo {
                input: input.to_string(),
            });
        }

        let version = segments[segments.len() - 1];
        if version.starts_with('V') {
            return Err(DepParseError::WrongVersionCase {
                input: input.to_string(),
            });
        }
        if !version.starts_with('v') {
            return Err(DepParseError::MissingVersionPrefix {
                input: input.to_string(),
            });
        }
        if version.len() < 2 {
            return Err(DepParseError::MissingVersionNumber {
                input: input.to_string(),
            });
        }

        Ok(Self {
            server: server.to_string(),
            owner: owner.to_string(),
            repo,
            version: version.to_string(),
        })
    }

    /// Version-independent identity, used as the cycle-detection key.
    pub fn identity(&self) -> String {
        format!("{}/{}/{}", self.server, self.owner, self.repo)
    }
}

impl fmt::Display for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}-{}",
            self.server, self.owner, self.repo, self.version
        )
    }
}
