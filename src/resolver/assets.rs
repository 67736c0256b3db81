//! Release asset name generation and selection
//!
//! Artifact names follow the companion release-publishing convention, so
//! matching is exact string equality. Fuzzy matching would silently accept
//! wrong-platform artifacts.

use super::coordinate::Dep;

/// Archive extensions tried for every candidate stem, in order.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["zip", "tgz", "tar.gz"];

/// One guess at the artifact filename: a canonical stem plus an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateAssetName {
    /// e.g. "openjdk-linux-amd64-v9.0.4"
    pub stem: String,

    /// e.g. "zip"
    pub ext: String,
}

impl CandidateAssetName {
    /// Full filename, e.g. "openjdk-linux-amd64-v9.0.4.zip"
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.stem, self.ext)
    }
}

/// Generate candidate asset names for a dependency, most specific first:
///
/// 1. `{repo}-{os}-{arch}-{version}`
/// 2. `{repo}-{version}`
/// 3. `{repo}`
///
/// Every supported extension is tried for a stem before the next, less
/// specific stem is considered.
pub fn candidate_asset_names(dep: &Dep, os: &str, arch: &str) -> Vec<CandidateAssetName> {
    let stems = [
        format!("{}-{}-{}-{}", dep.repo, os, arch, dep.version),
        format!("{}-{}", dep.repo, dep.version),
        dep.repo.clone(),
    ];

    let mut candidates = Vec::with_capacity(stems.len() * SUPPORTED_EXTENSIONS.len());
    for stem in &stems {
        for ext in SUPPORTED_EXTENSIONS {
            candidates.push(CandidateAssetName {
                stem: stem.clone(),
                ext: ext.to_string(),
            });
        }
    }
    candidates
}

/// Pick the first candidate (in priority order) whose exact file name
/// appears among the available asset names.
pub fn select_asset<'a>(
    candidates: &'a [CandidateAssetName],
    available: &[String],
) -> Option<&'a CandidateAssetName> {
    candidates
        .iter()
        .find(|candidate| available.iter().any(|name| *name == candidate.file_name()))
}

/// All candidate file names joined for diagnostics.
pub fn collect_names(candidates: &[CandidateAssetName]) -> String {
    candidates
        .iter()
        .map(CandidateAssetName::file_name)
        .collect::<Vec<_>>()
        .join(",")
}
