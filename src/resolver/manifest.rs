//! Project descriptor (`.bz` file) parsing and validation

use super::coordinate::Dep;
use super::error::{ResolveError, ResolveResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// File name of the project descriptor, both at the project root and
/// nested inside every extracted dependency.
pub const DESCRIPTOR_FILE: &str = ".bz";

/// A project descriptor: declared dependencies plus optional environment
/// wiring.
///
/// ```toml
/// deps = ["github.com/bazurto/openjdk-linux-amd64-v9.0.4"]
/// bin_dir = "${DIR}/bin"
///
/// [env]
/// JAVA_HOME = "${DIR}"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProjectManifest {
    /// Dependency coordinate strings, in declaration order
    #[serde(default)]
    pub deps: Vec<String>,

    /// Override for the binary directory of this project's dependencies.
    /// Unexpanded; `${DIR}` refers to the extracted directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin_dir: Option<String>,

    /// Environment exports, unexpanded. Carried through resolution and
    /// expanded by the environment assembly layer.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl ProjectManifest {
    /// Load a descriptor from disk.
    pub fn load(path: &Path) -> ResolveResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| {
            ResolveError::DescriptorRead {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Self::from_toml(&content).map_err(|reason| ResolveError::DescriptorParse {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parse a descriptor from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Parse the declared coordinates. A malformed line is reported to
    /// stderr and skipped; the remaining lines still resolve.
    pub fn deps(&self) -> Vec<Dep> {
        let mut deps = Vec::with_capacity(self.deps.len());
        for raw in &self.deps {
            match Dep::parse(raw) {
                Ok(dep) => deps.push(dep),
                Err(e) => eprintln!("Warning: {e}"),
            }
        }
        deps
    }
}
