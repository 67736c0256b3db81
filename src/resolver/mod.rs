//! Dependency resolution and artifact acquisition
//!
//! The pipeline: parse coordinates (`coordinate`), query the release
//! provider (`provider`) through the metadata cache (`cache`), pick the
//! platform asset (`assets`), download and extract it (`extract`), and walk
//! nested descriptors recursively (`engine`).

pub mod assets;
pub mod cache;
pub mod coordinate;
pub mod engine;
pub mod error;
pub mod extract;
pub mod manifest;
pub mod provider;

pub use coordinate::Dep;
pub use engine::{ExtractedDependency, Resolver};
pub use error::{DepParseError, ExtractError, ResolveError, ResolveResult};
pub use manifest::{DESCRIPTOR_FILE, ProjectManifest};
pub use provider::{GithubProvider, Release, ReleaseAsset, ReleaseProvider};
