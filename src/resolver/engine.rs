//! Recursive dependency resolution
//!
//! Walks a project descriptor's dependency tree depth-first, resolving each
//! coordinate to an extracted cache directory and emitting records in
//! dependency-first order. The walk is single-threaded and blocking; the
//! on-disk cache makes repeat runs idempotent without network access.

use super::assets::{candidate_asset_names, collect_names, select_asset};
use super::cache::{cache_guard, cache_value};
use super::coordinate::Dep;
use super::error::{ResolveError, ResolveResult};
use super::extract;
use super::manifest::{DESCRIPTOR_FILE, ProjectManifest};
use super::provider::{GithubProvider, Release, ReleaseProvider};
use crate::config::Settings;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One resolved dependency, ready to be wired into a process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDependency {
    /// Absolute path to the extracted artifact root
    pub dir: PathBuf,

    /// Directory to add to the executable search path. May contain
    /// unexpanded `${VAR}` references.
    pub bin_dir: String,

    /// Environment exports declared by the dependency's own descriptor,
    /// unexpanded.
    pub exports: BTreeMap<String, String>,
}

/// Resolves dependency coordinates against a release provider and the
/// local cache.
pub struct Resolver<'a> {
    settings: &'a Settings,
    provider: Box<dyn ReleaseProvider + 'a>,
}

impl<'a> Resolver<'a> {
    /// Resolver backed by the GitHub release provider.
    pub fn new(settings: &'a Settings) -> ResolveResult<Self> {
        let provider = GithubProvider::new(settings)?;
        Ok(Self::with_provider(settings, Box::new(provider)))
    }

    /// Resolver with a caller-supplied provider. Tests use this to resolve
    /// against an in-memory release listing.
    pub fn with_provider(settings: &'a Settings, provider: Box<dyn ReleaseProvider + 'a>) -> Self {
        Self { settings, provider }
    }

    /// Version directory for a dependency:
    /// `{cache_root}/deps/{server}/{owner}/{repo}/{version}`
    ///
    /// Fully determined by the immutable coordinate, which is what makes
    /// existence-keyed caching under it sound.
    pub fn version_dir(&self, dep: &Dep) -> PathBuf {
        self.settings
            .cache_root
            .join("deps")
            .join(&dep.server)
            .join(&dep.owner)
            .join(&dep.repo)
            .join(&dep.version)
    }

    /// Extraction target for a dependency: `{version_dir}/extracted`
    pub fn extracted_dir(&self, dep: &Dep) -> PathBuf {
        self.version_dir(dep).join("extracted")
    }

    /// Resolve a single dependency to its extracted directory.
    ///
    /// If the directory already exists the dependency is considered
    /// resolved and no network access happens. On a miss: fetch metadata
    /// (memoized), select and download the asset (memoized, atomic via
    /// temp-then-rename), extract into a staging directory and rename it
    /// into place. Staging keeps the existence guard sound: a failed
    /// extraction never leaves a half-populated `extracted/`.
    pub fn resolve(&self, dep: &Dep) -> ResolveResult<PathBuf> {
        let version_dir = self.version_dir(dep);
        let extracted = version_dir.join("extracted");

        cache_guard(&extracted, || {
            fs::create_dir_all(&version_dir)?;
            let downloaded = self.download_asset_file(&version_dir, dep)?;

            let staging = tempfile::Builder::new()
                .prefix("extracted.partial-")
                .tempdir_in(&version_dir)?;
            extract::extract(&downloaded, staging.path())?;

            let staged = staging.keep();
            fs::rename(&staged, &extracted)?;
            info!(dep = %dep, dir = %extracted.display(), "extracted");
            Ok(())
        })?;

        Ok(extracted)
    }

    /// Fetch release metadata, pick the right asset and download it into
    /// the version directory. Returns the path of the downloaded archive.
    fn download_asset_file(&self, version_dir: &Path, dep: &Dep) -> ResolveResult<PathBuf> {
        let os = std::env::consts::OS;
        let arch = std::env::consts::ARCH;

        let metadata_file = version_dir.join(format!(
            "{}-{}-{}-{}.githubReleaseJson",
            dep.repo, os, arch, dep.version
        ));
        let release: Release =
            cache_value(&metadata_file, || self.provider.release_by_tag(dep))?;

        let candidates = candidate_asset_names(dep, os, arch);
        let available = release.asset_names();
        let selected = select_asset(&candidates, &available).ok_or_else(|| {
            ResolveError::NoMatchingAsset {
                dep: dep.to_string(),
                attempted: collect_names(&candidates),
            }
        })?;
        let file_name = selected.file_name();
        let asset = release
            .asset(&file_name)
            .ok_or_else(|| ResolveError::NoMatchingAsset {
                dep: dep.to_string(),
                attempted: collect_names(&candidates),
            })?;
        info!(dep = %dep, asset = %asset.name, "found asset");

        let downloaded = version_dir.join(&file_name);
        cache_guard(&downloaded, || {
            fs::create_dir_all(version_dir)?;

            // Download to a temp name and rename into place, so a
            // half-written file is never mistaken for a cached download.
            let tmp = version_dir.join(format!("{file_name}.tmp"));
            let mut out = fs::File::create(&tmp)?;
            let bytes = self.provider.download_asset(dep, asset, &mut out)?;
            drop(out);
            fs::rename(&tmp, &downloaded)?;

            debug!(dep = %dep, bytes, file = %downloaded.display(), "downloaded");
            Ok(())
        })?;

        Ok(downloaded)
    }

    /// Resolve a whole project descriptor into an ordered list of
    /// extracted dependencies.
    pub fn resolve_project(&self, descriptor: &Path) -> ResolveResult<Vec<ExtractedDependency>> {
        self.resolve_tree(descriptor, &[])
    }

    /// Recursive walk. `stack` holds the version-independent identities on
    /// the current path, for cycle detection; each branch extends a copy,
    /// so sibling subtrees never see each other's entries.
    ///
    /// Output is dependency-first: everything a dependency needs appears
    /// before the dependency itself.
    pub fn resolve_tree(
        &self,
        descriptor: &Path,
        stack: &[String],
    ) -> ResolveResult<Vec<ExtractedDependency>> {
        // Absence of a nested descriptor is normal for leaf dependencies
        if !descriptor.exists() {
            return Ok(Vec::new());
        }

        let manifest = ProjectManifest::load(descriptor)?;
        let mut resolved = Vec::new();

        for dep in manifest.deps() {
            let identity = dep.identity();
            if stack.contains(&identity) {
                let mut cycle = stack.to_vec();
                cycle.push(identity);
                return Err(ResolveError::CycleDetected {
                    path: cycle.join("->"),
                });
            }

            let mut sub_stack = stack.to_vec();
            sub_stack.push(identity);

            // A failed resolution is reported but does not abort siblings;
            // the walk continues against the (absent) extracted directory.
            let extracted = match self.resolve(&dep) {
                Ok(dir) => dir,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    eprintln!("Error: {dep}: {e}");
                    self.extracted_dir(&dep)
                }
            };

            let nested = extracted.join(DESCRIPTOR_FILE);
            let sub = self.resolve_tree(&nested, &sub_stack)?;
            resolved.extend(sub);

            // The dependency's own descriptor declares its exports
            let exports = if nested.exists() {
                ProjectManifest::load(&nested)
                    .map(|m| m.env)
                    .unwrap_or_default()
            } else {
                BTreeMap::new()
            };

            let bin_dir = manifest
                .bin_dir
                .clone()
                .unwrap_or_else(|| extracted.join("bin").display().to_string());

            resolved.push(ExtractedDependency {
                dir: extracted,
                bin_dir,
                exports,
            });
        }

        Ok(resolved)
    }
}
