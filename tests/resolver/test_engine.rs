//! Tests for the resolution engine against an in-memory release provider

use bz::Settings;
use bz::resolver::{
    Dep, Release, ReleaseAsset, ReleaseProvider, ResolveError, ResolveResult, Resolver,
};
use std::cell::Cell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use tempfile::tempdir;

/// In-memory provider: a map of `owner/repo/tag` to a release, and a map of
/// asset URL to archive bytes. Counts calls so tests can assert memoization.
#[derive(Clone, Default)]
struct FakeProvider {
    releases: HashMap<String, Release>,
    archives: HashMap<String, Vec<u8>>,
    release_calls: Rc<Cell<u32>>,
    download_calls: Rc<Cell<u32>>,
}

impl FakeProvider {
    fn add_release(&mut self, owner: &str, repo: &str, tag: &str, assets: &[(&str, &[u8])]) {
        let key = format!("{owner}/{repo}/{tag}");
        let mut release_assets = Vec::new();
        for (name, bytes) in assets {
            let url = format!("fake://{key}/{name}");
            self.archives.insert(url.clone(), bytes.to_vec());
            release_assets.push(ReleaseAsset {
                name: name.to_string(),
                url,
            });
        }
        self.releases.insert(
            key,
            Release {
                tag: tag.to_string(),
                assets: release_assets,
            },
        );
    }
}

impl ReleaseProvider for FakeProvider {
    fn release_by_tag(&self, dep: &Dep) -> ResolveResult<Release> {
        self.release_calls.set(self.release_calls.get() + 1);
        let key = format!("{}/{}/{}", dep.owner, dep.repo, dep.version);
        self.releases
            .get(&key)
            .cloned()
            .ok_or_else(|| ResolveError::ReleaseNotFound {
                dep: dep.to_string(),
                tag: dep.version.clone(),
            })
    }

    fn download_asset(
        &self,
        _dep: &Dep,
        asset: &ReleaseAsset,
        out: &mut dyn Write,
    ) -> ResolveResult<u64> {
        self.download_calls.set(self.download_calls.get() + 1);
        let bytes = self.archives.get(&asset.url).expect("unknown asset url");
        out.write_all(bytes)?;
        Ok(bytes.len() as u64)
    }
}

/// Build a zip archive in memory from (entry name, content) pairs.
fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        for (name, content) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
        }
        writer.finish().unwrap();
    }
    buf
}

fn settings_with_cache(root: &std::path::Path) -> Settings {
    let mut settings = Settings::default();
    settings.cache_root = root.to_path_buf();
    settings
}

/// The version-only asset name the resolver will match for `repo`/`tag`.
fn versioned_zip(repo: &str, tag: &str) -> String {
    format!("{repo}-{tag}.zip")
}

#[test]
fn test_resolve_extracts_into_deterministic_layout() {
    let temp = tempdir().unwrap();
    let settings = settings_with_cache(temp.path());

    let mut provider = FakeProvider::default();
    let archive = zip_bytes(&[("bin/tool", "#!/bin/sh\n"), ("README.md", "hi")]);
    provider.add_release(
        "owner",
        "tool",
        "v1.0.0",
        &[(&versioned_zip("tool", "v1.0.0"), &archive)],
    );

    let resolver = Resolver::with_provider(&settings, Box::new(provider));
    let dep = Dep::parse("github.com/owner/tool-v1.0.0").unwrap();

    let extracted = resolver.resolve(&dep).unwrap();
    assert_eq!(
        extracted,
        temp.path()
            .join("deps/github.com/owner/tool/v1.0.0/extracted")
    );
    assert!(extracted.join("bin/tool").exists());
    assert!(extracted.join("README.md").exists());

    // The downloaded archive sits next to the extraction, no .tmp left over
    let version_dir = extracted.parent().unwrap();
    assert!(version_dir.join("tool-v1.0.0.zip").exists());
    assert!(!version_dir.join("tool-v1.0.0.zip.tmp").exists());
}

#[test]
fn test_second_resolve_uses_only_the_filesystem() {
    let temp = tempdir().unwrap();
    let settings = settings_with_cache(temp.path());

    let mut provider = FakeProvider::default();
    let archive = zip_bytes(&[("data.txt", "cached")]);
    provider.add_release(
        "owner",
        "tool",
        "v1.0.0",
        &[(&versioned_zip("tool", "v1.0.0"), &archive)],
    );
    let release_calls = provider.release_calls.clone();
    let download_calls = provider.download_calls.clone();

    let resolver = Resolver::with_provider(&settings, Box::new(provider));
    let dep = Dep::parse("github.com/owner/tool-v1.0.0").unwrap();

    let first = resolver.resolve(&dep).unwrap();
    assert_eq!(release_calls.get(), 1);
    assert_eq!(download_calls.get(), 1);

    let second = resolver.resolve(&dep).unwrap();
    assert_eq!(first, second);
    // Untouched cache: no further provider traffic at all
    assert_eq!(release_calls.get(), 1);
    assert_eq!(download_calls.get(), 1);
}

#[test]
fn test_corrupt_metadata_cache_self_heals() {
    let temp = tempdir().unwrap();
    let settings = settings_with_cache(temp.path());

    let mut provider = FakeProvider::default();
    let archive = zip_bytes(&[("data.txt", "x")]);
    provider.add_release(
        "owner",
        "tool",
        "v1.0.0",
        &[(&versioned_zip("tool", "v1.0.0"), &archive)],
    );
    let release_calls = provider.release_calls.clone();

    let resolver = Resolver::with_provider(&settings, Box::new(provider));
    let dep = Dep::parse("github.com/owner/tool-v1.0.0").unwrap();

    let extracted = resolver.resolve(&dep).unwrap();
    assert_eq!(release_calls.get(), 1);

    // Corrupt the metadata entry and drop the extraction so the next
    // resolve has to consult metadata again
    let version_dir = extracted.parent().unwrap().to_path_buf();
    let metadata = std::fs::read_dir(&version_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .find(|e| {
            e.file_name()
                .to_string_lossy()
                .ends_with(".githubReleaseJson")
        })
        .expect("metadata cache file");
    std::fs::write(metadata.path(), "{broken").unwrap();
    std::fs::remove_dir_all(&extracted).unwrap();

    resolver.resolve(&dep).unwrap();
    // Recomputed rather than failing on the corrupt entry
    assert_eq!(release_calls.get(), 2);
}

#[test]
fn test_tree_orders_dependencies_first() {
    let temp = tempdir().unwrap();
    let cache = temp.path().join("cache");
    let project = temp.path().join("project");
    std::fs::create_dir_all(&project).unwrap();
    let settings = settings_with_cache(&cache);

    // a depends on b, b depends on c
    let mut provider = FakeProvider::default();
    let a = zip_bytes(&[(".bz", "deps = [\"github.com/t/b-v1.0.0\"]\n")]);
    let b = zip_bytes(&[(".bz", "deps = [\"github.com/t/c-v1.0.0\"]\n")]);
    let c = zip_bytes(&[("bin/c", "")]);
    provider.add_release("t", "a", "v1.0.0", &[(&versioned_zip("a", "v1.0.0"), &a)]);
    provider.add_release("t", "b", "v1.0.0", &[(&versioned_zip("b", "v1.0.0"), &b)]);
    provider.add_release("t", "c", "v1.0.0", &[(&versioned_zip("c", "v1.0.0"), &c)]);

    let descriptor = project.join(".bz");
    std::fs::write(&descriptor, "deps = [\"github.com/t/a-v1.0.0\"]\n").unwrap();

    let resolver = Resolver::with_provider(&settings, Box::new(provider));
    let resolved = resolver.resolve_project(&descriptor).unwrap();

    let dirs: Vec<String> = resolved
        .iter()
        .map(|d| d.dir.to_string_lossy().to_string())
        .collect();
    assert_eq!(dirs.len(), 3);
    assert!(dirs[0].contains("/c/"), "expected c first, got {dirs:?}");
    assert!(dirs[1].contains("/b/"), "expected b second, got {dirs:?}");
    assert!(dirs[2].contains("/a/"), "expected a last, got {dirs:?}");

    // Default bin dir points into each extraction
    assert!(resolved[0].bin_dir.ends_with("extracted/bin"));
}

#[test]
fn test_cycle_detection_reports_full_path() {
    let temp = tempdir().unwrap();
    let cache = temp.path().join("cache");
    let project = temp.path().join("project");
    std::fs::create_dir_all(&project).unwrap();
    let settings = settings_with_cache(&cache);

    // a depends on b, b depends back on a (different version, same identity)
    let mut provider = FakeProvider::default();
    let a = zip_bytes(&[(".bz", "deps = [\"github.com/t/b-v1.0.0\"]\n")]);
    let b = zip_bytes(&[(".bz", "deps = [\"github.com/t/a-v2.0.0\"]\n")]);
    provider.add_release("t", "a", "v1.0.0", &[(&versioned_zip("a", "v1.0.0"), &a)]);
    provider.add_release("t", "b", "v1.0.0", &[(&versioned_zip("b", "v1.0.0"), &b)]);

    let descriptor = project.join(".bz");
    std::fs::write(&descriptor, "deps = [\"github.com/t/a-v1.0.0\"]\n").unwrap();

    let resolver = Resolver::with_provider(&settings, Box::new(provider));
    let err = resolver.resolve_project(&descriptor).unwrap_err();

    match err {
        ResolveError::CycleDetected { path } => {
            assert_eq!(path, "github.com/t/a->github.com/t/b->github.com/t/a");
        }
        e => panic!("Expected CycleDetected, got: {e:?}"),
    }
}

#[test]
fn test_failed_dependency_does_not_abort_siblings() {
    let temp = tempdir().unwrap();
    let cache = temp.path().join("cache");
    let project = temp.path().join("project");
    std::fs::create_dir_all(&project).unwrap();
    let settings = settings_with_cache(&cache);

    // Only "good" has a release; "missing" will fail to resolve
    let mut provider = FakeProvider::default();
    let good = zip_bytes(&[("bin/good", "")]);
    provider.add_release(
        "t",
        "good",
        "v1.0.0",
        &[(&versioned_zip("good", "v1.0.0"), &good)],
    );

    let descriptor = project.join(".bz");
    std::fs::write(
        &descriptor,
        "deps = [\"github.com/t/missing-v1.0.0\", \"github.com/t/good-v1.0.0\"]\n",
    )
    .unwrap();

    let resolver = Resolver::with_provider(&settings, Box::new(provider));
    let resolved = resolver.resolve_project(&descriptor).unwrap();

    // Both entries are emitted; the failed one keeps its would-be location
    assert_eq!(resolved.len(), 2);
    assert!(!resolved[0].dir.exists());
    assert!(resolved[1].dir.exists());
}

#[test]
fn test_asset_priority_prefers_versioned_name() {
    let temp = tempdir().unwrap();
    let settings = settings_with_cache(temp.path());

    let mut provider = FakeProvider::default();
    let bare = zip_bytes(&[("bare.txt", "")]);
    let versioned = zip_bytes(&[("versioned.txt", "")]);
    provider.add_release(
        "owner",
        "repo",
        "v1.0.0",
        &[
            ("repo.zip", bare.as_slice()),
            ("repo-v1.0.0.zip", versioned.as_slice()),
        ],
    );

    let resolver = Resolver::with_provider(&settings, Box::new(provider));
    let dep = Dep::parse("github.com/owner/repo-v1.0.0").unwrap();
    let extracted = resolver.resolve(&dep).unwrap();

    assert!(extracted.join("versioned.txt").exists());
    assert!(!extracted.join("bare.txt").exists());
}

#[test]
fn test_no_matching_asset_reports_attempts() {
    let temp = tempdir().unwrap();
    let settings = settings_with_cache(temp.path());

    let mut provider = FakeProvider::default();
    let other = zip_bytes(&[("x", "")]);
    provider.add_release(
        "owner",
        "repo",
        "v1.0.0",
        &[("repo-windows-only.zip", other.as_slice())],
    );

    let resolver = Resolver::with_provider(&settings, Box::new(provider));
    let dep = Dep::parse("github.com/owner/repo-v1.0.0").unwrap();
    let err = resolver.resolve(&dep).unwrap_err();

    match err {
        ResolveError::NoMatchingAsset { dep, attempted } => {
            assert_eq!(dep, "github.com/owner/repo-v1.0.0");
            assert!(attempted.contains("repo-v1.0.0.zip"));
            assert!(attempted.contains("repo.tar.gz"));
        }
        e => panic!("Expected NoMatchingAsset, got: {e:?}"),
    }
}

#[test]
fn test_failed_extraction_leaves_no_extracted_dir() {
    let temp = tempdir().unwrap();
    let settings = settings_with_cache(temp.path());

    // Archive with a traversal entry: extraction must fail and the guard
    // path must not come into existence
    let mut provider = FakeProvider::default();
    let evil = zip_bytes(&[("../../escape.txt", "pwned")]);
    provider.add_release(
        "owner",
        "evil",
        "v1.0.0",
        &[(&versioned_zip("evil", "v1.0.0"), &evil)],
    );

    let resolver = Resolver::with_provider(&settings, Box::new(provider));
    let dep = Dep::parse("github.com/owner/evil-v1.0.0").unwrap();

    let err = resolver.resolve(&dep).unwrap_err();
    assert!(matches!(
        err,
        ResolveError::Extract(bz::ExtractError::PathTraversal { .. })
    ));

    let extracted = resolver.extracted_dir(&dep);
    assert!(!extracted.exists());
    // And nothing escaped above the cache root
    assert!(!temp.path().parent().unwrap().join("escape.txt").exists());
}

#[test]
fn test_missing_descriptor_resolves_to_empty() {
    let temp = tempdir().unwrap();
    let settings = settings_with_cache(temp.path());

    let resolver = Resolver::with_provider(&settings, Box::new(FakeProvider::default()));
    let resolved = resolver
        .resolve_project(&temp.path().join("no-such-descriptor"))
        .unwrap();
    assert!(resolved.is_empty());
}

#[test]
fn test_exports_come_from_nested_descriptor() {
    let temp = tempdir().unwrap();
    let cache = temp.path().join("cache");
    let project = temp.path().join("project");
    std::fs::create_dir_all(&project).unwrap();
    let settings = settings_with_cache(&cache);

    let mut provider = FakeProvider::default();
    let jdk = zip_bytes(&[(".bz", "deps = []\n\n[env]\nJAVA_HOME = \"${DIR}\"\n")]);
    provider.add_release(
        "t",
        "jdk",
        "v9.0.4",
        &[(&versioned_zip("jdk", "v9.0.4"), &jdk)],
    );

    let descriptor = project.join(".bz");
    std::fs::write(&descriptor, "deps = [\"github.com/t/jdk-v9.0.4\"]\n").unwrap();

    let resolver = Resolver::with_provider(&settings, Box::new(provider));
    let resolved = resolver.resolve_project(&descriptor).unwrap();

    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].exports.get("JAVA_HOME").unwrap(), "${DIR}");
}

#[test]
fn test_bin_dir_override_from_declaring_descriptor() {
    let temp = tempdir().unwrap();
    let cache = temp.path().join("cache");
    let project = temp.path().join("project");
    std::fs::create_dir_all(&project).unwrap();
    let settings = settings_with_cache(&cache);

    let mut provider = FakeProvider::default();
    let tool = zip_bytes(&[("tools/bin/x", "")]);
    provider.add_release(
        "t",
        "tool",
        "v1.0.0",
        &[(&versioned_zip("tool", "v1.0.0"), &tool)],
    );

    let descriptor = project.join(".bz");
    std::fs::write(
        &descriptor,
        "deps = [\"github.com/t/tool-v1.0.0\"]\nbin_dir = \"${DIR}/tools/bin\"\n",
    )
    .unwrap();

    let resolver = Resolver::with_provider(&settings, Box::new(provider));
    let resolved = resolver.resolve_project(&descriptor).unwrap();

    assert_eq!(resolved[0].bin_dir, "${DIR}/tools/bin");
}
