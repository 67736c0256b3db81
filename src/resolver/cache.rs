//! Existence-keyed memoization primitives for the on-disk cache
//!
//! Both primitives treat filesystem existence as the memoization signal,
//! not content hashes. That is sound only because every cache path is
//! derived from an immutable, version-pinned coordinate (see the engine's
//! directory scheme).

use super::error::ResolveResult;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Memoize a JSON-serializable computation at `path`.
///
/// If `path` exists and decodes into `T`, the decoded value is returned and
/// `compute` never runs. A decode failure counts as a cache miss, so corrupt
/// entries self-heal by recompute. A failed persist is non-fatal: the
/// computed value is still returned, only durability of the memoization is
/// lost.
pub fn cache_value<T, F>(path: &Path, compute: F) -> ResolveResult<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> ResolveResult<T>,
{
    if path.exists() {
        if let Ok(content) = fs::read_to_string(path) {
            match serde_json::from_str(&content) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    debug!(path = %path.display(), "corrupt cache entry, recomputing: {e}");
                }
            }
        }
    }

    let value = compute()?;

    if let Err(e) = persist(path, &value) {
        warn!(path = %path.display(), "could not persist cache entry: {e}");
    }

    Ok(value)
}

fn persist<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(value).map_err(std::io::Error::other)?;
    fs::write(path, json)
}

/// Memoize an idempotent side-effecting action by the existence of `path`.
///
/// If `path` exists the action is treated as already done. Otherwise the
/// action runs; materializing `path` is the action's own responsibility
/// (typically by writing its final output to exactly that path).
pub fn cache_guard<F>(path: &Path, action: F) -> ResolveResult<()>
where
    F: FnOnce() -> ResolveResult<()>,
{
    if path.exists() {
        debug!(path = %path.display(), "cache hit, skipping");
        return Ok(());
    }
    action()
}
