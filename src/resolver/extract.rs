//! Security-checked archive extraction
//!
//! Supports zip and gzipped tar. Every entry path is re-anchored under the
//! destination directory; entries that would escape it (absolute paths or
//! `..` segments, the classic zip-slip/tar-slip shapes) abort the whole
//! extraction. Tar entries other than regular files and directories are
//! rejected outright: symlink entries are a common escape vector.

use super::error::ExtractError;
use flate2::read::GzDecoder;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Closed set of archive formats, selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
}

impl ArchiveFormat {
    /// Detect the format from a file name. `.tgz` and `.tar.gz` are the
    /// same format under two conventional spellings.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".tgz") || name.ends_with(".tar.gz") {
            Some(Self::TarGz)
        } else {
            None
        }
    }
}

/// Extract `archive` into `dest`, dispatching on the file extension.
///
/// No cleanup promise on failure: a partially populated `dest` may remain.
/// Callers that cache by directory existence must stage and rename (the
/// resolution engine does).
pub fn extract(archive: &Path, dest: &Path) -> Result<(), ExtractError> {
    match ArchiveFormat::from_path(archive) {
        Some(ArchiveFormat::Zip) => extract_zip(archive, dest),
        Some(ArchiveFormat::TarGz) => extract_tar_gz(archive, dest),
        None => Err(ExtractError::UnsupportedFormat {
            path: archive.to_path_buf(),
        }),
    }
}

/// Join an archive entry name onto `dest`, refusing anything that would
/// resolve outside it. `.` components are dropped; `..` may only walk back
/// over components the entry itself introduced.
fn safe_join(dest: &Path, entry: &str) -> Result<PathBuf, ExtractError> {
    let mut out = PathBuf::new();
    for component in Path::new(entry).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return Err(ExtractError::PathTraversal {
                        entry: entry.to_string(),
                        dest: dest.to_path_buf(),
                    });
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(ExtractError::PathTraversal {
                    entry: entry.to_string(),
                    dest: dest.to_path_buf(),
                });
            }
        }
    }
    Ok(dest.join(out))
}

fn extract_zip(archive: &Path, dest: &Path) -> Result<(), ExtractError> {
    let file = fs::File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)?;

    fs::create_dir_all(dest)?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let name = entry.name().to_string();
        let outpath = safe_join(dest, &name)?;

        if entry.is_dir() {
            fs::create_dir_all(&outpath)?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out = fs::File::create(&outpath)?;
        std::io::copy(&mut entry, &mut out)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&outpath, fs::Permissions::from_mode(mode))?;
        }
    }

    debug!(archive = %archive.display(), dest = %dest.display(), "zip extracted");
    Ok(())
}

fn extract_tar_gz(archive: &Path, dest: &Path) -> Result<(), ExtractError> {
    let file = fs::File::open(archive)?;
    let mut tar = tar::Archive::new(GzDecoder::new(file));

    fs::create_dir_all(dest)?;

    for entry in tar.entries()? {
        let mut entry = entry?;
        let name = entry.path()?.to_string_lossy().to_string();
        let outpath = safe_join(dest, &name)?;

        let kind = entry.header().entry_type();
        if kind.is_dir() {
            fs::create_dir_all(&outpath)?;
        } else if kind.is_file() {
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent)?;
            }
            entry.unpack(&outpath)?;
        } else {
            return Err(ExtractError::UnsupportedEntryType { entry: name });
        }
    }

    debug!(archive = %archive.display(), dest = %dest.display(), "tar.gz extracted");
    Ok(())
}
