//! Classification of path arguments and recursive EPUB discovery

use crate::error::PathError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extension of an unconverted EPUB package
pub const PACKAGE_EXTENSION: &str = ".epub";

/// Double extension marking a Kobo-converted package
pub const CONVERTED_EXTENSION: &str = ".kepub.epub";

/// What a path argument points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    File,
    Directory,
}

/// Classify a path as a file or a directory.
///
/// Fails with [`PathError::NotFound`] when nothing exists at `path` and with
/// [`PathError::InvalidKind`] for anything else (sockets, fifos, ...).
pub fn classify(path: &Path) -> Result<PathKind, PathError> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(PathError::NotFound(path.to_path_buf()))
        }
        Err(source) => {
            return Err(PathError::Resolve {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if meta.is_file() {
        Ok(PathKind::File)
    } else if meta.is_dir() {
        Ok(PathKind::Directory)
    } else {
        Err(PathError::InvalidKind(path.to_path_buf()))
    }
}

/// Whether a file name is an EPUB package
pub fn is_package_name(name: &str) -> bool {
    name.ends_with(PACKAGE_EXTENSION)
}

/// Whether a file name already carries the kepub double extension
pub fn is_converted_name(name: &str) -> bool {
    name.ends_with(CONVERTED_EXTENSION)
}

/// Recursively list every `.epub` file below `dir`.
///
/// Entries are sorted by file name at each level, so the result is stable
/// for a given filesystem state. Symlinks are not followed. Kepubs are only
/// included when `include_converted` is set.
pub fn scan_packages(dir: &Path, include_converted: bool) -> Result<Vec<PathBuf>, PathError> {
    let mut found = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| PathError::Scan {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if !is_package_name(&name) {
            continue;
        }
        if !include_converted && is_converted_name(&name) {
            continue;
        }

        found.push(entry.into_path());
    }

    Ok(found)
}
