//! Verbatim catalog backups

use crate::error::SyncError;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Path the backup of `catalog` is written to (`<catalog>.bak`)
pub fn backup_path(catalog: &Path) -> PathBuf {
    let mut name = catalog.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Copy `catalog` byte for byte next to itself and flush it to disk.
///
/// An existing backup is overwritten.
pub fn backup_catalog(catalog: &Path) -> Result<PathBuf, SyncError> {
    let backup = backup_path(catalog);
    copy_synced(catalog, &backup).map_err(|source| SyncError::Backup {
        path: catalog.to_path_buf(),
        source,
    })?;
    Ok(backup)
}

fn copy_synced(src: &Path, dst: &Path) -> io::Result<()> {
    let mut input = File::open(src)?;
    let mut output = File::create(dst)?;
    io::copy(&mut input, &mut output)?;
    output.sync_all()
}
