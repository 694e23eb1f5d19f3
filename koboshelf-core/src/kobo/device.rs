//! Kobo device roots: validation and auto-detection

use crate::error::DeviceError;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

/// Hidden directory holding the device's own files
pub const KOBO_DIR: &str = ".kobo";

/// Catalog database inside [`KOBO_DIR`]
pub const CATALOG_FILE: &str = "KoboReader.sqlite";

/// A validated Kobo user partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KoboDevice {
    root: PathBuf,
}

impl KoboDevice {
    /// Validate a device root.
    ///
    /// A path pointing at the `.kobo` directory itself is accepted and mapped
    /// to its parent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DeviceError> {
        let mut root = path.as_ref();
        if root.file_name() == Some(OsStr::new(KOBO_DIR)) {
            root = root.parent().unwrap_or(root);
        }

        let root =
            std::path::absolute(root).map_err(|_| DeviceError::NotAKobo(root.to_path_buf()))?;
        if !root.join(KOBO_DIR).join(CATALOG_FILE).is_file() {
            return Err(DeviceError::NotAKobo(root));
        }

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `KoboReader.sqlite`
    pub fn catalog_path(&self) -> PathBuf {
        self.root.join(KOBO_DIR).join(CATALOG_FILE)
    }
}

/// Source of candidate device roots for auto-detection
pub trait DeviceLocator {
    /// Paths that might be a mounted Kobo, most likely first
    fn candidates(&self) -> Vec<PathBuf>;
}

/// Looks at the usual removable-media mount points of the host OS
#[derive(Debug, Clone, Copy, Default)]
pub struct MountPointLocator;

impl DeviceLocator for MountPointLocator {
    fn candidates(&self) -> Vec<PathBuf> {
        let mut found = Vec::new();

        if cfg!(target_os = "macos") {
            found.extend(subdirs(Path::new("/Volumes")));
        } else if cfg!(windows) {
            found.extend(
                (b'A'..=b'Z')
                    .map(|letter| PathBuf::from(format!("{}:\\", letter as char)))
                    .filter(|p| p.is_dir()),
            );
        } else {
            for base in ["/media", "/run/media"] {
                for dir in subdirs(Path::new(base)) {
                    found.extend(subdirs(&dir));
                    found.push(dir);
                }
            }
            found.extend(subdirs(Path::new("/mnt")));
        }

        found
    }
}

/// Every candidate from `locator` that is a valid Kobo
pub fn find_devices(locator: &dyn DeviceLocator) -> Vec<KoboDevice> {
    locator
        .candidates()
        .into_iter()
        .filter_map(|path| KoboDevice::open(path).ok())
        .collect()
}

/// First Kobo found by `locator`
pub fn detect(locator: &dyn DeviceLocator) -> Result<KoboDevice, DeviceError> {
    let mut devices = find_devices(locator);
    if devices.len() > 1 {
        tracing::debug!("found {} kobos, using the first", devices.len());
    }
    if devices.is_empty() {
        Err(DeviceError::NotDetected)
    } else {
        Ok(devices.swap_remove(0))
    }
}

fn subdirs(dir: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect()
        })
        .unwrap_or_default();
    dirs.sort();
    dirs
}
