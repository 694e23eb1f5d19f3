//! Error types for koboshelf core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using KoboshelfError
pub type Result<T> = std::result::Result<T, KoboshelfError>;

/// Top-level error type for all koboshelf operations
#[derive(Debug, Error)]
pub enum KoboshelfError {
    #[error("Path error: {0}")]
    Path(#[from] PathError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while resolving and planning input paths
#[derive(Debug, Error)]
pub enum PathError {
    #[error("path '{}' does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("path '{}' is not a file or a dir", .0.display())]
    InvalidKind(PathBuf),

    #[error("file '{}' is not an epub", .0.display())]
    NotPackage(PathBuf),

    #[error("file '{}' is already a kepub", .0.display())]
    AlreadyConverted(PathBuf),

    #[error("error scanning dir '{}': {message}", .path.display())]
    Scan { path: PathBuf, message: String },

    #[error("error resolving path '{}': {source}", .path.display())]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Invalid conversion options, rejected before any job runs
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("--hyphenate and --no-hyphenate are mutually exclusive")]
    ConflictingHyphenation,

    #[error("malformed replacement '{0}': expected FIND|REPLACE")]
    MalformedReplacement(String),
}

/// Errors that occur while reading metadata from an EPUB package
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("could not open archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("cannot parse container: {0}")]
    MalformedContainer(String),

    #[error("malformed xml in {entry}: {message}")]
    MalformedXml { entry: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by a converter for a single job
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("{0}")]
    Failed(String),

    #[error("error creating output dir: {0}")]
    DirectoryCreate(std::io::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the device catalog database
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for CatalogError {
    fn from(e: rusqlite::Error) -> Self {
        CatalogError::Database(e.to_string())
    }
}

/// Errors fatal to a whole metadata sync run
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("could not make copy of {}: {source}", .path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not open catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("could not search for epubs: {0}")]
    Scan(String),
}

/// Errors locating or validating a Kobo device root
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("'{}' is not a valid kobo", .0.display())]
    NotAKobo(PathBuf),

    #[error("could not automatically detect a kobo")]
    NotDetected,
}
