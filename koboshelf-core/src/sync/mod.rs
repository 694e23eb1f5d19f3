//! Series metadata sync from sideloaded EPUBs into the device catalog

mod backup;

pub use backup::{backup_catalog, backup_path};

use crate::catalog::{Catalog, SqliteCatalog};
use crate::error::SyncError;
use crate::kobo::{content_id, image_id, KoboDevice};
use crate::metadata::{read_metadata, PackageMetadata};
use crate::observer::SyncObserver;
use crate::paths::scan_packages;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Terminal state of one book
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookOutcome {
    /// Exactly one catalog row updated
    Updated,
    /// No series name or index in the package
    NoMetadata,
    /// No catalog row for the book; the device may not have imported it yet
    NotFound,
    /// More than one row matched; the update still applied
    Ambiguous(usize),
    Errored(String),
}

/// A book and what happened to it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookResult {
    /// Path relative to the device root, or absolute when that failed
    pub path: PathBuf,
    pub outcome: BookOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PackageMetadata>,
}

impl BookResult {
    fn new(path: &Path, outcome: BookOutcome) -> Self {
        Self {
            path: path.to_path_buf(),
            outcome,
            metadata: None,
        }
    }
}

/// Tally of a sync run plus every per-book result
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncSummary {
    pub updated: usize,
    pub no_metadata: usize,
    pub errored: usize,
    pub books: Vec<BookResult>,
}

impl SyncSummary {
    /// Fold one book into the tally.
    ///
    /// Ambiguous updates count as updated, missing rows as errors.
    pub fn record(&mut self, result: BookResult) {
        match result.outcome {
            BookOutcome::Updated | BookOutcome::Ambiguous(_) => self.updated += 1,
            BookOutcome::NoMetadata => self.no_metadata += 1,
            BookOutcome::NotFound | BookOutcome::Errored(_) => self.errored += 1,
        }
        self.books.push(result);
    }

    pub fn total(&self) -> usize {
        self.books.len()
    }
}

/// Applies series metadata of every EPUB under a device root to a catalog
pub struct SeriesSync<C: Catalog> {
    root: PathBuf,
    catalog: C,
}

impl<C: Catalog> SeriesSync<C> {
    pub fn new(root: impl Into<PathBuf>, catalog: C) -> Self {
        Self {
            root: root.into(),
            catalog,
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Sync every `.epub` (kepubs included) below the root, in scan order
    pub fn run(&self, observer: &mut dyn SyncObserver) -> Result<SyncSummary, SyncError> {
        let books =
            scan_packages(&self.root, true).map_err(|e| SyncError::Scan(e.to_string()))?;
        let total = books.len();
        observer.books_found(total);

        let mut summary = SyncSummary::default();
        for (n, book) in books.iter().enumerate() {
            let relative = book.strip_prefix(&self.root).unwrap_or(book);
            observer.book_started(n + 1, total, relative);

            let result = self.sync_book(book, observer);
            observer.book_finished(&result);
            summary.record(result);
        }

        Ok(summary)
    }

    /// Take one book to a terminal state
    pub fn sync_book(&self, book: &Path, observer: &mut dyn SyncObserver) -> BookResult {
        let relative = match book.strip_prefix(&self.root) {
            Ok(relative) => relative,
            Err(e) => {
                return BookResult::new(
                    book,
                    BookOutcome::Errored(format!("could not resolve path: {}", e)),
                )
            }
        };

        let metadata = match read_metadata(book) {
            Ok(metadata) => metadata,
            Err(e) => {
                return BookResult::new(
                    relative,
                    BookOutcome::Errored(format!("could not read metadata: {}", e)),
                )
            }
        };

        if metadata.is_empty() {
            let mut result = BookResult::new(relative, BookOutcome::NoMetadata);
            result.metadata = Some(metadata);
            return result;
        }
        observer.metadata_found(&metadata);

        let iid = image_id(&content_id(relative));
        tracing::debug!("image id: {}", iid);

        let outcome = match self.catalog.update_series(
            &iid,
            metadata.series_name(),
            metadata.series_number().as_deref(),
        ) {
            Ok(0) => BookOutcome::NotFound,
            Ok(1) => BookOutcome::Updated,
            Ok(rows) => {
                tracing::warn!("{} rows in the catalog share ImageID {}", rows, iid);
                BookOutcome::Ambiguous(rows)
            }
            Err(e) => BookOutcome::Errored(format!("could not update database: {}", e)),
        };

        BookResult {
            path: relative.to_path_buf(),
            outcome,
            metadata: Some(metadata),
        }
    }
}

/// Back up the device catalog, then sync every book on the device.
///
/// Nothing is written to the catalog unless the backup succeeded.
pub fn sync_device(
    device: &KoboDevice,
    observer: &mut dyn SyncObserver,
) -> Result<SyncSummary, SyncError> {
    let catalog_path = device.catalog_path();

    let backup = backup_catalog(&catalog_path)?;
    observer.backup_created(&backup);

    let catalog = SqliteCatalog::open(&catalog_path)?;
    SeriesSync::new(device.root(), catalog).run(observer)
}
