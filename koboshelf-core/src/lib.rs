//! koboshelf Core Library
//!
//! This crate provides the two engines behind the koboshelf tools: batch
//! conversion of EPUBs into Kobo kepubs, and syncing calibre series metadata
//! from sideloaded books into a Kobo's catalog database.
//!
//! Conversion goes through [`paths::PathPlanner`] to build a
//! [`paths::ConversionPlan`], which [`batch::BatchExecutor`] runs through a
//! [`converter::Converter`]. Metadata sync reads each book with
//! [`metadata::read_metadata`] and writes it with [`sync::SeriesSync`].

pub mod batch;
pub mod catalog;
pub mod converter;
pub mod error;
pub mod kobo;
pub mod metadata;
pub mod observer;
pub mod paths;
pub mod sync;

pub use batch::{BatchExecutor, BatchReport, JobOutcome, JobResult};
pub use converter::{ConversionOptions, Converter, Hyphenation, KepubConverter, Replacement};
pub use error::{
    CatalogError, ConfigError, ConversionError, DeviceError, KoboshelfError, MetadataError,
    PathError, Result, SyncError,
};
pub use kobo::{content_id, image_id, KoboDevice};
pub use metadata::{read_metadata, PackageMetadata};
pub use observer::{BatchObserver, Quiet, SyncObserver};
pub use paths::{ConversionJob, ConversionPlan, PathPlanner};
pub use sync::{sync_device, BookOutcome, BookResult, SeriesSync, SyncSummary};
