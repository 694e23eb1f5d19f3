//! Seriesmeta command implementation

use super::progress_bar;
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use koboshelf_core::kobo::{detect, MountPointLocator};
use koboshelf_core::{
    sync_device, BookOutcome, BookResult, KoboDevice, PackageMetadata, SyncObserver,
};
use std::path::Path;

/// Prints sync progress around an indicatif bar
struct ConsoleObserver {
    pb: Option<ProgressBar>,
    quiet: bool,
}

impl ConsoleObserver {
    fn println(&self, line: String) {
        if self.quiet {
            return;
        }
        match &self.pb {
            Some(pb) => pb.suspend(|| println!("{}", line)),
            None => println!("{}", line),
        }
    }

    fn eprintln(&self, line: String) {
        match &self.pb {
            Some(pb) => pb.suspend(|| eprintln!("{}", line)),
            None => eprintln!("{}", line),
        }
    }
}

impl SyncObserver for ConsoleObserver {
    fn backup_created(&mut self, backup: &Path) {
        self.println(format!("Backed up database to {}", backup.display()));
    }

    fn books_found(&mut self, total: usize) {
        self.println(format!("Updating metadata for {} books", total));
        if !self.quiet {
            self.pb = Some(progress_bar(total));
        }
    }

    fn book_started(&mut self, index: usize, total: usize, relative: &Path) {
        self.println(format!("[{}/{}] {}", index, total, relative.display()));
        if let Some(pb) = &self.pb {
            pb.inc(1);
        }
    }

    fn metadata_found(&mut self, metadata: &PackageMetadata) {
        self.println(format!(
            "  series: {:?}, index: {:?}",
            metadata.series_name().unwrap_or_default(),
            metadata.series_number().unwrap_or_default()
        ));
    }

    fn book_finished(&mut self, result: &BookResult) {
        match &result.outcome {
            BookOutcome::Updated => {}
            BookOutcome::NoMetadata => self.println("  no metadata".to_string()),
            BookOutcome::NotFound => self.eprintln(format!(
                "  Error updating '{}': book not in database (may not be imported yet)",
                result.path.display()
            )),
            BookOutcome::Ambiguous(rows) => self.eprintln(format!(
                "  Warning: {} database entries matched '{}'",
                rows,
                result.path.display()
            )),
            BookOutcome::Errored(reason) => self.eprintln(format!(
                "  Error updating '{}': {}",
                result.path.display(),
                reason
            )),
        }
    }
}

/// Sync calibre series metadata into a Kobo's database
pub fn seriesmeta(kobo_path: Option<&Path>, json: bool) -> Result<()> {
    let device = match kobo_path {
        Some(path) => KoboDevice::open(path)
            .with_context(|| format!("Failed to open Kobo at {}", path.display()))?,
        None => detect(&MountPointLocator).context("Failed to find a Kobo")?,
    };
    tracing::debug!("kobo: {:?}", device.root());

    let mut observer = ConsoleObserver {
        pb: None,
        quiet: json,
    };
    let summary = sync_device(&device, &mut observer);
    if let Some(pb) = &observer.pb {
        pb.finish_and_clear();
    }
    let summary = summary.context("Failed to update metadata")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "\nFinished updating metadata. {} updated, {} without metadata, {} errored.",
            summary.updated, summary.no_metadata, summary.errored
        );
    }

    Ok(())
}
