//! Convert command implementation

use super::progress_bar;
use crate::ConvertArgs;
use anyhow::{bail, Context, Result};
use indicatif::ProgressBar;
use koboshelf_core::batch::convert_all;
use koboshelf_core::{
    BatchExecutor, BatchObserver, ConversionOptions, Converter, Hyphenation, KepubConverter,
};
use std::path::Path;

/// Prints batch progress around an indicatif bar
struct ConsoleObserver {
    pb: Option<ProgressBar>,
    quiet: bool,
}

impl ConsoleObserver {
    fn new(quiet: bool) -> Self {
        Self { pb: None, quiet }
    }

    fn println(&self, line: String) {
        if self.quiet {
            return;
        }
        match &self.pb {
            Some(pb) => pb.suspend(|| println!("{}", line)),
            None => println!("{}", line),
        }
    }

    fn finish(&self) {
        if let Some(pb) = &self.pb {
            pb.finish_and_clear();
        }
    }
}

impl BatchObserver for ConsoleObserver {
    fn batch_started(&mut self, total: usize) {
        self.println(format!("Converting {} books", total));
        if !self.quiet {
            self.pb = Some(progress_bar(total));
        }
    }

    fn job_started(&mut self, index: usize, total: usize, input: &Path, skipping: bool) {
        let verb = if skipping { "Skipping" } else { "Converting" };
        self.println(format!("[{}/{}] {} '{}'", index, total, verb, input.display()));
        if let Some(pb) = &self.pb {
            pb.inc(1);
        }
    }

    fn job_failed(&mut self, input: &Path, _output: &Path, reason: &str) {
        let line = format!("  Error converting '{}': {}", input.display(), reason);
        match &self.pb {
            Some(pb) => pb.suspend(|| eprintln!("{}", line)),
            None => eprintln!("{}", line),
        }
    }
}

/// Convert EPUB files and directories to kepubs
pub fn convert(args: &ConvertArgs) -> Result<()> {
    let hyphenation = Hyphenation::from_flags(args.hyphenate, args.no_hyphenate)?;
    let mut options = ConversionOptions::new()
        .with_hyphenation(hyphenation)
        .with_inline_styles(args.inline_styles)
        .with_fullscreen_fixes(args.fullscreen_fixes)
        .with_replacements(&args.replace)?;
    if let Some(css) = &args.css {
        options = options.with_extra_css(css.as_str());
    }
    tracing::debug!("options: {:?}", options);

    let converter = KepubConverter::new();
    tracing::debug!("converter: {}", converter.name());
    let executor = BatchExecutor::new(&converter, options).update_only(args.update);

    let mut observer = ConsoleObserver::new(args.json);
    let result = convert_all(&args.paths, &args.output, &executor, &mut observer);
    observer.finish();
    let report = result.context("Failed to plan conversion")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "\n{} total, {} converted, {} skipped, {} errored",
            report.total(),
            report.converted,
            report.skipped,
            report.errored
        );

        if report.errored > 0 {
            eprintln!("\nErrors:");
            for (input, output, reason) in report.failures() {
                eprintln!("  {}", input.display());
                eprintln!("    -> {}", output.display());
                eprintln!("    {}", reason);
            }
        }
    }

    if report.is_fatal() {
        bail!("Conversion failed");
    }

    Ok(())
}
