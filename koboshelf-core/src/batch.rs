//! Sequential execution of a conversion plan

use crate::converter::{ConversionOptions, Converter};
use crate::error::{self, ConversionError};
use crate::observer::BatchObserver;
use crate::paths::{ConversionPlan, PathPlanner};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// What happened to a single job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum JobOutcome {
    Converted,
    Skipped,
    Errored(String),
}

/// A job and its outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobResult {
    pub input: PathBuf,
    pub output: PathBuf,
    pub outcome: JobOutcome,
}

/// Outcomes of a whole batch, in execution order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub converted: usize,
    pub skipped: usize,
    pub errored: usize,
    pub results: Vec<JobResult>,
}

impl BatchReport {
    /// Fold one job result into the report
    pub fn record(&mut self, result: JobResult) {
        match result.outcome {
            JobOutcome::Converted => self.converted += 1,
            JobOutcome::Skipped => self.skipped += 1,
            JobOutcome::Errored(_) => self.errored += 1,
        }
        self.results.push(result);
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// `(input, output, reason)` of every failed job
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &Path, &str)> {
        self.results.iter().filter_map(|r| match &r.outcome {
            JobOutcome::Errored(reason) => {
                Some((r.input.as_path(), r.output.as_path(), reason.as_str()))
            }
            _ => None,
        })
    }

    /// True when the batch was a single job and it failed.
    ///
    /// Larger batches always report failures without failing as a whole.
    pub fn is_fatal(&self) -> bool {
        self.total() == 1 && self.errored == 1
    }
}

/// Runs every job of a plan through a converter, one at a time
pub struct BatchExecutor<'a> {
    converter: &'a dyn Converter,
    options: ConversionOptions,
    update_only: bool,
}

impl<'a> BatchExecutor<'a> {
    pub fn new(converter: &'a dyn Converter, options: ConversionOptions) -> Self {
        Self {
            converter,
            options,
            update_only: false,
        }
    }

    /// Skip jobs whose output already exists
    pub fn update_only(mut self, update_only: bool) -> Self {
        self.update_only = update_only;
        self
    }

    /// Attempt every job in plan order and report the outcomes.
    ///
    /// A failing job never stops the jobs after it.
    pub fn run(&self, plan: &ConversionPlan, observer: &mut dyn BatchObserver) -> BatchReport {
        let total = plan.len();
        observer.batch_started(total);
        let mut report = BatchReport::default();

        for (n, (input, output)) in plan.iter().enumerate() {
            let skipping = self.update_only && output.exists();
            observer.job_started(n + 1, total, input, skipping);
            tracing::debug!(
                "  i: {:?}\n  o: {:?}\n  skipping: {}",
                input,
                output,
                skipping
            );

            let outcome = if skipping {
                JobOutcome::Skipped
            } else {
                match self.execute(input, output) {
                    Ok(()) => JobOutcome::Converted,
                    Err(e) => {
                        let reason = e.to_string();
                        observer.job_failed(input, output, &reason);
                        JobOutcome::Errored(reason)
                    }
                }
            };

            report.record(JobResult {
                input: input.to_path_buf(),
                output: output.to_path_buf(),
                outcome,
            });
        }

        tracing::debug!(
            "converted: {}, skipped: {}, errored: {}",
            report.converted,
            report.skipped,
            report.errored
        );
        report
    }

    fn execute(&self, input: &Path, output: &Path) -> Result<(), ConversionError> {
        if let Some(parent) = output.parent() {
            if !parent.is_dir() {
                tracing::debug!("  mkdir: {:?}", parent);
                fs::create_dir_all(parent).map_err(ConversionError::DirectoryCreate)?;
            }
        }

        self.converter.convert(input, output, &self.options)
    }
}

/// Plan `args` into `output_root` and run the whole plan.
///
/// Planning errors abort before any job runs; job failures end up in the
/// returned report.
pub fn convert_all<S: AsRef<str>>(
    args: &[S],
    output_root: &Path,
    executor: &BatchExecutor<'_>,
    observer: &mut dyn BatchObserver,
) -> error::Result<BatchReport> {
    let plan = PathPlanner::new(output_root)?.plan(args)?;
    Ok(executor.run(&plan, observer))
}
