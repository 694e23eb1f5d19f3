//! Mapping of input EPUBs to kepub output paths

use super::resolver::{
    classify, is_converted_name, is_package_name, scan_packages, PathKind, CONVERTED_EXTENSION,
    PACKAGE_EXTENSION,
};
use crate::error::PathError;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

/// A single planned conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    /// Absolute path of the source EPUB
    pub input: PathBuf,

    /// Absolute path the kepub will be written to
    pub output: PathBuf,
}

/// Planned jobs keyed by input path.
///
/// Every output path is claimed by at most one input. Inserting a job whose
/// output is already claimed by a different input drops the earlier job, so
/// on collisions the last insert wins.
#[derive(Debug, Clone, Default)]
pub struct ConversionPlan {
    jobs: BTreeMap<PathBuf, PathBuf>,
    claims: HashMap<PathBuf, PathBuf>,
}

impl ConversionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job, returning the input it displaced on an output collision
    pub fn insert(&mut self, input: PathBuf, output: PathBuf) -> Option<PathBuf> {
        if let Some(previous_output) = self.jobs.insert(input.clone(), output.clone()) {
            if previous_output != output {
                self.claims.remove(&previous_output);
            }
        }

        match self.claims.insert(output, input.clone()) {
            Some(previous_input) if previous_input != input => {
                self.jobs.remove(&previous_input);
                Some(previous_input)
            }
            _ => None,
        }
    }

    /// Output path planned for `input`
    pub fn get(&self, input: &Path) -> Option<&Path> {
        self.jobs.get(input).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Iterate jobs in input path order
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.jobs.iter().map(|(i, o)| (i.as_path(), o.as_path()))
    }

    /// Snapshot of the plan as owned jobs
    pub fn jobs(&self) -> Vec<ConversionJob> {
        self.iter()
            .map(|(input, output)| ConversionJob {
                input: input.to_path_buf(),
                output: output.to_path_buf(),
            })
            .collect()
    }
}

/// Turns user-supplied path arguments into a [`ConversionPlan`].
///
/// Files land directly in the output root. Files found under a directory
/// argument keep their path relative to that directory, placed flat under
/// the output root without a per-directory namespace folder.
#[derive(Debug, Clone)]
pub struct PathPlanner {
    output_root: PathBuf,
}

impl PathPlanner {
    /// Create a planner writing below `output_root` (made absolute)
    pub fn new(output_root: impl AsRef<Path>) -> Result<Self, PathError> {
        Ok(Self {
            output_root: absolute(output_root.as_ref())?,
        })
    }

    /// Plan conversions for every argument.
    ///
    /// Arguments are deduplicated by exact string equality before anything
    /// touches the filesystem. The first invalid argument aborts planning.
    pub fn plan<S: AsRef<str>>(&self, args: &[S]) -> Result<ConversionPlan, PathError> {
        let mut plan = ConversionPlan::new();

        for arg in unique(args) {
            let path = Path::new(arg);
            match classify(path)? {
                PathKind::File => {
                    tracing::debug!("file: {}", arg);
                    let input = absolute(path)?;
                    let name = file_name(&input);
                    if !is_package_name(&name) {
                        return Err(PathError::NotPackage(input));
                    }
                    if is_converted_name(&name) {
                        return Err(PathError::AlreadyConverted(input));
                    }

                    let output = self.output_root.join(converted_name(&name));
                    tracing::debug!("  file-result: {:?} -> {:?}", input, output);
                    self.insert(&mut plan, input, output);
                }
                PathKind::Directory => {
                    tracing::debug!("dir: {}", arg);
                    for found in scan_packages(path, false)? {
                        let rel = found.strip_prefix(path).unwrap_or(&found);
                        let name = file_name(&found);
                        let output = match rel.parent() {
                            Some(parent) => self.output_root.join(parent),
                            None => self.output_root.clone(),
                        }
                        .join(converted_name(&name));

                        let input = absolute(&found)?;
                        tracing::debug!("  dir-result: {:?} -> {:?}", input, output);
                        self.insert(&mut plan, input, output);
                    }
                }
            }
        }

        Ok(plan)
    }

    fn insert(&self, plan: &mut ConversionPlan, input: PathBuf, output: PathBuf) {
        if let Some(displaced) = plan.insert(input, output) {
            tracing::debug!("  dropped {:?}: output claimed by a later input", displaced);
        }
    }
}

/// Replace the trailing `.epub` of a file name with `.kepub.epub`
pub fn converted_name(name: &str) -> String {
    let stem = name.strip_suffix(PACKAGE_EXTENSION).unwrap_or(name);
    format!("{}{}", stem, CONVERTED_EXTENSION)
}

/// Deduplicate arguments, keeping the first occurrence of each
fn unique<S: AsRef<str>>(args: &[S]) -> Vec<&str> {
    let mut seen = HashSet::new();
    args.iter()
        .map(|arg| arg.as_ref())
        .filter(|arg| seen.insert(*arg))
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn absolute(path: &Path) -> Result<PathBuf, PathError> {
    std::path::absolute(path).map_err(|source| PathError::Resolve {
        path: path.to_path_buf(),
        source,
    })
}
