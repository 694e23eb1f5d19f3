//! Conversion collaborator: EPUB in, kepub out

mod kepub;

pub use kepub::KepubConverter;

use crate::error::{ConfigError, ConversionError};
use serde::Serialize;
use std::path::Path;
use std::str::FromStr;

/// Trait for converting a single EPUB file into a kepub
pub trait Converter: Send + Sync {
    /// Convert `input` and write the result to `output`
    fn convert(
        &self,
        input: &Path,
        output: &Path,
        options: &ConversionOptions,
    ) -> Result<(), ConversionError>;

    /// Converter name for logging
    fn name(&self) -> &str;
}

/// Hyphenation override applied to every content document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Hyphenation {
    Force,
    Disable,
}

impl Hyphenation {
    /// Build the override from the two CLI switches.
    ///
    /// Setting both is rejected.
    pub fn from_flags(hyphenate: bool, no_hyphenate: bool) -> Result<Option<Self>, ConfigError> {
        match (hyphenate, no_hyphenate) {
            (true, true) => Err(ConfigError::ConflictingHyphenation),
            (true, false) => Ok(Some(Hyphenation::Force)),
            (false, true) => Ok(Some(Hyphenation::Disable)),
            (false, false) => Ok(None),
        }
    }
}

/// A literal find/replace pair applied to text content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Replacement {
    pub find: String,
    pub replace: String,
}

impl Replacement {
    pub fn new(find: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            find: find.into(),
            replace: replace.into(),
        }
    }
}

impl FromStr for Replacement {
    type Err = ConfigError;

    /// Parse `FIND|REPLACE`; the replacement side may be empty
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('|') {
            Some((find, replace)) if !find.is_empty() => Ok(Self::new(find, replace)),
            _ => Err(ConfigError::MalformedReplacement(s.to_string())),
        }
    }
}

/// Options passed to the converter for every job
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversionOptions {
    /// Extra CSS appended to every content document
    pub extra_css: Option<String>,

    /// Force hyphenation on or off
    pub hyphenation: Option<Hyphenation>,

    /// Inline linked stylesheets into each document
    pub inline_styles: bool,

    /// Add CSS fixes for fullscreen reading
    pub fullscreen_fixes: bool,

    /// Ordered find/replace pairs
    pub replacements: Vec<Replacement>,
}

impl ConversionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set extra CSS; blank text is ignored
    pub fn with_extra_css(mut self, css: impl Into<String>) -> Self {
        let css = css.into();
        self.extra_css = if css.trim().is_empty() { None } else { Some(css) };
        self
    }

    pub fn with_hyphenation(mut self, hyphenation: Option<Hyphenation>) -> Self {
        self.hyphenation = hyphenation;
        self
    }

    pub fn with_inline_styles(mut self, inline: bool) -> Self {
        self.inline_styles = inline;
        self
    }

    pub fn with_fullscreen_fixes(mut self, fixes: bool) -> Self {
        self.fullscreen_fixes = fixes;
        self
    }

    /// Parse and append `FIND|REPLACE` pairs, keeping their order
    pub fn with_replacements<S: AsRef<str>>(mut self, pairs: &[S]) -> Result<Self, ConfigError> {
        for pair in pairs {
            self.replacements.push(pair.as_ref().parse()?);
        }
        Ok(self)
    }
}
