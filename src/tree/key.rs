//! Correspondence-key derivation from file names.

use std::path::Path;

use regex::{Regex, RegexBuilder};

use super::{CorrespondenceKey, Modality};
use crate::error::{Error, Result};

/// Derived-file naming pattern `<stem><suffix><optional .extension>`.
///
/// The suffix is a literal, matched case-insensitively. The pattern is
/// compiled once per run and cloned cheaply into each index rule.
#[derive(Debug, Clone)]
pub struct SuffixPattern {
    suffix: String,
    regex: Regex,
}

impl SuffixPattern {
    /// Compile a pattern for `suffix`.
    pub fn new(suffix: &str) -> Result<Self> {
        let source = format!(r"^(.+?){}(\..+)?$", regex::escape(suffix));
        let regex = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::InvalidPattern {
                suffix: suffix.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            suffix: suffix.to_string(),
            regex,
        })
    }

    /// The literal suffix.
    #[must_use]
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Recover the original stem from a derived file name.
    ///
    /// Returns `None` when the name does not carry the suffix. An empty suffix
    /// falls back to the plain stem.
    #[must_use]
    pub fn original_stem<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        if self.suffix.is_empty() {
            return plain_stem(file_name);
        }
        self.regex
            .captures(file_name)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// Display hint for a missing derivative of `stem`.
    #[must_use]
    pub fn expected_name(&self, stem: &str) -> String {
        format!("{stem}{}*", self.suffix)
    }
}

/// File name without its final extension.
fn plain_stem(file_name: &str) -> Option<&str> {
    Path::new(file_name).file_stem().and_then(|s| s.to_str())
}

/// How one side of a comparison turns file names into keys.
#[derive(Debug, Clone)]
pub struct IndexRule {
    /// Modality being indexed.
    pub modality: Modality,
    /// Skip files outside the modality's extension allow-list.
    pub filter_extensions: bool,
    /// Strip this suffix from derived stems.
    pub suffix: Option<SuffixPattern>,
}

impl IndexRule {
    /// Rule for the source tree: allow-listed extensions, plain stems.
    #[must_use]
    pub fn source(modality: Modality) -> Self {
        Self {
            modality,
            filter_extensions: true,
            suffix: None,
        }
    }

    /// Rule for the derived tree.
    ///
    /// Images are keyed through the suffix pattern and keep every extension,
    /// so a derivative written in a non-raster format is still matched and
    /// reported. Audio and video use plain stems with the allow-list.
    #[must_use]
    pub fn derived(modality: Modality, suffix: Option<&SuffixPattern>) -> Self {
        match (modality, suffix) {
            (Modality::Image, Some(pattern)) => Self {
                modality,
                filter_extensions: false,
                suffix: Some(pattern.clone()),
            },
            _ => Self::source(modality),
        }
    }

    /// Key for `file_name` inside `relative_dir`, or `None` if the file is skipped.
    #[must_use]
    pub fn key_for(&self, relative_dir: &Path, file_name: &str) -> Option<CorrespondenceKey> {
        if file_name.starts_with('.') {
            return None;
        }
        if self.filter_extensions && !self.modality.accepts(file_name) {
            return None;
        }

        let stem = match &self.suffix {
            Some(pattern) => pattern.original_stem(file_name)?,
            None => plain_stem(file_name)?,
        };

        Some(CorrespondenceKey::new(relative_dir, stem))
    }
}
