//! Relative path and group key derivation.

use std::path::{Path, PathBuf};

use compact_str::CompactString;

use crate::error::ClassifyError;

/// Result of classifying one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    /// Path relative to the base path, without a leading separator.
    pub relative: String,
    /// First `grouping_index` characters of `relative`.
    pub group_key: CompactString,
}

/// Derives relative paths and group keys against a fixed base path.
///
/// Classification is a pure function of the file path, the base path and
/// the grouping index: the same relative path always yields the same key.
#[derive(Debug, Clone)]
pub struct PathClassifier {
    base: PathBuf,
    grouping_index: usize,
}

impl PathClassifier {
    /// Create a classifier for files under `base`.
    pub fn new(base: impl Into<PathBuf>, grouping_index: usize) -> Self {
        Self {
            base: base.into(),
            grouping_index,
        }
    }

    /// The base path files are classified against.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// The prefix length used for group keys.
    pub fn grouping_index(&self) -> usize {
        self.grouping_index
    }

    /// Strip the base path and its trailing separator from `path`.
    pub fn relative_path(&self, path: &Path) -> Result<String, ClassifyError> {
        match path.strip_prefix(&self.base) {
            Ok(rel) if !rel.as_os_str().is_empty() => Ok(rel.to_string_lossy().into_owned()),
            _ => Err(ClassifyError::InvalidPath {
                path: path.to_path_buf(),
                base: self.base.clone(),
            }),
        }
    }

    /// The first `grouping_index` characters of `relative`.
    pub fn group_key(&self, relative: &str) -> Result<CompactString, ClassifyError> {
        match relative.char_indices().nth(self.grouping_index) {
            Some((end, _)) => Ok(CompactString::new(&relative[..end])),
            None if relative.chars().count() == self.grouping_index => {
                Ok(CompactString::new(relative))
            }
            None => Err(ClassifyError::InvalidGroupingIndex {
                relative: relative.to_string(),
                index: self.grouping_index,
            }),
        }
    }

    /// Derive both the relative path and the group key of `path`.
    pub fn classify(&self, path: &Path) -> Result<Classified, ClassifyError> {
        let relative = self.relative_path(path)?;
        let group_key = self.group_key(&relative)?;
        Ok(Classified {
            relative,
            group_key,
        })
    }
}

/// Classify `path` against `base` in one call.
pub fn classify(
    path: &Path,
    base: &Path,
    grouping_index: usize,
) -> Result<Classified, ClassifyError> {
    PathClassifier::new(base, grouping_index).classify(path)
}
