//! `app.properties` loader.
//!
//! Entries are `key=value`, separated by `;` or newlines. Tabs and carriage
//! returns inside values are dropped. Blank entries and `#` comments are
//! skipped, unknown keys are ignored.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::config::{DEFAULT_GROUPING_INDEX, TallyConfig, parse_created_at_max};
use crate::error::TallyError;

/// Values read from a properties file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Properties {
    /// `pathName`; `None` means there is nothing to scan.
    pub path_name: Option<String>,
    /// `groupFileCountsByName`.
    pub group_file_counts_by_name: bool,
    /// `fileNameGroupingIndex`.
    pub file_name_grouping_index: usize,
    /// `createdAtMax` (or the older `lastReadDate`).
    pub created_at_max: Option<DateTime<Local>>,
}

impl Default for Properties {
    fn default() -> Self {
        Self {
            path_name: None,
            group_file_counts_by_name: true,
            file_name_grouping_index: DEFAULT_GROUPING_INDEX,
            created_at_max: None,
        }
    }
}

impl Properties {
    /// Parse properties text.
    pub fn parse(text: &str) -> Result<Self, TallyError> {
        let mut props = Self::default();

        for entry in text.split([';', '\n']) {
            let entry = entry.trim_matches(|c: char| c.is_whitespace());
            if entry.is_empty() || entry.starts_with('#') {
                continue;
            }

            let (key, value) = entry
                .split_once('=')
                .ok_or_else(|| TallyError::config(format!("expected key=value, found {entry:?}")))?;
            let value: String = value.chars().filter(|c| !matches!(c, '\t' | '\r')).collect();

            match key.trim() {
                "pathName" => {
                    props.path_name = Some(value).filter(|v| !v.is_empty());
                }
                "groupFileCountsByName" => {
                    props.group_file_counts_by_name = parse_bool(key, &value)?;
                }
                "fileNameGroupingIndex" => {
                    props.file_name_grouping_index = value.trim().parse().map_err(|e| {
                        TallyError::config(format!("fileNameGroupingIndex {value:?}: {e}"))
                    })?;
                }
                "createdAtMax" | "lastReadDate" => {
                    props.created_at_max = if value.trim().is_empty() {
                        None
                    } else {
                        Some(parse_created_at_max(&value)?)
                    };
                }
                _ => {}
            }
        }

        Ok(props)
    }

    /// Read and parse a properties file.
    pub fn load(path: &Path) -> Result<Self, TallyError> {
        let text = std::fs::read_to_string(path).map_err(|e| TallyError::io(path, e))?;
        Self::parse(&text)
    }

    /// Read a properties file, treating a missing file as empty.
    pub fn load_or_default(path: &Path) -> Result<Self, TallyError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(TallyError::io(path, e)),
        }
    }

    /// Build a run configuration, or `None` when no `pathName` is set.
    pub fn into_config(self) -> Option<TallyConfig> {
        let path_name = self.path_name?;
        let mut config = TallyConfig::new(PathBuf::from(path_name));
        config.group_by_name = self.group_file_counts_by_name;
        config.grouping_index = self.file_name_grouping_index;
        config.created_at_max = self.created_at_max;
        Some(config)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, TallyError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(TallyError::config(format!(
            "{key} must be true or false, found {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full() {
        let props = Properties::parse(
            "pathName=/srv/files\ngroupFileCountsByName=false\nfileNameGroupingIndex=4\ncreatedAtMax=01-02-2020T00:00:00\n",
        )
        .unwrap();

        assert_eq!(props.path_name.as_deref(), Some("/srv/files"));
        assert!(!props.group_file_counts_by_name);
        assert_eq!(props.file_name_grouping_index, 4);
        assert!(props.created_at_max.is_some());
    }

    #[test]
    fn test_parse_semicolons_and_control_chars() {
        let props = Properties::parse("pathName=/srv/\tfiles\r;fileNameGroupingIndex=3").unwrap();
        assert_eq!(props.path_name.as_deref(), Some("/srv/files"));
        assert_eq!(props.file_name_grouping_index, 3);
    }

    #[test]
    fn test_defaults() {
        let props = Properties::parse("").unwrap();
        assert_eq!(props, Properties::default());
        assert!(props.group_file_counts_by_name);
        assert_eq!(props.file_name_grouping_index, 12);
        assert!(props.created_at_max.is_none());
        assert!(props.into_config().is_none());
    }

    #[test]
    fn test_legacy_cutoff_key() {
        let props = Properties::parse("lastReadDate=31-12-2022T23:59:59").unwrap();
        assert!(props.created_at_max.is_some());
    }

    #[test]
    fn test_comments_and_unknown_keys() {
        let props = Properties::parse("# scan root\nfoo=bar\npathName=/x\n\n").unwrap();
        assert_eq!(props.path_name.as_deref(), Some("/x"));
    }

    #[test]
    fn test_malformed_entries() {
        assert!(matches!(
            Properties::parse("pathName"),
            Err(TallyError::Config { .. })
        ));
        assert!(Properties::parse("groupFileCountsByName=yes").is_err());
        assert!(Properties::parse("fileNameGroupingIndex=-1").is_err());
        assert!(Properties::parse("createdAtMax=2020-01-01").is_err());
    }

    #[test]
    fn test_into_config() {
        let config = Properties::parse("pathName=/srv/files;fileNameGroupingIndex=2")
            .unwrap()
            .into_config()
            .unwrap();
        assert_eq!(config.base_path, PathBuf::from("/srv/files"));
        assert_eq!(config.grouping_index, 2);
        assert!(config.group_by_name);
        assert!(config.created_at_max.is_none());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let props = Properties::load_or_default(&temp.path().join("app.properties")).unwrap();
        assert!(props.path_name.is_none());
        assert!(Properties::load(&temp.path().join("app.properties")).is_err());
    }
}
