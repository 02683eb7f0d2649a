//! Run configuration types.

use std::path::PathBuf;
use std::time::SystemTime;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::TallyError;
use crate::report::ReportFormat;

/// Format of the creation-time cutoff, e.g. `31-12-2023T23:59:59`.
pub const CUTOFF_FORMAT: &str = "%d-%m-%YT%H:%M:%S";

/// Default number of accepted files between progress checkpoints.
pub const DEFAULT_CHECKPOINT_INTERVAL: u64 = 5000;

/// Default length of the relative-path prefix used as group key.
pub const DEFAULT_GROUPING_INDEX: usize = 12;

/// Configuration for a counting run.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct TallyConfig {
    /// Directory to scan.
    pub base_path: PathBuf,

    /// Bucket counts by relative-path prefix.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub group_by_name: bool,

    /// Length of the relative-path prefix used as group key.
    #[builder(default = "DEFAULT_GROUPING_INDEX")]
    #[serde(default = "default_grouping_index")]
    pub grouping_index: usize,

    /// Only files created strictly before this instant are counted.
    #[builder(default)]
    #[serde(default)]
    pub created_at_max: Option<DateTime<Local>>,

    /// Number of walker threads (0 = available parallelism).
    #[builder(default = "0")]
    #[serde(default)]
    pub threads: usize,

    /// Accepted files between progress checkpoints.
    #[builder(default = "DEFAULT_CHECKPOINT_INTERVAL")]
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: u64,

    /// Progress log destination (None disables the log).
    #[builder(default = "Some(PathBuf::from(\"read-process.log\"))")]
    #[serde(default = "default_progress_log")]
    pub progress_log: Option<PathBuf>,

    /// Report destination.
    #[builder(default = "PathBuf::from(\"total-file-counts.csv\")")]
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,

    /// Report serialization.
    #[builder(default)]
    #[serde(default)]
    pub report_format: ReportFormat,
}

fn default_true() -> bool {
    true
}

fn default_grouping_index() -> usize {
    DEFAULT_GROUPING_INDEX
}

fn default_checkpoint_interval() -> u64 {
    DEFAULT_CHECKPOINT_INTERVAL
}

fn default_progress_log() -> Option<PathBuf> {
    Some(PathBuf::from("read-process.log"))
}

fn default_report_path() -> PathBuf {
    PathBuf::from("total-file-counts.csv")
}

impl TallyConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref base) = self.base_path {
            if base.as_os_str().is_empty() {
                return Err("Base path cannot be empty".to_string());
            }
        } else {
            return Err("Base path is required".to_string());
        }
        if self.checkpoint_interval == Some(0) {
            return Err("Checkpoint interval must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl TallyConfig {
    /// Create a new config builder.
    pub fn builder() -> TallyConfigBuilder {
        TallyConfigBuilder::default()
    }

    /// Create a config with defaults for scanning a path.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            group_by_name: true,
            grouping_index: DEFAULT_GROUPING_INDEX,
            created_at_max: None,
            threads: 0,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            progress_log: default_progress_log(),
            report_path: default_report_path(),
            report_format: ReportFormat::default(),
        }
    }

    /// The cutoff as a system time, if one is configured.
    pub fn cutoff(&self) -> Option<SystemTime> {
        self.created_at_max.map(SystemTime::from)
    }
}

/// Parse a cutoff in [`CUTOFF_FORMAT`], interpreted in the local time zone.
pub fn parse_created_at_max(value: &str) -> Result<DateTime<Local>, TallyError> {
    let naive = NaiveDateTime::parse_from_str(value.trim(), CUTOFF_FORMAT).map_err(|e| {
        TallyError::config(format!(
            "createdAtMax {value:?} does not match dd-MM-yyyyTHH:mm:ss: {e}"
        ))
    })?;

    // A time skipped by a DST jump has no local mapping.
    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| TallyError::config(format!("createdAtMax {value:?} does not exist locally")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_config_builder() {
        let config = TallyConfig::builder()
            .base_path("/data")
            .grouping_index(4usize)
            .threads(2usize)
            .group_by_name(false)
            .build()
            .unwrap();

        assert_eq!(config.base_path, PathBuf::from("/data"));
        assert_eq!(config.grouping_index, 4);
        assert_eq!(config.threads, 2);
        assert!(!config.group_by_name);
        assert_eq!(config.checkpoint_interval, DEFAULT_CHECKPOINT_INTERVAL);
        assert_eq!(config.progress_log, Some(PathBuf::from("read-process.log")));
        assert!(config.created_at_max.is_none());
    }

    #[test]
    fn test_builder_requires_base_path() {
        assert!(TallyConfig::builder().build().is_err());
        assert!(TallyConfig::builder().base_path("").build().is_err());
    }

    #[test]
    fn test_builder_rejects_zero_interval() {
        let result = TallyConfig::builder()
            .base_path("/data")
            .checkpoint_interval(0u64)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_config_defaults() {
        let config = TallyConfig::new("/data");
        assert!(config.group_by_name);
        assert_eq!(config.grouping_index, 12);
        assert_eq!(config.report_path, PathBuf::from("total-file-counts.csv"));
        assert_eq!(config.report_format, ReportFormat::Csv);
        assert!(config.cutoff().is_none());
    }

    #[test]
    fn test_parse_created_at_max() {
        let parsed = parse_created_at_max("05-03-2021T14:30:15").unwrap();
        assert_eq!(parsed.day(), 5);
        assert_eq!(parsed.month(), 3);
        assert_eq!(parsed.year(), 2021);
        assert_eq!(parsed.hour(), 14);
        assert_eq!(parsed.minute(), 30);
        assert_eq!(parsed.second(), 15);
    }

    #[test]
    fn test_parse_created_at_max_rejects_other_formats() {
        assert!(matches!(
            parse_created_at_max("2021-03-05T14:30:15"),
            Err(TallyError::Config { .. })
        ));
        assert!(parse_created_at_max("05-03-2021").is_err());
        assert!(parse_created_at_max("").is_err());
    }
}
