//! Core types for filetally.
//!
//! This crate holds everything that does not touch the directory walk itself:
//! run configuration, the `app.properties` loader, path classification, the
//! shared counter store and report serialization.

mod aggregate;
mod classify;
mod config;
mod error;
mod properties;
mod report;

pub use aggregate::{AggregateState, Aggregator};
pub use classify::{Classified, PathClassifier, classify};
pub use config::{
    CUTOFF_FORMAT, DEFAULT_CHECKPOINT_INTERVAL, DEFAULT_GROUPING_INDEX, TallyConfig,
    TallyConfigBuilder, parse_created_at_max,
};
pub use error::{ClassifyError, TallyError, TallyWarning, WarningKind};
pub use properties::Properties;
pub use report::{CSV_HEADER, ReportFormat, ReportWriter, TOTAL_LABEL};
