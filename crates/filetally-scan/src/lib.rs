//! Parallel file counting for filetally.
//!
//! This crate walks a directory tree with jwalk and feeds every accepted
//! regular file into a shared [`Aggregator`]. Key features:
//!
//! - **Parallel traversal** via jwalk/rayon with a bounded worker pool
//! - **Creation-time cutoff**, strict less-than
//! - **Prefix grouping** of relative paths
//! - **Progress checkpoints** through a pluggable [`ProgressObserver`]
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use filetally_scan::{Aggregator, NoProgress, Walker};
//!
//! let aggregator = Arc::new(Aggregator::new());
//! let summary = Walker::new("/path/to/scan")
//!     .with_grouping(12)
//!     .walk(Arc::clone(&aggregator), Arc::new(NoProgress))
//!     .unwrap();
//!
//! println!("Counted {} files", aggregator.total());
//! println!("{} warnings", summary.warnings.len());
//! ```
//!
//! # Progress Log
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use filetally_scan::{Aggregator, ProgressReporter, Walker};
//!
//! // Truncates the log and writes the count-0 line.
//! let reporter = Arc::new(ProgressReporter::create(Path::new("read-process.log"), 5000).unwrap());
//! Walker::new("/path/to/scan")
//!     .walk(Arc::new(Aggregator::new()), reporter)
//!     .unwrap();
//! ```

mod progress;
mod walker;

pub use progress::{NoProgress, ProgressObserver, ProgressReporter, checkpoint_line, is_checkpoint};
pub use walker::{WalkSummary, Walker, creation_time, passes_cutoff};

// Re-export core types for convenience
pub use filetally_core::{
    AggregateState, Aggregator, PathClassifier, TallyConfig, TallyError, TallyWarning, WarningKind,
};
