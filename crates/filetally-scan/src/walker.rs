//! JWalk-based parallel file counter.

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};

use jwalk::{Parallelism, WalkDir};

use filetally_core::{
    Aggregator, ClassifyError, PathClassifier, TallyConfig, TallyError, TallyWarning,
    WarningKind,
};

use crate::progress::ProgressObserver;

/// Outcome of a walk, alongside the counts left in the [`Aggregator`].
#[derive(Debug, Clone)]
pub struct WalkSummary {
    /// Entries yielded by the traversal below the base path.
    pub visited: u64,
    /// Files counted by this walk.
    pub accepted: u64,
    /// Regular files rejected by the creation-time cutoff.
    pub skipped_by_cutoff: u64,
    /// Absorbed problems: unreadable subtrees, metadata and classification failures.
    pub warnings: Vec<TallyWarning>,
    /// Wall time of the walk.
    pub duration: Duration,
}

impl WalkSummary {
    /// Accepted files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.accepted as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Number of warnings of a given kind.
    pub fn warnings_of(&self, kind: WarningKind) -> usize {
        self.warnings.iter().filter(|w| w.kind == kind).count()
    }
}

/// Parallel directory walker feeding accepted files into an [`Aggregator`].
///
/// Directories are read by a bounded rayon pool. Files are classified and
/// counted on the worker that read their parent directory, so disjoint
/// subtrees are processed concurrently.
#[derive(Debug, Clone)]
pub struct Walker {
    base_path: PathBuf,
    cutoff: Option<SystemTime>,
    group_by_name: bool,
    grouping_index: usize,
    threads: usize,
}

impl Walker {
    /// Create a walker with grouping disabled, no cutoff and automatic threading.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            cutoff: None,
            group_by_name: false,
            grouping_index: 0,
            threads: 0,
        }
    }

    /// Create a walker from a run configuration.
    pub fn from_config(config: &TallyConfig) -> Self {
        Self {
            base_path: config.base_path.clone(),
            cutoff: config.cutoff(),
            group_by_name: config.group_by_name,
            grouping_index: config.grouping_index,
            threads: config.threads,
        }
    }

    /// Only count files created strictly before `cutoff`.
    pub fn with_cutoff(mut self, cutoff: Option<SystemTime>) -> Self {
        self.cutoff = cutoff;
        self
    }

    /// Group counts by the first `grouping_index` characters of the relative path.
    pub fn with_grouping(mut self, grouping_index: usize) -> Self {
        self.group_by_name = true;
        self.grouping_index = grouping_index;
        self
    }

    /// Number of worker threads (0 = available parallelism, 1 = serial).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Number of workers a walk will use.
    pub fn effective_threads(&self) -> usize {
        match self.threads {
            0 => rayon::current_num_threads(),
            n => n,
        }
    }

    /// Canonicalize the base path and check that it is a directory.
    pub fn resolve_base(&self) -> Result<PathBuf, TallyError> {
        let base = self
            .base_path
            .canonicalize()
            .map_err(|e| TallyError::io(&self.base_path, e))?;

        if !base.is_dir() {
            return Err(TallyError::NotADirectory { path: base });
        }
        Ok(base)
    }

    /// Walk the base path, counting accepted files into `aggregator`.
    ///
    /// `observer` is called with the post-increment total after every
    /// accepted file. An unusable base path or an aborted traversal is an
    /// error; unreadable subtrees and unclassifiable files end up in the
    /// summary's warnings.
    pub fn walk(
        &self,
        aggregator: Arc<Aggregator>,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<WalkSummary, TallyError> {
        let start = Instant::now();
        let base = self.resolve_base()?;

        let accepted_before = aggregator.total();
        let ctx = Arc::new(FileSink {
            classifier: PathClassifier::new(base.clone(), self.grouping_index),
            group_by_name: self.group_by_name,
            cutoff: self.cutoff,
            aggregator: Arc::clone(&aggregator),
            observer,
            skipped_by_cutoff: AtomicU64::new(0),
            warnings: Mutex::new(Vec::new()),
        });

        // A dedicated pool never hits jwalk's busy timeout on the global pool.
        let parallelism = match self.effective_threads() {
            1 => Parallelism::Serial,
            n => Parallelism::RayonNewPool(n),
        };

        tracing::debug!(
            base = %base.display(),
            threads = self.effective_threads(),
            grouping = self.group_by_name,
            "starting walk"
        );

        let worker_ctx = Arc::clone(&ctx);
        let walker = WalkDir::new(&base)
            .parallelism(parallelism)
            .skip_hidden(false)
            .follow_links(false)
            .min_depth(1)
            .process_read_dir(move |_depth, _dir, _state, children| {
                for entry in children.iter().flatten() {
                    if entry.file_type().is_file() {
                        let metadata = match worker_ctx.cutoff {
                            Some(_) => Some(entry.metadata().map_err(|e| e.to_string())),
                            None => None,
                        };
                        worker_ctx.accept(&entry.path(), metadata);
                    }
                }
            });

        let mut visited: u64 = 0;
        for entry_result in walker {
            match entry_result {
                Ok(entry) => {
                    visited += 1;
                    // An unreadable directory is yielded with its read error attached.
                    if let Some(err) = &entry.read_children_error {
                        let path = entry.path();
                        tracing::warn!(path = %path.display(), error = %err, "skipping unreadable directory");
                        ctx.warn(TallyWarning::new(
                            path,
                            err.to_string(),
                            WarningKind::TraversalError,
                        ));
                    }
                }
                Err(err) if err.is_busy() => {
                    tracing::error!(error = %err, "walk aborted");
                    return Err(TallyError::WalkAborted {
                        path: base,
                        message: err.to_string(),
                    });
                }
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    tracing::warn!(path = %path.display(), error = %err, "skipping unreadable entry");
                    ctx.warn(TallyWarning::new(
                        path,
                        err.to_string(),
                        WarningKind::TraversalError,
                    ));
                }
            }
        }

        let warnings = std::mem::take(
            &mut *ctx
                .warnings
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );

        let summary = WalkSummary {
            visited,
            accepted: aggregator.total() - accepted_before,
            skipped_by_cutoff: ctx.skipped_by_cutoff.load(Ordering::Relaxed),
            warnings,
            duration: start.elapsed(),
        };

        tracing::info!(
            visited = summary.visited,
            accepted = summary.accepted,
            skipped_by_cutoff = summary.skipped_by_cutoff,
            warnings = summary.warnings.len(),
            elapsed_ms = summary.duration.as_millis() as u64,
            "walk finished"
        );

        Ok(summary)
    }
}

/// Whether a file created at `created` passes the cutoff.
pub fn passes_cutoff(created: SystemTime, cutoff: SystemTime) -> bool {
    created < cutoff
}

/// Creation time, or the modification time where the platform has none.
pub fn creation_time(metadata: &Metadata) -> Option<SystemTime> {
    created_or_modified(metadata.created(), metadata.modified())
}

fn created_or_modified(
    created: std::io::Result<SystemTime>,
    modified: std::io::Result<SystemTime>,
) -> Option<SystemTime> {
    created.or(modified).ok()
}

/// State shared by every worker of one walk.
struct FileSink {
    classifier: PathClassifier,
    group_by_name: bool,
    cutoff: Option<SystemTime>,
    aggregator: Arc<Aggregator>,
    observer: Arc<dyn ProgressObserver>,
    skipped_by_cutoff: AtomicU64,
    warnings: Mutex<Vec<TallyWarning>>,
}

impl FileSink {
    /// Filter, classify and count one regular file.
    ///
    /// `metadata` is only read when a cutoff is configured.
    fn accept(&self, path: &Path, metadata: Option<Result<Metadata, String>>) {
        if let Some(cutoff) = self.cutoff {
            let created = match metadata {
                Some(Ok(ref m)) => creation_time(m),
                Some(Err(ref message)) => {
                    self.metadata_warning(path, message);
                    return;
                }
                None => None,
            };
            let Some(created) = created else {
                self.metadata_warning(path, "no creation or modification time");
                return;
            };
            if !passes_cutoff(created, cutoff) {
                self.skipped_by_cutoff.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }

        let relative = match self.classifier.relative_path(path) {
            Ok(relative) => relative,
            Err(err) => {
                // Outside the base: warned, never counted.
                tracing::warn!(path = %path.display(), error = %err, "file outside base path");
                self.warn(TallyWarning::unclassifiable(path, &err));
                return;
            }
        };

        let group_key = if self.group_by_name {
            match self.classifier.group_key(&relative) {
                Ok(key) => Some(key),
                Err(err) => {
                    self.unclassifiable(path, &err);
                    None
                }
            }
        } else {
            None
        };

        let total = self.aggregator.increment_total();
        if let Some(key) = group_key {
            self.aggregator.increment_group(&key);
        }
        self.observer.on_accepted(total);
    }

    /// Counted file that could not be placed in a group.
    fn unclassifiable(&self, path: &Path, err: &ClassifyError) {
        tracing::warn!(path = %path.display(), error = %err, "file not grouped");
        self.aggregator.record_unclassified();
        self.warn(TallyWarning::unclassifiable(path, err));
    }

    fn metadata_warning(&self, path: &Path, message: &str) {
        tracing::warn!(path = %path.display(), error = message, "cannot read file times");
        self.warn(TallyWarning::new(path, message, WarningKind::MetadataError));
    }

    fn warn(&self, warning: TallyWarning) {
        self.warnings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(warning);
    }
}
