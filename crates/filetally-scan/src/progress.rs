//! Progress checkpointing.
//!
//! The walker reports every accepted file to a [`ProgressObserver`]. The
//! [`ProgressReporter`] turns that stream into timestamped checkpoint lines,
//! one every `interval` files, appended to a log sink.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local};

use filetally_core::TallyError;

/// Receives the post-increment total after each accepted file.
pub trait ProgressObserver: Send + Sync {
    /// Called once per accepted file, possibly from several threads at once.
    fn on_accepted(&self, total: u64);
}

/// Observer that ignores all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_accepted(&self, _total: u64) {}
}

/// Whether `total` is a checkpoint for the given interval.
pub fn is_checkpoint(total: u64, interval: u64) -> bool {
    total == 0 || total % interval == 0
}

/// Format a checkpoint line, including its trailing newline.
pub fn checkpoint_line(at: DateTime<Local>, total: u64) -> String {
    format!(
        "{} - total processed count: {total}\n",
        at.format("%Y-%m-%dT%H:%M:%S%.3f")
    )
}

/// Appends a checkpoint line to a shared sink every `interval` accepted files.
///
/// Each line is written whole while holding the sink lock, so lines from
/// concurrent walker threads never interleave. Write failures are counted
/// and logged but never abort the walk.
#[derive(Debug)]
pub struct ProgressReporter<W: Write + Send> {
    sink: Mutex<W>,
    interval: u64,
    failures: AtomicU64,
}

impl<W: Write + Send> ProgressReporter<W> {
    /// Create a reporter writing to `sink`. An interval of 0 is treated as 1.
    pub fn new(sink: W, interval: u64) -> Self {
        Self {
            sink: Mutex::new(sink),
            interval: interval.max(1),
            failures: AtomicU64::new(0),
        }
    }

    /// Record the start-of-run checkpoint (count 0).
    pub fn start(&self) -> io::Result<()> {
        self.append(0)
    }

    /// Checkpoint interval.
    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Number of checkpoint lines that could not be written.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Consume the reporter and return its sink.
    pub fn into_inner(self) -> W {
        self.sink
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn append(&self, total: u64) -> io::Result<()> {
        let line = checkpoint_line(Local::now(), total);
        let mut sink = self
            .sink
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        sink.write_all(line.as_bytes())?;
        sink.flush()
    }
}

impl ProgressReporter<File> {
    /// Truncate (or create) the log at `path` and write the start checkpoint.
    pub fn create(path: &Path, interval: u64) -> Result<Self, TallyError> {
        let file = File::create(path).map_err(|e| TallyError::io(path, e))?;
        let reporter = Self::new(file, interval);
        reporter.start().map_err(|e| TallyError::io(path, e))?;
        Ok(reporter)
    }
}

impl<W: Write + Send> ProgressObserver for ProgressReporter<W> {
    fn on_accepted(&self, total: u64) {
        if !is_checkpoint(total, self.interval) {
            return;
        }
        if let Err(err) = self.append(total) {
            self.failures.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(total, error = %err, "failed to append progress checkpoint");
        }
    }
}
