//! Final report serialization.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateState;
use crate::error::TallyError;

/// Header line of the CSV report.
pub const CSV_HEADER: &str = "pathName,count";

/// Label of the grand-total line in the CSV report.
pub const TOTAL_LABEL: &str = "Total Count";

/// Serialization of the final report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// `pathName,count` header, total line, one line per group.
    ///
    /// Group keys containing a comma, quote or line break are quoted
    /// RFC 4180 style.
    #[default]
    Csv,
    /// The aggregate state as a JSON object.
    Json,
}

/// Writes an [`AggregateState`] once traversal is complete.
#[derive(Debug, Clone, Copy)]
pub struct ReportWriter {
    format: ReportFormat,
    include_groups: bool,
}

impl ReportWriter {
    /// Create a writer. Group lines are only emitted when `include_groups` is set.
    pub fn new(format: ReportFormat, include_groups: bool) -> Self {
        Self {
            format,
            include_groups,
        }
    }

    /// Serialize `state` into `out`.
    pub fn write_to<W: Write>(&self, state: &AggregateState, mut out: W) -> std::io::Result<()> {
        match self.format {
            ReportFormat::Csv => {
                writeln!(out, "{CSV_HEADER}")?;
                writeln!(out, "{TOTAL_LABEL},{}", state.total_count)?;
                if self.include_groups {
                    for (key, count) in &state.group_counts {
                        writeln!(out, "{},{count}", csv_field(key))?;
                    }
                }
            }
            ReportFormat::Json => {
                if self.include_groups {
                    serde_json::to_writer_pretty(&mut out, state)?;
                } else {
                    let totals_only = AggregateState {
                        total_count: state.total_count,
                        group_counts: Default::default(),
                        unclassified: state.unclassified,
                    };
                    serde_json::to_writer_pretty(&mut out, &totals_only)?;
                }
                writeln!(out)?;
            }
        }
        out.flush()
    }

    /// Serialize `state` into the file at `path`, truncating it.
    pub fn write(&self, state: &AggregateState, path: &Path) -> Result<(), TallyError> {
        let file = File::create(path).map_err(|e| TallyError::io(path, e))?;
        self.write_to(state, BufWriter::new(file))
            .map_err(|e| TallyError::io(path, e))
    }
}

/// Quote a CSV field when it would otherwise split the line.
fn csv_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}
