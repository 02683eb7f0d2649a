//! filetally - count files under a directory, grouped by relative-path prefix.
//!
//! Usage:
//!   filetally                       Read ./app.properties and count
//!   filetally --path DIR            Count DIR, overriding pathName
//!   filetally --config FILE         Read another properties file
//!   filetally --help                Show help

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use filetally_core::{DEFAULT_CHECKPOINT_INTERVAL, Properties, ReportFormat, ReportWriter};
use filetally_scan::{
    Aggregator, NoProgress, ProgressObserver, ProgressReporter, TallyConfig, Walker,
};

/// Properties file read when `--config` is not given.
const DEFAULT_PROPERTIES: &str = "app.properties";

#[derive(Parser)]
#[command(
    name = "filetally",
    version,
    about = "Count files created before a cutoff, grouped by path prefix",
    long_about = "filetally walks a directory tree in parallel and counts regular files.\n\n\
                  Settings come from a properties file (pathName, groupFileCountsByName, \
                  fileNameGroupingIndex, createdAtMax) and can be overridden on the command \
                  line. The total is printed on stdout and a report is written to disk."
)]
struct Cli {
    /// Properties file (defaults to ./app.properties, which may be absent)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to scan, overriding pathName
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Worker threads (0 = available parallelism)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Accepted files between progress log lines
    #[arg(long, default_value_t = DEFAULT_CHECKPOINT_INTERVAL, value_parser = clap::value_parser!(u64).range(1..))]
    checkpoint_interval: u64,

    /// Progress log file
    #[arg(long, default_value = "read-process.log")]
    log_file: PathBuf,

    /// Do not write a progress log
    #[arg(long, conflicts_with = "log_file")]
    no_progress_log: bool,

    /// Report file
    #[arg(short, long, default_value = "total-file-counts.csv")]
    report: PathBuf,

    /// Report format
    #[arg(short, long, default_value = "csv")]
    format: OutputFormat,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Csv => ReportFormat::Csv,
            OutputFormat::Json => ReportFormat::Json,
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(config) = build_config(&cli)? else {
        println!("No pathName found");
        return Ok(());
    };

    run(&config)
}

/// Log to stderr so stdout only carries the final count.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "info" })
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Merge the properties file with command-line overrides.
///
/// Returns `None` when no directory to scan was configured.
fn build_config(cli: &Cli) -> Result<Option<TallyConfig>> {
    let mut props = match &cli.config {
        Some(path) => Properties::load(path),
        None => Properties::load_or_default(Path::new(DEFAULT_PROPERTIES)),
    }
    .context("Failed to load configuration")?;

    if let Some(path) = &cli.path {
        props.path_name = Some(path.to_string_lossy().into_owned());
    }

    let Some(mut config) = props.into_config() else {
        return Ok(None);
    };

    if let Some(threads) = cli.threads {
        config.threads = threads;
    }
    config.checkpoint_interval = cli.checkpoint_interval;
    config.progress_log = (!cli.no_progress_log).then(|| cli.log_file.clone());
    config.report_path = cli.report.clone();
    config.report_format = cli.format.into();

    Ok(Some(config))
}

/// Walk, report and print the total.
fn run(config: &TallyConfig) -> Result<()> {
    let walker = Walker::from_config(config);
    // Checked before the progress log is truncated.
    walker.resolve_base().context("Scan failed")?;

    let observer: Arc<dyn ProgressObserver> = match &config.progress_log {
        Some(path) => match ProgressReporter::create(path, config.checkpoint_interval) {
            Ok(reporter) => Arc::new(reporter),
            Err(err) => {
                tracing::warn!(error = %err, "progress log disabled");
                Arc::new(NoProgress)
            }
        },
        None => Arc::new(NoProgress),
    };

    tracing::info!(
        path = %config.base_path.display(),
        grouping = config.group_by_name,
        grouping_index = config.grouping_index,
        cutoff = ?config.created_at_max,
        "counting files"
    );

    let aggregator = Arc::new(Aggregator::new());
    let summary = walker
        .walk(Arc::clone(&aggregator), observer)
        .context("Scan failed")?;
    let state = aggregator.snapshot();

    if !summary.warnings.is_empty() {
        tracing::warn!(count = summary.warnings.len(), "entries skipped or left ungrouped");
    }

    let writer = ReportWriter::new(config.report_format, config.group_by_name);
    if let Err(err) = writer.write(&state, &config.report_path) {
        // The counts are still good; show them before failing.
        eprintln!("Could not write report, totals follow:");
        ReportWriter::new(ReportFormat::Csv, config.group_by_name)
            .write_to(&state, std::io::stderr().lock())
            .ok();
        println!("{}", state.total_count);
        return Err(err).context("Failed to write report");
    }

    println!("{}", state.total_count);
    Ok(())
}
