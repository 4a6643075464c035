//! CLI entry point for meterlog.
//!
//! Provides the two migration directions:
//! - `import`: merge uploaded interchange data into the local ring buffer
//!   databases (run on the replacement unit).
//! - `export`: project an old unit's ring buffer files into interchange
//!   rows, producing the upload set for a later import.
//!
//! # Usage
//!
//! ```bash
//! meterlog export --data /uploads/old-unit
//! meterlog import --from /uploads/old-unit --until 2019-03-09
//! ```
//!
//! Take a backup of the database directory before importing; the merge
//! rewrites ring buffer files in place.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use meterlog::batch::{self, BatchReport, ExportOptions, ImportOptions};
use meterlog::config::Settings;
use meterlog::cutoff::Cutoff;

#[derive(Parser)]
#[command(name = "meterlog")]
#[command(about = "Migrates ring-buffer usage logs between energy-meter displays", long_about = None)]
struct Cli {
    /// Optional configuration file
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge uploaded interchange data into the local databases
    Import {
        /// Directory holding the uploaded interchange files
        #[arg(long)]
        from: Option<PathBuf>,

        /// Import samples generated until this date (YYYY-MM-DD), inclusive
        #[arg(long)]
        until: Option<String>,

        /// Database directory (default: first existing configured path)
        #[arg(long)]
        database: Option<PathBuf>,

        /// Registry document naming the local devices
        #[arg(long)]
        registry: Option<PathBuf>,
    },

    /// Project an old unit's ring buffers into interchange files
    Export {
        /// Directory holding the old unit's schema and ring buffer files
        #[arg(long)]
        data: PathBuf,

        /// Registry document naming the old unit's devices
        #[arg(long)]
        registry: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::new(cli.config.as_deref())?;
    init_tracing(&settings.log_level);

    match cli.command {
        Commands::Import {
            from,
            until,
            database,
            registry,
        } => run_import(&settings, from, until.as_deref(), database, registry),
        Commands::Export { data, registry } => run_export(&settings, data, registry),
    }
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run_import(
    settings: &Settings,
    from: Option<PathBuf>,
    until: Option<&str>,
    database: Option<PathBuf>,
    registry: Option<PathBuf>,
) -> Result<()> {
    let database_dir = database
        .or_else(|| settings.locate_database_dir())
        .ok_or_else(|| {
            anyhow!(
                "cannot find database directory; checked {:?}",
                settings.database.search_paths
            )
        })?;
    info!(path = %database_dir.display(), "database location");

    let cutoff = Cutoff::parse_opt(until)?;
    if let Some(date) = until {
        info!("processing data generated until {date}, midnight");
    }

    let opts = ImportOptions {
        database_dir,
        feed_dir: from.unwrap_or_else(|| PathBuf::from(&settings.import.feed_dir)),
        registry_path: registry
            .unwrap_or_else(|| PathBuf::from(&settings.database.registry_file)),
        cutoff,
    };

    let report = batch::import_directory(&opts)?;
    print_report("merged", &report);
    Ok(())
}

fn run_export(settings: &Settings, data: PathBuf, registry: Option<PathBuf>) -> Result<()> {
    let registry_path =
        registry.unwrap_or_else(|| data.join(&settings.import.registry_file));

    let report = batch::export_directory(&ExportOptions {
        data_dir: data,
        registry_path,
    })?;
    print_report("exported", &report);
    Ok(())
}

fn print_report(verb: &str, report: &BatchReport) {
    println!(
        "{} schema files found, {} devices {verb}, {} subsets written, {} skipped, {} failed",
        report.schemas_found,
        report.devices_processed,
        report.subsets_written,
        report.devices_skipped,
        report.devices_failed,
    );
}
