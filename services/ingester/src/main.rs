//! ARGO NetCDF ingester.
//!
//! Reads metadata, profile and trajectory files from the command line,
//! normalizes their QC and commits each file into the SQLite catalog in
//! its own transaction. Metadata files go first so that data files find
//! their floats.

mod config;
mod discover;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use ingestion::Ingester;
use netcdf_parser::NativeReader;
use storage::Catalog;

use config::IngesterConfig;

#[derive(Parser, Debug)]
#[command(name = "argo-ingester")]
#[command(about = "Ingest ARGO NetCDF files into the float catalog")]
struct Args {
    /// Files or directories to ingest
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Configuration file path
    #[arg(short, long, env = "ARGO_INGESTER_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database path (overrides config)
    #[arg(long, env = "ARGO_DB_PATH")]
    database: Option<PathBuf>,

    /// Files processed at the same time (overrides config)
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Log level (overrides config)
    #[arg(long)]
    log_level: Option<String>,

    /// Log format: json or pretty (overrides config)
    #[arg(long)]
    log_format: Option<String>,
}

fn init_tracing(level: &str, format: &str) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true);

    if format.eq_ignore_ascii_case("pretty") {
        tracing::subscriber::set_global_default(builder.pretty().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => IngesterConfig::from_yaml(path)?,
        None => IngesterConfig::default(),
    };
    if let Some(database) = args.database {
        config.database.path = database;
    }
    if let Some(n) = args.concurrency {
        config.ingestion.max_concurrent_files = n;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if let Some(format) = args.log_format {
        config.logging.format = format;
    }

    init_tracing(&config.logging.level, &config.logging.format)?;
    info!(database = %config.database.path.display(), "Starting ARGO ingester");

    let inputs = discover::discover(&args.paths)?;
    if inputs.is_empty() {
        warn!("No NetCDF files found");
        return Ok(ExitCode::SUCCESS);
    }
    info!(
        metadata = inputs.metadata.len(),
        data = inputs.data.len(),
        "Discovered input files"
    );

    let catalog = Catalog::open_with(&config.database.path, &config.catalog_options())
        .await
        .context("Failed to open catalog")?;

    let ingester = Ingester::new(Arc::new(NativeReader::new()), catalog, config.ingest_options());

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted; finishing in-flight files");
                cancel.cancel();
            }
        });
    }

    let mut report = ingester.ingest_batch(inputs.metadata, &cancel).await;
    report.extend(ingester.ingest_batch(inputs.data, &cancel).await);

    for file in &report.files {
        println!("{file}");
    }
    for failure in report.failures() {
        if let Some(e) = failure.error() {
            error!(path = %failure.path().display(), kind = e.kind(), error = %e, "File failed");
        }
    }

    let totals = serde_json::json!({
        "committed": report.committed(),
        "failed": report.failed(),
        "skipped": report.skipped(),
        "rows": report.totals(),
    });
    println!("{}", serde_json::to_string_pretty(&totals)?);

    info!(
        committed = report.committed(),
        failed = report.failed(),
        skipped = report.skipped(),
        "Ingestion finished"
    );

    Ok(if report.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
