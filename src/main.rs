//! PIM Data Cleanup CLI
//!
//! Runs one cleanup pass over a JSON grid export. Ctrl-C stops the run; the activity summary and
//! ledgers collected so far are still saved.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use pim_data_cleanup_lib::application::{RunOutcome, RunSupervisor};
use pim_data_cleanup_lib::infrastructure::{
    AppConfig, CsvResultSink, InMemoryGrid, init_logging,
};

/// Page-by-page correction of product attribute defects
#[derive(Parser)]
#[command(name = "pim-data-cleanup")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON grid export to clean up
    #[arg(long, value_name = "FILE")]
    grid: PathBuf,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Save the corrected grid to this JSON file when the run ends
    #[arg(long, value_name = "FILE")]
    write_back: Option<PathBuf>,

    /// Root directory for the summary and ledger files
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
}

fn print_summary(outcome: &RunOutcome) {
    println!();
    println!("*********************************");
    println!("*        Activity Summary       *");
    println!("*********************************");
    println!("Total Products Reviewed:  {}", outcome.counters.reviewed);
    println!("Total Products Corrected: {}", outcome.counters.fixed);
    println!("Total Errors Corrected:   {}", outcome.counters.errors_fixed);
    println!("Run ended: {}", outcome.stop_reason);
    match &outcome.persisted {
        Ok(artifacts) => {
            println!("Summary:   {}", artifacts.summary.display());
            println!("Reviewed:  {}", artifacts.reviewed.display());
            println!("Corrected: {}", artifacts.corrected.display());
        }
        Err(error) => println!("Error:: run artifacts were not saved: {error}"),
    }
    println!("*********************************");
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(output_dir) = cli.output_dir {
        config.output.root_dir = output_dir;
    }
    init_logging(&config.logging)?;

    let grid = InMemoryGrid::from_json_file(&cli.grid, config.run.page_size)
        .await
        .with_context(|| format!("Failed to load grid export {}", cli.grid.display()))?;
    info!(grid = %cli.grid.display(), records = grid.records().len(), "Grid export loaded");
    let sink = CsvResultSink::new(config.output.clone());

    let cancel = CancellationToken::new();
    let operator_signal = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, finishing the current step and saving results");
            operator_signal.cancel();
        }
    });

    let supervisor = RunSupervisor::new(&grid, &sink, config.run.retry_policy(), cancel);
    let outcome = supervisor.run().await;
    print_summary(&outcome);

    if let Some(path) = &cli.write_back {
        grid.export_json(path)
            .await
            .with_context(|| format!("Failed to write corrected grid to {}", path.display()))?;
        info!(path = %path.display(), "Corrected grid saved");
    }

    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
