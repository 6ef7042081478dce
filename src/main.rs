use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

use contact_dedup::config::Config;
use contact_dedup::data_quality::RunStatistics;
use contact_dedup::logging::init_logging;
use contact_dedup::pipeline::{self, FileOutcome};

/// Merge CSV contact exports into one deduplicated, classified Excel workbook.
#[derive(Debug, Parser)]
#[command(name = "contact-dedup", version, about)]
struct Cli {
    /// Directory containing the CSV exports [default: input]
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Workbook to write [default: output/contacts_master.xlsx]
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// JSON config file [default: ./contact-dedup.json if present]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for the daily log file [default: logs]
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Print the run summary as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Debug-level logging
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    run_id: String,
    output: &'a PathBuf,
    files: &'a [FileOutcome],
    stats: &'a RunStatistics,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(dir) = cli.input_dir {
        config.input_dir = dir;
    }
    if let Some(path) = cli.output {
        config.output_path = path;
    }
    if let Some(dir) = cli.log_dir {
        config.log_dir = Some(dir);
    }

    let _guard = init_logging(config.log_dir.as_deref(), cli.verbose);

    if !cli.json {
        println!("📇 Processing contact files in {}", config.input_dir.display());
    }

    let (report, export) = pipeline::run(&config)?;

    if cli.json {
        let summary = JsonSummary {
            run_id: report.run_id.to_string(),
            output: &config.output_path,
            files: &report.files,
            stats: &report.stats,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for file in &report.files {
        match &file.error {
            None => println!("✓ {} ({} accepted, {} rejected)", file.file, file.accepted, file.rejected),
            Some(error) => println!("⚠️  {} skipped: {}", file.file, error),
        }
    }
    println!("\n✅ Results saved to: {}", config.output_path.display());
    println!("   Sheets: {}", export.sheets.join(", "));
    println!("   Summary: {}", report.stats.summary());
    println!("   {}", report.stats.quality.summary());

    Ok(())
}
