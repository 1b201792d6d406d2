//! Cloud Billing operator entry point.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use cloud_billing::config::BillingConfig;
use cloud_billing::models::{CatalogImport, RecordConsumption};
use cloud_billing::services::init_metrics;
use cloud_billing::startup::Application;
use serde::Serialize;
use service_core::observability::init_tracing;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the billing document (overrides BILLING_DOCUMENT_PATH)
    #[arg(short, long)]
    document: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Invoice unbilled consumption between two dates, both days inclusive
    Generate {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    /// Collapse duplicate consumption events
    Dedupe,
    /// Apply a JSON catalog import file
    Import {
        #[arg(long)]
        file: PathBuf,
    },
    /// Append consumption events from a JSON array file
    Ingest {
        #[arg(long)]
        file: PathBuf,
    },
    /// Revenue from invoices issued between two dates
    Revenue {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    /// Print the whole document
    Snapshot,
    /// Replace the document with an empty one
    Reset,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let bytes = std::fs::read(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = BillingConfig::from_env()?;
    if let Some(path) = args.document {
        config = config.with_store_path(path);
    }

    init_tracing(
        &config.service_name,
        &config.common.log_level,
        config.common.otlp_endpoint.as_deref(),
    );
    init_metrics();

    tracing::info!(
        version = %config.service_version,
        document = %config.store.path.display(),
        "Starting cloud-billing"
    );

    let app = Application::build(&config).await?;

    match args.command {
        Command::Generate { from, to } => {
            let run = app.billing.generate_invoices_for_dates(from, to).await?;
            print_json(&run)?;
        }
        Command::Dedupe => {
            let report = app.consumption.deduplicate().await?;
            print_json(&report)?;
        }
        Command::Import { file } => {
            let import: CatalogImport = read_json(&file)?;
            let summary = app.catalog.import_catalog(import).await?;
            print_json(&summary)?;
        }
        Command::Ingest { file } => {
            let events: Vec<RecordConsumption> = read_json(&file)?;
            let count = app.consumption.ingest_batch(events).await?;
            print_json(&serde_json::json!({ "ingested": count }))?;
        }
        Command::Revenue { from, to } => {
            let report = app.reports.revenue_report(from, to).await?;
            print_json(&report)?;
        }
        Command::Snapshot => {
            let document = app.db.snapshot().await?;
            print_json(&document)?;
        }
        Command::Reset => {
            app.db.reset().await?;
            tracing::info!("Document reset");
        }
    }

    Ok(())
}
