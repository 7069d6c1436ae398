//! Mailsift Worker - Bulk subscriber import and validation pipeline
//!
//! Streams uploaded CSV files through decoding, email validation and
//! duplicate detection, tracking per-job progress and producing a durable
//! per-record report.

mod cli;
mod config;
mod error;
mod services;
mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use cli::{Cli, Command};
use services::decoder::{read_headers, suggest_mapping};
use services::import_processor::ImportService;
use services::persistence::MemorySink;
use services::progress::ProgressReporter;
use services::storage::{FileStore, LocalFileStore};
use services::validator::HeuristicValidator;
use types::{ImportJobStatus, ImportOptions, IDENTIFIER_FIELD};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs directory - use LOGS_DIR env var or default to ./logs
    let logs_dir = std::env::var("LOGS_DIR").unwrap_or_else(|_| "./logs".to_string());
    std::fs::create_dir_all(&logs_dir).ok();

    // File appender for persistent logs (daily rotation)
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &logs_dir, "worker.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Initialize logging - both stdout and file
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,mailsift_worker=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer()) // stdout
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        ) // file
        .init();

    let args = Cli::parse();
    let config = config::Config::from_env()?;

    match args.command {
        Command::Inspect { file } => inspect(&file),
        Command::Run {
            file,
            email_column,
            threshold,
            batch_size,
            duplicates,
            report,
        } => {
            run_import(
                &config, &file, email_column, threshold, batch_size, &duplicates, report,
            )
            .await
        }
    }
}

fn inspect(file: &str) -> Result<()> {
    let store = LocalFileStore::passthrough();
    let headers = read_headers(store.open_stream(file)?)?;
    let mapping = suggest_mapping(&headers);

    info!(file, columns = headers.len(), "inspected header row");
    println!("{}", serde_json::to_string_pretty(&mapping)?);
    Ok(())
}

async fn run_import(
    config: &config::Config,
    file: &str,
    email_column: Option<String>,
    threshold: Option<u8>,
    batch_size: Option<usize>,
    duplicates: &str,
    report: Option<String>,
) -> Result<()> {
    let duplicate_handling =
        cli::parse_duplicate_handling(duplicates).map_err(|e| anyhow::anyhow!(e))?;

    let mut options = match email_column {
        Some(column) => ImportOptions::with_email_column(&column),
        None => {
            // No explicit column: fall back to header auto-detection.
            let store = LocalFileStore::passthrough();
            let headers = read_headers(store.open_stream(file)?)?;
            let mapping = suggest_mapping(&headers);
            if !mapping.values().any(|f| f == IDENTIFIER_FIELD) {
                anyhow::bail!(
                    "no email column detected in {:?}; pass one with --email-column",
                    headers
                );
            }
            let mut options = ImportOptions::with_email_column("");
            options.column_mapping = mapping;
            options
        }
    };
    options.duplicate_handling = duplicate_handling;
    options.validation_threshold = threshold.unwrap_or(config.default_validation_threshold);
    options.batch_size = batch_size.unwrap_or(config.default_batch_size);

    let service = ImportService::new(
        Arc::new(HeuristicValidator::new()),
        Arc::new(MemorySink::new()),
        Arc::new(LocalFileStore::passthrough()),
        config.processor_settings(),
    );

    let user_id = Uuid::new_v4();
    let job = service.create_job(file, options, user_id).await?;
    info!(job_id = %job.id, file, "import started");

    let mut reporter = ProgressReporter::new();
    let snapshot = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!(job_id = %job.id, "interrupt received, cancelling import");
                if let Err(e) = service.cancel_job(job.id, user_id) {
                    warn!(job_id = %job.id, error = %e, "cancel request not applied");
                }
            }
            _ = tokio::time::sleep(Duration::from_millis(500)) => {}
        }

        let snapshot = service.get_job(job.id)?;
        let sample = reporter.observe(&snapshot);
        info!(
            processed = sample.processed,
            total = ?sample.total,
            percentage = sample.percentage,
            rate_per_sec = sample.rate,
            eta_seconds = ?sample.eta_seconds,
            "import progress"
        );
        if snapshot.status.is_terminal() {
            break snapshot;
        }
    };

    match snapshot.status {
        ImportJobStatus::Completed => {
            let summary = snapshot.validation_summary.as_ref();
            info!(
                valid = snapshot.valid_records,
                risky = snapshot.risky_records,
                invalid = snapshot.invalid_records,
                duplicates = snapshot.duplicate_records,
                average_confidence = summary.map(|s| s.average_confidence_score),
                elapsed_ms = summary.map(|s| s.processing_time_ms),
                "import completed"
            );
        }
        _ => {
            error!(
                job_id = %job.id,
                error = snapshot.error.as_deref().unwrap_or("unknown"),
                "import failed"
            );
        }
    }

    // The report is available for failed jobs too: already-processed rows
    // stay reportable.
    let report_path = report.unwrap_or_else(|| format!("{}.report.csv", file));
    let bytes = service.download_report(job.id)?;
    std::fs::write(&report_path, bytes)?;
    info!(path = %report_path, "report written");

    Ok(())
}
