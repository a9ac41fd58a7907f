//! Prospecta Worker - Backend service for bulk contact imports
//!
//! This worker connects to NATS and handles spreadsheet-import messages from
//! the frontend: upload, column mapping, chunked import runs, status.

mod cli;
mod config;
mod defaults;
mod handlers;
mod services;
mod types;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs directory - use LOGS_DIR env var or default to ../logs (relative to worker)
    let logs_dir = std::env::var("LOGS_DIR")
        .unwrap_or_else(|_| "../logs".to_string());
    std::fs::create_dir_all(&logs_dir).ok();

    // File appender for persistent logs (daily rotation)
    let file_appender = RollingFileAppender::new(
        Rotation::DAILY,
        &logs_dir,
        "worker.log",
    );
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Initialize logging - both stdout and file
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,prospecta_worker=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())  // stdout
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))  // file
        .init();

    let args = cli::Cli::parse();
    match args.command {
        Some(cli::Command::Inspect { file }) => run_inspect(&file),
        Some(cli::Command::Serve) | None => serve().await,
    }
}

async fn serve() -> Result<()> {
    info!("Starting Prospecta Worker...");

    // Load configuration
    let config = config::Config::from_env()?;
    info!("Configuration loaded");

    // Connect to NATS (supports optional NATS_USER/NATS_PASSWORD auth).
    let nats_client = match (std::env::var("NATS_USER"), std::env::var("NATS_PASSWORD")) {
        (Ok(user), Ok(password)) if !user.is_empty() => {
            async_nats::ConnectOptions::new()
                .user_and_password(user, password)
                .connect(&config.nats_url)
                .await?
        }
        _ => async_nats::connect(&config.nats_url).await?,
    };
    info!("Connected to NATS at {}", config.nats_url);

    // Start message handlers
    let handler_result = handlers::start_handlers(nats_client, &config).await;

    if let Err(e) = handler_result {
        error!("Handler error: {}", e);
        return Err(e);
    }

    Ok(())
}

/// Offline dry-run of the mapping step on a local CSV file.
fn run_inspect(file: &Path) -> Result<()> {
    use crate::services::{mapping, sheet};

    let bytes = std::fs::read(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let parsed = sheet::decode_sheet(&bytes)?;
    println!(
        "{}: {} columns, {} data rows",
        file.display(),
        parsed.headers().len(),
        parsed.row_count()
    );

    let proposal = mapping::propose_mapping(parsed.headers());
    for entry in proposal.mapping.iter() {
        println!("  assigned   {:24} -> {}", entry.header, entry.target.field().map(|f| f.wire_name()).unwrap_or("skip"));
    }
    for suggestion in &proposal.suggestions {
        println!("  suggested  {:24} -> {}", suggestion.header, suggestion.field);
    }
    for header in &proposal.unmapped {
        println!("  unmapped   {}", header);
    }

    match mapping::validate_mapping(&proposal.mapping) {
        Ok(()) => match mapping::validate_rows(&parsed, &proposal.mapping) {
            Ok(()) => println!("ready to import"),
            Err(e) => println!("blocked: {}", e),
        },
        Err(e) => println!("blocked: {}", e),
    }

    Ok(())
}
