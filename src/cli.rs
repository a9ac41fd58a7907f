//! CLI argument parsing for the prospecta-worker binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "prospecta-worker", about = "Prospecta contact-import backend worker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the worker server (default if no subcommand given)
    Serve,
    /// Dry-run the mapping step on a local CSV file and print the proposal
    Inspect {
        /// Path to the CSV file to inspect
        file: PathBuf,
    },
}
