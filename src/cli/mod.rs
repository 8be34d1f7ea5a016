//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{HistoryCommand, RunCommand, ScanCommand, ValidateConfigCommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// LLM-driven C++ unit test generator
#[derive(Debug, Parser, Clone)]
#[command(name = "testgen")]
#[command(version)]
#[command(
    about = "Generate, refine, build and coverage-check C++ unit tests with an LLM",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Path to a settings file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the generator
    Run(RunCommand),

    /// List the C++ sources that would be submitted
    Scan(ScanCommand),

    /// Validate the instruction files
    ValidateConfig(ValidateConfigCommand),

    /// Show run history
    History(HistoryCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
