//! Command-line interface argument parsing.

use clap::Parser;
use std::path::PathBuf;

/// Address queried when none is given.
pub const DEMO_ADDRESS: &str = "0xd451d1ca630813325fab7b58c6d584e98b884329";

/// identity-indexer - cross-marketplace identity lookup for an Ethereum address
///
/// Queries every identity provider concurrently and merges what they know
/// about the address. Connection mode collects follow edges instead.
///
/// Examples:
///   indexer 0xd451d1ca630813325fab7b58c6d584e98b884329
///   indexer --mode connections --format json
///   indexer --mode all --deadline 15 --output report.md
///   indexer --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Ethereum address to index
    #[arg(value_name = "ADDRESS", default_value = DEMO_ADDRESS, env = "INDEXER_ADDRESS")]
    pub address: String,

    /// Which aggregation to run
    #[arg(short, long, default_value = "identity", value_name = "MODE")]
    pub mode: Mode,

    /// Output format (text, json)
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .indexer.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Per-request HTTP timeout in seconds
    #[arg(long, value_name = "SECS", env = "INDEXER_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Overall deadline per aggregation in seconds
    ///
    /// Lookups still running when it passes report as canceled.
    #[arg(long, value_name = "SECS")]
    pub deadline: Option<u64>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .indexer.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Aggregation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Mode {
    /// Merged identity record (default)
    #[default]
    Identity,
    /// Follow edges
    Connections,
    /// Both, one after the other
    All,
}

impl Mode {
    pub fn runs_identity(self) -> bool {
        matches!(self, Mode::Identity | Mode::All)
    }

    pub fn runs_connections(self) -> bool {
        matches!(self, Mode::Connections | Mode::All)
    }
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown text (default)
    #[default]
    Text,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        // Addresses are opaque here, only emptiness is checked.
        if self.address.trim().is_empty() {
            return Err("Address must not be empty".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.deadline == Some(0) {
            return Err("Deadline must be at least 1 second".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
