//! identity-indexer - cross-marketplace identity aggregation
//!
//! Fans out one lookup per identity provider for an Ethereum address,
//! merges whatever comes back into a single record, and prints it.
//!
//! Exit codes:
//!   0 - Success (individual provider failures are logged, not fatal)
//!   1 - Runtime error (bad arguments, config, HTTP client setup, output)

mod aggregation;
mod cli;
mod config;
mod error;
mod http;
mod models;
mod progress;
mod providers;
mod report;

use aggregation::{Cancellation, Fetcher};
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, DEFAULT_CONFIG_FILE};
use models::{Address, Report, ReportMetadata};
use progress::ProgressObserver;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("identity-indexer v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Indexing failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .indexer.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {DEFAULT_CONFIG_FILE} already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {DEFAULT_CONFIG_FILE}"))?;

    println!("✅ Created {DEFAULT_CONFIG_FILE} with default settings.");
    println!("   Edit it to change timeouts, the deadline, or provider endpoints.");
    Ok(())
}

/// Logs go to stderr so stdout carries only the report.
fn init_logging(args: &Args) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

async fn run(args: Args) -> Result<()> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let address = Address::new(args.address.trim());
    let deadline = config.aggregation.deadline_seconds.map(Duration::from_secs);
    let show_progress = !args.quiet;

    if show_progress {
        eprintln!("🔎 Indexing {}", address);
        eprintln!("   HTTP timeout: {}s", config.http.timeout_seconds);
        if let Some(deadline) = deadline {
            eprintln!("   Deadline: {}s per aggregation", deadline.as_secs());
        }
    }

    let fetcher = Fetcher::new(config).context("Failed to build HTTP client")?;

    // Ctrl-C cancels whatever aggregation is running.
    let (interrupt, base_cancel) = Cancellation::manual();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, canceling outstanding lookups");
            interrupt.cancel();
        }
    });
    let cancel_for_run = || match deadline {
        Some(deadline) => base_cancel.clone().with_timeout(deadline),
        None => base_cancel.clone(),
    };

    let mut lookups = Vec::new();

    let identity = if args.mode.runs_identity() {
        let set = fetcher.identity_lookups();
        lookups.extend(set.names().into_iter().map(String::from));

        let progress = ProgressObserver::new("identity", set.len(), show_progress);
        let identity = fetcher
            .fetch_identity(&address, &cancel_for_run(), &progress)
            .await
            .context("Identity aggregation failed")?;
        progress.finish();

        Some(identity)
    } else {
        None
    };

    let connections = if args.mode.runs_connections() {
        let set = fetcher.connection_lookups();
        lookups.extend(set.names().into_iter().map(String::from));

        let progress = ProgressObserver::new("connections", set.len(), show_progress);
        let connections = fetcher
            .fetch_connections(&address, &cancel_for_run(), &progress)
            .await
            .context("Connection aggregation failed")?;
        progress.finish();

        Some(connections)
    } else {
        None
    };

    if base_cancel.is_cancelled() {
        warn!("Run was interrupted, the report may be partial");
    }

    let duration = start_time.elapsed().as_secs_f64();

    let report = Report {
        metadata: ReportMetadata {
            address: address.clone(),
            generated_at: Utc::now(),
            duration_seconds: duration,
            lookups,
        },
        identity,
        connections,
    };

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Text => report::generate_markdown_report(&report),
    };

    match &args.output {
        Some(path) => {
            report::write_report(&output, path)?;
            if show_progress {
                eprintln!("\n✅ Report saved to: {}", path.display());
            }
        }
        None => print!("{output}"),
    }

    if show_progress {
        eprintln!("\n📊 Summary:");
        if let Some(identity) = &report.identity {
            eprintln!(
                "   Identity fragments: {} | ENS: {}",
                identity.fragment_count(),
                identity.ens.as_deref().unwrap_or("-")
            );
        }
        if let Some(connections) = &report.connections {
            eprintln!("   Connections: {}", connections.connections.len());
        }
        eprintln!("   Duration: {:.1}s", duration);
    }

    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}
