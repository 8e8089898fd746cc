//! Vigil CLI - inspect and maintain a vigil state directory

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "vigil")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the state directory
    #[arg(short, long, default_value = "./state")]
    db_path: PathBuf,

    /// JSON configuration file; overrides --db-path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store metadata and key counts
    Status,

    /// Print the value stored under a key
    Get {
        key: String,

        /// Print the stored bytes as-is instead of pretty JSON
        #[arg(long)]
        raw: bool,
    },

    /// Show the remaining lifetime of a key
    Ttl { key: String },

    /// List keys matching a glob pattern (`*`, `?`)
    Scan {
        pattern: String,

        /// Stop after this many keys
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print values next to keys
        #[arg(long)]
        values: bool,
    },

    /// Delete every expired entry now
    Purge,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let engine = commands::engine_config(&cli.db_path, cli.config.as_deref())?;
    commands::open(engine)?;

    // Execute command
    let result = match cli.command {
        Commands::Status => commands::status::execute(),
        Commands::Get { key, raw } => commands::get::execute(&key, raw),
        Commands::Ttl { key } => commands::ttl::execute(&key),
        Commands::Scan {
            pattern,
            limit,
            values,
        } => commands::scan::execute(&pattern, limit, values),
        Commands::Purge => commands::purge::execute(),
    };

    commands::close()?;
    result
}
