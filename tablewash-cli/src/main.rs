//! tablewash CLI: inspect tabular files and run cleaning pipelines over them.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tablewash_core::{OutputFormat, SaveMode};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Clean, bucket and aggregate CSV and Parquet data.
#[derive(Parser, Debug)]
#[command(name = "tablewash", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (holds `.tablewash/config.toml`)
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Field delimiter for delimited sources
    #[arg(long, global = true)]
    delimiter: Option<char>,

    /// Treat the first line of delimited sources as data
    #[arg(long, global = true)]
    no_header: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Show the schema, row count and column profile of a source
    Inspect {
        /// CSV/Parquet file or output directory
        source: PathBuf,
        /// Rows to preview
        #[arg(short = 'n', long, default_value = "10")]
        rows: usize,
    },
    /// Check a pipeline against a source's schema without running it
    Plan {
        source: PathBuf,
        /// Pipeline definition (.toml or .json)
        #[arg(short, long)]
        pipeline: PathBuf,
    },
    /// Run a pipeline over a source
    Run {
        source: PathBuf,
        /// Pipeline definition (.toml or .json)
        #[arg(short, long)]
        pipeline: PathBuf,
        /// Output directory; prints a preview when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output format: csv, parquet
        #[arg(long)]
        format: Option<OutputFormat>,
        /// Save mode: overwrite, append, error-if-exists
        #[arg(long)]
        mode: Option<SaveMode>,
        /// Print the run report with lineage as JSON
        #[arg(long)]
        report: bool,
    },
    /// Run a SQL query against a source
    Query {
        source: PathBuf,
        sql: String,
        /// View name to query (defaults to the file stem)
        #[arg(long)]
        view: Option<String>,
        /// Print rows as JSON lines instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Write a default `.tablewash/config.toml` in the workspace
    Init,
    /// Print the effective configuration
    Show,
}

/// Source options shared by every subcommand that reads data.
#[derive(Debug, Clone, Default)]
struct SourceOptions {
    delimiter: Option<char>,
    has_header: Option<bool>,
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    // JSON file layer for structured logging
    let log_dir = tablewash_core::config::project_dirs()
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "tablewash.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let options = SourceOptions {
        delimiter: cli.delimiter,
        has_header: cli.no_header.then_some(false),
    };
    commands::handle_command(cli.command, &workspace, &options)
}
