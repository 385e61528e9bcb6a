//! # Main — CLI Entry Point
//!
//! Routes CLI subcommands to the HTTP server or to one-shot offline runs.
//!
//! ## Subcommands
//!
//! - `serve`: start the HTTP API (`--port` / `PORT`, `--bind`).
//! - `greedy`, `budget`, `generate`: read one JSON request body from
//!   `--request <file>` (or stdin with `-`), print the JSON response to stdout.
//!
//! ## Global Options
//!
//! - `--config` / `LOTTOCOVER_CONFIG`: TOML config file (defaults otherwise).
//! - `--threads` / `LOTTOCOVER_THREADS`: rayon pool size (0 = all cores).
//!
//! Logs go to stderr; `LOG_FORMAT=json` switches to JSON lines and `RUST_LOG`
//! sets the filter (default `info`).

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(
    name = "lottocover",
    version,
    about = "Build lottery ticket systems that maximize triplet coverage"
)]
struct Cli {
    /// TOML configuration file
    #[arg(long, env = "LOTTOCOVER_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Number of rayon worker threads (defaults to all logical cores)
    #[arg(long, env = "LOTTOCOVER_THREADS", global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Listen port (overrides server.port)
        #[arg(long, env = "PORT")]
        port: Option<u16>,
        /// Listen address (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Build a coverage-maximizing system from a /greedy request body
    Greedy {
        /// Request JSON file, or `-` for stdin
        #[arg(long, default_value = "-")]
        request: PathBuf,
    },
    /// Build a size-capped system from a /budget request body
    Budget {
        /// Request JSON file, or `-` for stdin
        #[arg(long, default_value = "-")]
        request: PathBuf,
    },
    /// Enumerate valid tickets from a /generate request body
    Generate {
        /// Request JSON file, or `-` for stdin
        #[arg(long, default_value = "-")]
        request: PathBuf,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // LOG_FORMAT=json for log shippers, human-readable otherwise
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();
    let config = cli::load_config(cli.config.as_deref())?;
    cli::configure_rayon(cli.threads);

    match cli.command {
        Commands::Serve { port, bind } => cli::run_serve(config, port, bind),
        Commands::Greedy { request } => cli::run_greedy(&config, &request),
        Commands::Budget { request } => cli::run_budget(&config, &request),
        Commands::Generate { request } => cli::run_generate(&config, &request),
    }
}
