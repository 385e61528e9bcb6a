//! # CLI Execution Functions
//!
//! Extracted from `main.rs` to keep the entry point slim: config loading,
//! rayon setup, the server launcher and the offline request runners.

use anyhow::{Context, Result};
use lottocover::api;
use lottocover::config::ServiceConfig;
use lottocover::error::OptimizerError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig> {
    let config = ServiceConfig::load(path)?;
    if let Some(p) = path {
        info!(path = %p.display(), "loaded config");
    }
    Ok(config)
}

pub fn configure_rayon(threads: Option<usize>) {
    let num_threads = threads.unwrap_or(0);
    if num_threads > 0 {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
        {
            warn!(error = %e, "Could not configure rayon thread pool");
        }
    }
}

// ── Server ──────────────────────────────────────────────────────

pub fn run_serve(mut config: ServiceConfig, port: Option<u16>, bind: Option<String>) -> Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    info!(
        threads = rayon::current_num_threads(),
        draw_width = config.optimizer.draw_width,
        "starting server"
    );
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(lottocover::server::run(config))
}

// ── Offline Requests ────────────────────────────────────────────

fn read_request<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read request from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read request {}", path.display()))?
    };
    serde_json::from_str(&text).context("request is not valid JSON for this command")
}

fn print_response<T: Serialize>(outcome: Result<T, OptimizerError>) -> Result<()> {
    let resp = outcome.map_err(|e| anyhow::anyhow!("{} ({})", e, e.kind()))?;
    println!("{}", serde_json::to_string_pretty(&resp)?);
    Ok(())
}

pub fn run_greedy(config: &ServiceConfig, request: &Path) -> Result<()> {
    let req: api::GreedyRequest = read_request(request)?;
    print_response(api::handle_greedy(&req, &config.optimizer))
}

pub fn run_budget(config: &ServiceConfig, request: &Path) -> Result<()> {
    let req: api::BudgetRequest = read_request(request)?;
    print_response(api::handle_budget(&req, &config.optimizer))
}

pub fn run_generate(config: &ServiceConfig, request: &Path) -> Result<()> {
    let req: api::GenerateRequest = read_request(request)?;
    print_response(api::handle_generate(&req, &config.optimizer))
}
