//! TOML configuration structs, loading, and validation.
//!
//! A config file is optional: every field has a default, so an empty file (or
//! none at all) yields a working service. CLI flags override the file.
//!
//! ```toml
//! [server]
//! port = 8000
//!
//! [optimizer]
//! draw_width = 5
//! max_candidates = 1000000
//! sequential = "warn"
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constraints::SequentialPolicy;

/// Top-level configuration: `[server]` and `[optimizer]` sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub optimizer: OptimizerConfig,
}

/// The `[server]` section: listener and HTTP layer limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: "0.0.0.0".to_string(),
            port: 8000,
            request_timeout_secs: 120,
            body_limit_bytes: 1024 * 1024,
        }
    }
}

/// The `[optimizer]` section: game shape and resource bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Main balls per ticket.
    pub draw_width: usize,
    /// Size of the sub-combinations whose coverage is measured (triplets).
    pub subset_size: usize,
    /// Largest number accepted in a pool.
    pub max_number: u32,
    /// Largest candidate space that is enumerated; larger spaces are sampled.
    pub max_candidates: u64,
    /// Hard ceiling on system size for any run.
    pub max_system_size: usize,
    pub default_attempts: usize,
    pub max_attempts: usize,
    pub default_sample_size: usize,
    pub max_sample_size: usize,
    /// Fast mode runs as classic for pools of at most this many numbers.
    pub fast_min_pool: usize,
    /// Zero-gain samples tolerated before a fast pass gives up.
    pub fast_stall_retries: usize,
    pub sequential: SequentialPolicy,
    pub uncovered_report_limit: usize,
    pub history_min_draws: usize,
    /// Top budget systems up to the ticket count once coverage stops improving.
    pub budget_fill: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            draw_width: crate::DRAW_WIDTH,
            subset_size: crate::SUBSET_SIZE,
            max_number: crate::MAX_NUMBER,
            max_candidates: 1_000_000,
            max_system_size: 25_000,
            default_attempts: 5,
            max_attempts: 64,
            default_sample_size: 2000,
            max_sample_size: 50_000,
            fast_min_pool: 15,
            fast_stall_retries: 3,
            sequential: SequentialPolicy::Warn,
            uncovered_report_limit: 500,
            history_min_draws: 5,
            budget_fill: true,
        }
    }
}

impl ServiceConfig {
    /// Load from a TOML file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)
                    .with_context(|| format!("failed to read config {}", p.display()))?;
                Self::from_toml(&text)
                    .with_context(|| format!("invalid config {}", p.display()))?
            }
            None => ServiceConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<()> {
        let o = &self.optimizer;
        if o.draw_width == 0 {
            bail!("optimizer.draw_width must be at least 1");
        }
        if o.subset_size == 0 || o.subset_size > o.draw_width {
            bail!(
                "optimizer.subset_size must be in [1, draw_width={}], got {}",
                o.draw_width,
                o.subset_size
            );
        }
        if o.max_number == 0 || o.max_number > u16::MAX as u32 {
            bail!("optimizer.max_number must be in [1, {}]", u16::MAX);
        }
        if o.max_candidates == 0 || o.max_system_size == 0 {
            bail!("optimizer.max_candidates and optimizer.max_system_size must be positive");
        }
        if o.max_attempts == 0 || o.max_sample_size == 0 {
            bail!("optimizer.max_attempts and optimizer.max_sample_size must be positive");
        }
        if o.default_attempts == 0 || o.default_attempts > o.max_attempts {
            bail!("optimizer.default_attempts must be in [1, max_attempts]");
        }
        if o.default_sample_size == 0 || o.default_sample_size > o.max_sample_size {
            bail!("optimizer.default_sample_size must be in [1, max_sample_size]");
        }
        if self.server.request_timeout_secs == 0 {
            bail!("server.request_timeout_secs must be positive");
        }
        Ok(())
    }
}
