//! Run configuration
//!
//! Every option can come from a flag or from the environment (including a
//! `.env` file loaded by the binary). Flags win over the environment.

use crate::extract::DedupPolicy;
use crate::rate_limit::{TokenBucket, DEFAULT_BURST, DEFAULT_REQUESTS_PER_SECOND};
use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Rank the most active ERC20 addresses over the latest blocks
#[derive(Parser, Debug, Clone)]
#[command(name = "wallet-activity")]
#[command(about = "Rank the most active ERC20 transfer addresses over the latest blocks")]
pub struct Config {
    /// JSON-RPC endpoint used for address activity scraping
    #[arg(long, env = "RPC_ENDPOINT")]
    pub rpc_endpoint: String,

    /// Number of blocks to scan, ending at the current head
    #[arg(long, env = "N_BLOCKS")]
    pub n_blocks: u64,

    /// Number of top wallets to report
    #[arg(long, env = "N_TOP_WALLETS", default_value_t = 0)]
    pub n_top_wallets: usize,

    /// Where the ranked addresses are written
    #[arg(long, env = "SAVE_PATH", default_value = "default.json")]
    pub save_path: PathBuf,

    /// Sustained RPC request rate
    #[arg(long, env = "REQUESTS_PER_SECOND", default_value_t = DEFAULT_REQUESTS_PER_SECOND)]
    pub requests_per_second: f64,

    /// Requests allowed back to back before the sustained rate applies
    #[arg(long, env = "RATE_LIMIT_BURST", default_value_t = DEFAULT_BURST)]
    pub burst: u32,

    /// Per-request HTTP timeout in seconds
    #[arg(long, env = "RPC_TIMEOUT_SECS", default_value_t = 30)]
    pub rpc_timeout_secs: u64,

    /// Count an address at most once per block
    #[arg(long, env = "DEDUP_PER_BLOCK")]
    pub dedup_per_block: bool,
}

impl Config {
    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let endpoint = self.rpc_endpoint.trim();
        if endpoint.is_empty() {
            bail!("RPC endpoint must not be empty");
        }
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            bail!("RPC endpoint must be an http(s) URL, got {:?}", endpoint);
        }
        if self.n_blocks == 0 {
            bail!("Number of blocks to scan must be positive");
        }
        if !self.requests_per_second.is_finite() || self.requests_per_second <= 0.0 {
            bail!(
                "Requests per second must be a positive number, got {}",
                self.requests_per_second
            );
        }
        if self.burst == 0 {
            bail!("Rate limit burst must be at least 1");
        }
        if self.rpc_timeout_secs == 0 {
            bail!("RPC timeout must be at least one second");
        }
        Ok(())
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn dedup_policy(&self) -> DedupPolicy {
        if self.dedup_per_block {
            DedupPolicy::PerBlock
        } else {
            DedupPolicy::PerTransaction
        }
    }

    /// Build the rate limiter described by this configuration.
    pub fn limiter(&self) -> TokenBucket {
        TokenBucket::new(self.requests_per_second, self.burst)
    }
}
