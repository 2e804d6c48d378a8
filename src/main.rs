//! wallet-activity - rank ERC20 transfer activity over the latest blocks
//!
//! Reads configuration from flags, the environment and `.env`, scans the
//! requested number of blocks, and writes the top addresses as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use wallet_activity::config::Config;
use wallet_activity::logging::{init_tracing, LogSettings};
use wallet_activity::{Pipeline, PipelineSettings, RpcClient};

#[tokio::main]
async fn main() {
    // A missing .env is fine; flags and the real environment still apply.
    dotenvy::dotenv().ok();

    let log_settings = LogSettings::from_env();
    init_tracing(&log_settings);

    if let Err(e) = run().await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = Config::parse();
    config.validate().context("Invalid configuration")?;

    info!("RPC endpoint: {}", config.rpc_endpoint);
    info!(
        "Scanning {} blocks for the top {} wallets, saving to {:?}",
        config.n_blocks, config.n_top_wallets, config.save_path
    );

    let limiter = Arc::new(config.limiter());
    let rpc = RpcClient::new(config.rpc_endpoint.clone(), limiter, config.rpc_timeout())?;
    let pipeline = Pipeline::new(
        Arc::new(rpc),
        PipelineSettings {
            n_blocks: config.n_blocks,
            n_top_wallets: config.n_top_wallets,
            save_path: config.save_path.clone(),
            dedup: config.dedup_policy(),
        },
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, cancelling in-flight requests...");
            on_signal.cancel();
        }
    });

    let summary = pipeline.run(&cancel).await?;
    info!(
        "Done: blocks {:?}..={}, {} of {} fetched, {} reported",
        summary.range.start(),
        summary.head,
        summary.stats.succeeded,
        summary.stats.requested,
        summary.top.len()
    );
    Ok(())
}
