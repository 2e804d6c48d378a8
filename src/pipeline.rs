//! Pipeline driver
//!
//! Runs the four stages in order: fetch the chain head, aggregate activity
//! over the blocks ending at it, select the top addresses, and write them
//! out. Failing to fetch the head or to write the report aborts the run;
//! individual block failures do not.

use crate::activity::{select_top_k, AddrActivity};
use crate::aggregate::{aggregate, AggregateStats, BlockRange};
use crate::extract::DedupPolicy;
use crate::output::{render_report, write_atomic};
use crate::rate_limit::{RateLimiter, TokenBucket};
use crate::rpc::RpcClient;
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// What the pipeline needs from the configuration.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub n_blocks: u64,
    pub n_top_wallets: usize,
    pub save_path: PathBuf,
    pub dedup: DedupPolicy,
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub head: u64,
    pub range: BlockRange,
    pub stats: AggregateStats,
    pub top: Vec<AddrActivity>,
}

/// Drives a single scan from head lookup to report file.
pub struct Pipeline<L = TokenBucket> {
    rpc: Arc<RpcClient<L>>,
    settings: PipelineSettings,
}

impl<L: RateLimiter + 'static> Pipeline<L> {
    pub fn new(rpc: Arc<RpcClient<L>>, settings: PipelineSettings) -> Self {
        Self { rpc, settings }
    }

    /// Run the pipeline to completion.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunSummary> {
        let head = self
            .rpc
            .block_number(cancel)
            .await
            .with_context(|| format!("Failed to fetch start block from {}", self.rpc.url()))?;
        info!("parsed block number {}", head);

        let range = BlockRange::ending_at(head, self.settings.n_blocks);
        let aggregation = aggregate(self.rpc.clone(), range, self.settings.dedup, cancel)
            .await
            .context("Failed to aggregate address activity")?;

        info!(
            "sorting {} addresses in descending order, keeping top {}",
            aggregation.counter.len(),
            self.settings.n_top_wallets
        );
        let top = select_top_k(&aggregation.counter, self.settings.n_top_wallets);

        // Nothing is written once the run has been cancelled.
        if cancel.is_cancelled() {
            bail!("Run cancelled before the report was written");
        }

        let report = render_report(&top)?;
        write_atomic(&self.settings.save_path, &report).with_context(|| {
            format!(
                "Failed to write top addresses to {:?}",
                self.settings.save_path
            )
        })?;
        info!(
            "Successfully saved top {} addresses to {:?}",
            top.len(),
            self.settings.save_path
        );

        Ok(RunSummary {
            head,
            range,
            stats: aggregation.stats,
            top,
        })
    }
}
