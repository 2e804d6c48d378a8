//! Concurrent block fan-out and activity aggregation
//!
//! One task per block fetches the block, extracts the ERC20 transfer
//! participants and hands them back through the `JoinSet`. The joining loop
//! is the only writer of the counter, so merges never race. A failed block
//! is logged and dropped; it never aborts the others.

use crate::activity::ActivityCounter;
use crate::error::RpcError;
use crate::extract::{extract_erc20_addresses, DedupPolicy};
use crate::types::Block;
use anyhow::{bail, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Anything that can produce a block by number.
///
/// Implemented by `RpcClient`; tests substitute in-memory sources.
pub trait BlockSource: Send + Sync {
    /// Fetch a block with full transactions. `Ok(None)` means the node
    /// does not have it.
    fn fetch_block<'a>(
        &'a self,
        number: u64,
        cancel: &'a CancellationToken,
    ) -> impl Future<Output = Result<Option<Block>, RpcError>> + Send + 'a;
}

/// The `count` blocks ending at and including `head`, walked downwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    head: u64,
    count: u64,
}

impl BlockRange {
    /// Range of `requested` blocks ending at `head`, clamped at genesis.
    pub fn ending_at(head: u64, requested: u64) -> Self {
        let available = head.saturating_add(1);
        if requested > available {
            warn!(
                "requested {} blocks but chain head is {}, scanning {} blocks down to genesis",
                requested, head, available
            );
        }
        Self {
            head,
            count: requested.min(available),
        }
    }

    pub fn head(&self) -> u64 {
        self.head
    }

    /// Lowest block in the range, `None` if the range is empty.
    pub fn start(&self) -> Option<u64> {
        (self.count > 0).then(|| self.head - (self.count - 1))
    }

    pub fn len(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Block numbers from `head` downwards.
    pub fn iter(&self) -> impl Iterator<Item = u64> {
        let head = self.head;
        (0..self.count).map(move |offset| head - offset)
    }
}

/// Bookkeeping for one aggregation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateStats {
    pub requested: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Blocks fetched successfully that held no ERC20 transfer calls
    pub empty: u64,
    /// Total increments applied to the counter
    pub contributions: u64,
    pub elapsed: Duration,
}

/// Result of [`aggregate`].
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub counter: ActivityCounter,
    pub stats: AggregateStats,
}

/// Fetch every block in `range` concurrently and count ERC20 activity.
///
/// Returns once every block task has finished or failed. Cancelling
/// `cancel` aborts outstanding tasks and fails the aggregation.
pub async fn aggregate<S>(
    source: Arc<S>,
    range: BlockRange,
    policy: DedupPolicy,
    cancel: &CancellationToken,
) -> Result<Aggregation>
where
    S: BlockSource + 'static,
{
    info!(
        "fetching erc20 transactions in {} blocks ({:?}..={})",
        range.len(),
        range.start(),
        range.head()
    );
    let started = Instant::now();

    let mut in_flight = JoinSet::new();
    for number in range.iter() {
        let source = source.clone();
        let cancel = cancel.clone();
        in_flight.spawn(async move {
            let result = source.fetch_block(number, &cancel).await.map(|block| {
                if let Some(block) = &block {
                    debug!(
                        "block {} ({}): {} transactions",
                        number,
                        block.number.as_deref().unwrap_or("?"),
                        block.transactions.len()
                    );
                }
                extract_erc20_addresses(block.as_ref(), policy)
            });
            (number, result)
        });
    }

    let mut counter = ActivityCounter::new();
    let mut stats = AggregateStats {
        requested: range.len(),
        ..Default::default()
    };

    loop {
        let joined = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let outstanding = in_flight.len();
                in_flight.abort_all();
                bail!("aggregation cancelled with {} blocks outstanding", outstanding);
            }
            joined = in_flight.join_next() => joined,
        };
        let Some(joined) = joined else {
            break;
        };

        match joined {
            Ok((_, Ok(addresses))) => {
                stats.succeeded += 1;
                if addresses.is_empty() {
                    stats.empty += 1;
                }
                stats.contributions += addresses.len() as u64;
                counter.record(addresses);
            }
            Ok((number, Err(e))) => {
                stats.failed += 1;
                error!("Error fetching transactions for block {}: {}", number, e);
            }
            Err(e) => {
                stats.failed += 1;
                error!("Block task did not complete: {}", e);
            }
        }
    }

    stats.elapsed = started.elapsed();
    info!(
        "Completed fetching and processing in {:?}: {} blocks ok ({} without transfers), {} failed, {} addresses, {} contributions",
        stats.elapsed,
        stats.succeeded,
        stats.empty,
        stats.failed,
        counter.len(),
        stats.contributions
    );

    Ok(Aggregation { counter, stats })
}
