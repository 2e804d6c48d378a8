//! Wallet activity - rank the most active ERC20 transfer addresses
//!
//! Samples the latest blocks of an EVM chain over JSON-RPC, counts how often
//! each address takes part in an ERC20 `transfer` call, and writes the most
//! active addresses to a JSON file.

pub mod activity;
pub mod aggregate;
pub mod config;
pub mod error;
pub mod extract;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod rate_limit;
pub mod rpc;
pub mod types;

// Re-export the main types for convenience
pub use activity::{select_top_k, ActivityCounter, AddrActivity};
pub use aggregate::{aggregate, AggregateStats, Aggregation, BlockRange, BlockSource};
pub use error::RpcError;
pub use extract::{extract_erc20_addresses, DedupPolicy};
pub use pipeline::{Pipeline, PipelineSettings, RunSummary};
pub use rate_limit::{RateLimiter, TokenBucket};
pub use rpc::RpcClient;
pub use types::Address;
