//! JSON-RPC client for Ethereum nodes
//!
//! Every call waits on the shared rate limiter, then issues a single HTTP
//! POST. Nothing is retried; failures go straight back to the caller.

use crate::aggregate::BlockSource;
use crate::error::RpcError;
use crate::rate_limit::{RateLimiter, TokenBucket};
use crate::types::{
    block_tag, parse_hex_quantity, Block, BlockByNumberResult, BlockNumberResult, RpcRequest,
    RpcResponse, METHOD_BLOCK_BY_NUMBER, METHOD_BLOCK_NUMBER,
};
use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default per-call HTTP timeout.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON-RPC client for Ethereum nodes.
#[derive(Debug)]
pub struct RpcClient<L = TokenBucket> {
    client: reqwest::Client,
    url: String,
    limiter: Arc<L>,
    timeout: Duration,
}

impl<L: RateLimiter> RpcClient<L> {
    /// Create a new RPC client.
    ///
    /// The limiter is shared with whoever else holds the `Arc`.
    pub fn new(url: String, limiter: Arc<L>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            url,
            limiter,
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Make a JSON-RPC call.
    ///
    /// Returns the `result` member, `None` when it is absent or null.
    pub async fn call(
        &self,
        method: &str,
        params: Vec<Value>,
        cancel: &CancellationToken,
    ) -> Result<Option<Value>, RpcError> {
        self.limiter.acquire(cancel).await?;

        let request = RpcRequest::new(method, params);
        debug!("sending post request to {}, with payload {}", self.url, request);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RpcError::Cancelled),
            result = self.post(&request) => result,
        }
    }

    async fn post(&self, request: &RpcRequest) -> Result<Option<Value>, RpcError> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| RpcError::from_reqwest(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<response body could not be read: {}>", e));
            return Err(RpcError::Transport {
                status: Some(status.as_u16()),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RpcError::from_reqwest(e, self.timeout))?;
        let envelope: RpcResponse =
            serde_json::from_slice(&bytes).map_err(|e| RpcError::Decode(e.to_string()))?;

        if let Some(error) = envelope.error {
            return Err(RpcError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        Ok(envelope.result)
    }

    /// Get the current chain head.
    pub async fn block_number(&self, cancel: &CancellationToken) -> Result<u64, RpcError> {
        let result = self.call(METHOD_BLOCK_NUMBER, Vec::new(), cancel).await?;
        let head = block_number_result(result)?;
        parse_block_number(&head)
    }

    /// Get a block by number with full transaction objects.
    pub async fn block_by_number(
        &self,
        number: u64,
        cancel: &CancellationToken,
    ) -> Result<BlockByNumberResult, RpcError> {
        let params = vec![json!(block_tag(number)), json!(true)];
        let result = self.call(METHOD_BLOCK_BY_NUMBER, params, cancel).await?;
        block_by_number_result(result)
    }
}

impl<L: RateLimiter> BlockSource for RpcClient<L> {
    fn fetch_block<'a>(
        &'a self,
        number: u64,
        cancel: &'a CancellationToken,
    ) -> impl Future<Output = Result<Option<Block>, RpcError>> + Send + 'a {
        async move { Ok(self.block_by_number(number, cancel).await?.block) }
    }
}

fn block_number_result(result: Option<Value>) -> Result<BlockNumberResult, RpcError> {
    match result {
        Some(Value::String(hex)) => Ok(BlockNumberResult { hex }),
        Some(other) => Err(RpcError::Decode(format!(
            "block number result is not a string: {}",
            other
        ))),
        None => Err(RpcError::Decode(
            "RPC response missing 'result' field".to_string(),
        )),
    }
}

fn parse_block_number(result: &BlockNumberResult) -> Result<u64, RpcError> {
    parse_hex_quantity(&result.hex).ok_or_else(|| {
        RpcError::Parse(format!("block number {:?} is not a hex quantity", result.hex))
    })
}

fn block_by_number_result(result: Option<Value>) -> Result<BlockByNumberResult, RpcError> {
    let block = match result {
        Some(value) => Some(
            serde_json::from_value::<Block>(value).map_err(|e| RpcError::Decode(e.to_string()))?,
        ),
        None => None,
    };
    Ok(BlockByNumberResult { block })
}
