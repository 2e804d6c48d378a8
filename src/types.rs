//! Ethereum JSON-RPC types
//!
//! Request envelope, response envelope, and the typed results of the two
//! methods the pipeline uses. Blocks and transactions are deliberately
//! liberal: every transaction field we read is optional so a malformed
//! transaction is skipped instead of failing the whole block.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// JSON-RPC protocol version sent with every request.
pub const JSONRPC_VERSION: &str = "2.0";

/// `eth_blockNumber`
pub const METHOD_BLOCK_NUMBER: &str = "eth_blockNumber";

/// `eth_getBlockByNumber`
pub const METHOD_BLOCK_BY_NUMBER: &str = "eth_getBlockByNumber";

/// Account identifier as returned by the node (`0x` + 40 hex chars).
///
/// Kept as the node's string; never decoded to bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// JSON-RPC request. Field order is the wire order.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: Vec<Value>,
    pub id: u64,
}

impl RpcRequest {
    /// Build a request. Calls are not pipelined, so the id is always 1.
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params,
            id: 1,
        }
    }
}

impl fmt::Display for RpcRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = serde_json::to_string(&self.params).map_err(|_| fmt::Error)?;
        write!(
            f,
            "jsonrpc: {}, method: {}, params: {}, id: {}",
            self.jsonrpc, self.method, params, self.id
        )
    }
}

/// JSON-RPC response envelope.
///
/// `result` is left untyped here; the client converts it per method.
/// A JSON `null` result deserializes to `None`.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Option<Value>,

    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

/// Error member of a JSON-RPC response.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    #[serde(default)]
    pub code: i64,

    #[serde(default)]
    pub message: String,
}

/// Block returned by `eth_getBlockByNumber` with full transaction objects.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Block {
    /// Block number (hex string in JSON)
    #[serde(default)]
    pub number: Option<String>,

    /// Full transaction objects
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

/// Transaction fields used for activity extraction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub hash: Option<String>,

    /// Sender address
    #[serde(default)]
    pub from: Option<Address>,

    /// Callee address (None for contract creation)
    #[serde(default)]
    pub to: Option<Address>,

    /// Call data, hex encoded with `0x` prefix
    #[serde(default)]
    pub input: Option<String>,
}

/// Typed result of `eth_blockNumber`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockNumberResult {
    pub hex: String,
}

/// Typed result of `eth_getBlockByNumber`.
///
/// `None` when the node has no such block (yet).
#[derive(Debug, Clone, Default)]
pub struct BlockByNumberResult {
    pub block: Option<Block>,
}

/// Format a block number as the `0x`-prefixed quantity JSON-RPC expects.
pub fn block_tag(block_number: u64) -> String {
    format!("0x{:x}", block_number)
}

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_hex_quantity(s: &str) -> Option<u64> {
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}
