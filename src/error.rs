//! Error taxonomy for the JSON-RPC boundary
//!
//! Everything below the pipeline driver reports failures as [`RpcError`].
//! The driver wraps them in `anyhow` with context before they reach `main`.

use std::time::Duration;

/// Failure of a single JSON-RPC call.
#[derive(thiserror::Error, Debug)]
pub enum RpcError {
    /// Permit acquisition was cancelled before the request was sent.
    #[error("rate limiter permit denied: cancelled while waiting")]
    RateLimited,

    /// Network failure or non-2xx HTTP status.
    #[error("transport error (status {}): {body}", .status.map_or_else(|| "none".to_string(), |s| s.to_string()))]
    Transport { status: Option<u16>, body: String },

    /// The response body was not the JSON shape we expected.
    #[error("failed to decode RPC response: {0}")]
    Decode(String),

    /// A numeric field could not be parsed.
    #[error("failed to parse RPC value: {0}")]
    Parse(String),

    /// The node answered with a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The HTTP round trip exceeded the per-call timeout.
    #[error("RPC call timed out after {0:?}")]
    Timeout(Duration),

    /// The call was cancelled while the request was in flight.
    #[error("RPC call cancelled")]
    Cancelled,
}

impl RpcError {
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            return RpcError::Timeout(timeout);
        }
        if err.is_decode() {
            return RpcError::Decode(err.to_string());
        }
        RpcError::Transport {
            status: err.status().map(|s| s.as_u16()),
            body: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_display() {
        let err = RpcError::Transport {
            status: Some(503),
            body: "upstream unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "transport error (status 503): upstream unavailable"
        );

        let err = RpcError::Transport {
            status: None,
            body: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "transport error (status none): connection refused");
    }

    #[test]
    fn test_rpc_display() {
        let err = RpcError::Rpc {
            code: -32000,
            message: "header not found".to_string(),
        };
        assert_eq!(err.to_string(), "RPC error -32000: header not found");
    }
}
