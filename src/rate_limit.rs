//! Token-bucket rate limiting for outgoing RPC calls
//!
//! The limiter is a capability handed to the RPC client by the driver.
//! Every task that wants to issue a request waits here first.

use crate::error::RpcError;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Default sustained rate (requests per second).
pub const DEFAULT_REQUESTS_PER_SECOND: f64 = 10.0;

/// Default bucket capacity.
pub const DEFAULT_BURST: u32 = 10;

/// Permit source shared by all RPC tasks.
pub trait RateLimiter: Send + Sync {
    /// Wait for one permit.
    ///
    /// Returns [`RpcError::RateLimited`] if `cancel` fires before a permit
    /// is available, or if it was already cancelled on entry.
    fn acquire<'a>(
        &'a self,
        cancel: &'a CancellationToken,
    ) -> impl Future<Output = Result<(), RpcError>> + Send + 'a;
}

/// Sustained-rate limiter with a burst allowance.
///
/// Acquisition reserves a token immediately, letting the balance go
/// negative; the caller then sleeps until its reservation matures. Waiters
/// are therefore released at the configured rate instead of racing for
/// each refill.
#[derive(Debug)]
pub struct TokenBucket {
    rate: f64,
    burst: f64,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last: Instant,
}

impl TokenBucket {
    /// Create a full bucket. A `burst` of 0 is raised to 1.
    ///
    /// # Panics
    ///
    /// Panics if `rate` is not a positive, finite number.
    pub fn new(rate: f64, burst: u32) -> Self {
        assert!(
            rate.is_finite() && rate > 0.0,
            "rate must be positive and finite, got {}",
            rate
        );
        let burst = f64::from(burst.max(1));
        Self {
            rate,
            burst,
            state: Mutex::new(BucketState {
                tokens: burst,
                last: Instant::now(),
            }),
        }
    }

    /// Reserve a token and return how long the caller must wait for it.
    async fn reserve(&self) -> Duration {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(state.last).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate).min(self.burst);
        state.last = now;
        state.tokens -= 1.0;

        if state.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-state.tokens / self.rate)
        }
    }

    /// Give back a reservation that will not be used.
    async fn release(&self) {
        let mut state = self.state.lock().await;
        state.tokens = (state.tokens + 1.0).min(self.burst);
    }
}

impl Default for TokenBucket {
    fn default() -> Self {
        Self::new(DEFAULT_REQUESTS_PER_SECOND, DEFAULT_BURST)
    }
}

impl RateLimiter for TokenBucket {
    fn acquire<'a>(
        &'a self,
        cancel: &'a CancellationToken,
    ) -> impl Future<Output = Result<(), RpcError>> + Send + 'a {
        async move {
            if cancel.is_cancelled() {
                return Err(RpcError::RateLimited);
            }

            let wait = self.reserve().await;
            if wait.is_zero() {
                return Ok(());
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.release().await;
                    Err(RpcError::RateLimited)
                }
                _ = tokio::time::sleep(wait) => Ok(()),
            }
        }
    }
}
