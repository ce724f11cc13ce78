//! Per-client-IP token-bucket rate limiting for the mock server.
//!
//! REST and WebSocket traffic draw from separate bucket families, the way
//! real exchanges account them separately.

use std::collections::HashMap;
use std::net::IpAddr;

/// Limits for one bucket family.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Sustained requests per second.
    pub per_second: f64,
    /// Burst capacity.
    pub burst: u32,
}

impl RateLimitConfig {
    /// Effectively unlimited; the default so tests opt in to throttling.
    pub fn unlimited() -> Self {
        Self {
            per_second: f64::MAX,
            burst: u32::MAX,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::unlimited()
    }
}

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_refill_ms: i64,
}

/// One bucket per client IP, refilled against the server's clock.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: HashMap<IpAddr, TokenBucket>,
}

impl RateLimiter {
    /// Create a limiter with the given config.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: HashMap::new(),
        }
    }

    /// Replace the config and reset all buckets.
    pub fn reconfigure(&mut self, config: RateLimitConfig) {
        self.config = config;
        self.buckets.clear();
    }

    /// Try to take one token for `ip` at clock time `now_ms`. Returns
    /// `false` when the client is over its limit.
    pub fn try_acquire(&mut self, ip: IpAddr, now_ms: i64) -> bool {
        if self.config.per_second == f64::MAX {
            return true;
        }
        let bucket = self.buckets.entry(ip).or_insert(TokenBucket {
            tokens: self.config.burst as f64,
            last_refill_ms: now_ms,
        });

        let elapsed_secs = (now_ms - bucket.last_refill_ms).max(0) as f64 / 1000.0;
        bucket.tokens = (bucket.tokens + elapsed_secs * self.config.per_second)
            .min(self.config.burst as f64);
        bucket.last_refill_ms = now_ms;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}
