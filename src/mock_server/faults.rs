//! Network-fault simulation for the mock server.

use rand::Rng;

/// What kind of fault a request was chosen to suffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The response never arrives (the connection stalls until the client
    /// gives up).
    Drop,
    /// The response body is not valid JSON.
    MalformedJson,
    /// A transient 5xx.
    ServerError,
}

/// Configurable fault probabilities, all off by default.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaultConfig {
    /// Probability a response is dropped entirely.
    pub drop_probability: f64,
    /// Probability the body is corrupted into invalid JSON.
    pub malformed_probability: f64,
    /// Probability of a transient 500.
    pub error_probability: f64,
}

impl FaultConfig {
    /// Sample whether the current request should fault, checking drop,
    /// then malformed, then 5xx.
    pub fn sample(&self) -> Option<FaultKind> {
        let mut rng = rand::rng();
        if self.drop_probability > 0.0 && rng.random_bool(self.drop_probability.min(1.0)) {
            return Some(FaultKind::Drop);
        }
        if self.malformed_probability > 0.0 && rng.random_bool(self.malformed_probability.min(1.0))
        {
            return Some(FaultKind::MalformedJson);
        }
        if self.error_probability > 0.0 && rng.random_bool(self.error_probability.min(1.0)) {
            return Some(FaultKind::ServerError);
        }
        None
    }
}

/// Simulated latency window: each request sleeps a duration drawn from
/// `[latency_ms − jitter_ms, latency_ms + jitter_ms]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatencyConfig {
    /// Center of the latency window, milliseconds.
    pub latency_ms: u64,
    /// Half-width of the latency window, milliseconds.
    pub jitter_ms: u64,
}

impl LatencyConfig {
    /// Draw a delay from the configured window.
    pub fn sample_ms(&self) -> u64 {
        if self.latency_ms == 0 && self.jitter_ms == 0 {
            return 0;
        }
        let low = self.latency_ms.saturating_sub(self.jitter_ms);
        let high = self.latency_ms + self.jitter_ms;
        if low == high {
            low
        } else {
            rand::rng().random_range(low..=high)
        }
    }
}
