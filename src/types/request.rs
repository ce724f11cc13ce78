//! Validated candle fetch arguments.

use crate::error::{FeedError, Result};
use crate::types::{Interval, TradingPair};

/// Canonical arguments for a historical candle fetch.
///
/// Adapters map this onto exchange-native query parameters; construction
/// rejects a window whose start lies after its end.
#[derive(Debug, Clone)]
pub struct CandlesRequest {
    /// The trading pair in canonical form.
    pub pair: TradingPair,
    /// The candle interval.
    pub interval: Interval,
    /// Inclusive window start, seconds since the Unix epoch.
    pub start_time: Option<i64>,
    /// Inclusive window end, seconds since the Unix epoch.
    pub end_time: Option<i64>,
    /// Maximum number of candles to return.
    pub limit: Option<usize>,
}

impl CandlesRequest {
    /// Build a request for the most recent `limit` candles.
    pub fn latest(pair: TradingPair, interval: Interval, limit: usize) -> Self {
        Self {
            pair,
            interval,
            start_time: None,
            end_time: None,
            limit: Some(limit),
        }
    }

    /// Build a request for an explicit window, validating its bounds.
    pub fn window(
        pair: TradingPair,
        interval: Interval,
        start_time: Option<i64>,
        end_time: Option<i64>,
        limit: Option<usize>,
    ) -> Result<Self> {
        if let (Some(start), Some(end)) = (start_time, end_time) {
            if start > end {
                return Err(FeedError::InvalidArgument(format!(
                    "start_time {start} is after end_time {end}"
                )));
            }
        }
        Ok(Self {
            pair,
            interval,
            start_time,
            end_time,
            limit,
        })
    }
}
