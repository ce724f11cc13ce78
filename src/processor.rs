//! Sorting, de-duplication, gap detection, and sanitization of candle
//! sequences.
//!
//! These three operations are deterministic and side-effect-free, and they
//! are the only path by which candles enter a feed store: strategies feed
//! raw adapter output through [`sanitize`] and [`merge`], then schedule
//! backfills for whatever [`detect_gaps`] reports.

use std::collections::BTreeMap;

use crate::types::CandleData;

/// Discard candles whose OHLCV invariants fail, keeping the rest in input
/// order. Each drop is logged at debug with the offending timestamp.
pub fn sanitize(candles: Vec<CandleData>) -> Vec<CandleData> {
    candles
        .into_iter()
        .filter(|c| {
            let valid = c.is_valid();
            if !valid {
                tracing::debug!(ts = c.timestamp, "dropping invalid candle");
            }
            valid
        })
        .collect()
}

/// Union two candle sequences keyed by timestamp, sorted ascending.
///
/// `incoming` wins on timestamp collisions (last writer wins), which is what
/// lets a still-forming WebSocket bucket overwrite its earlier snapshots.
pub fn merge(existing: Vec<CandleData>, incoming: Vec<CandleData>) -> Vec<CandleData> {
    let mut by_ts: BTreeMap<i64, CandleData> = BTreeMap::new();
    for candle in existing.into_iter().chain(incoming) {
        by_ts.insert(candle.timestamp, candle);
    }
    by_ts.into_values().collect()
}

/// Return every `(prev_ts, next_ts)` pair of consecutive candles whose
/// timestamps differ by more than one interval width.
///
/// The input must already be ascending (as produced by [`merge`]); the gaps
/// are what the strategies backfill with targeted REST reads.
pub fn detect_gaps(candles: &[CandleData], interval_seconds: u64) -> Vec<(i64, i64)> {
    let width = interval_seconds as i64;
    candles
        .windows(2)
        .filter(|w| w[1].timestamp - w[0].timestamp > width)
        .map(|w| (w[0].timestamp, w[1].timestamp))
        .collect()
}
