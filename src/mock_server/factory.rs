//! Deterministic pseudo-random candle generation.
//!
//! Every candle is a pure function of (factory seed, pair, interval,
//! bucket timestamp, seed price), so any historical window a client
//! requests is served identically across calls and server restarts within
//! one test. Closes form a continuous walk: the open of bucket *n* is the
//! close of bucket *n − 1*.

use std::hash::{DefaultHasher, Hash, Hasher};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

use crate::types::{CandleData, Interval, TradingPair};

/// Deterministic candle generator.
#[derive(Debug, Clone)]
pub struct CandleDataFactory {
    seed: u64,
}

impl CandleDataFactory {
    /// Create a factory from a seed.
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    fn rng(&self, pair: &TradingPair, interval: Interval, ts: i64, salt: u64) -> StdRng {
        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        pair.hash(&mut hasher);
        interval.as_str().hash(&mut hasher);
        ts.hash(&mut hasher);
        salt.hash(&mut hasher);
        StdRng::seed_from_u64(hasher.finish())
    }

    /// The deterministic close of the bucket at `ts`, within ±1% of the
    /// seed price.
    fn close_price(
        &self,
        pair: &TradingPair,
        interval: Interval,
        ts: i64,
        seed_price: Decimal,
    ) -> Decimal {
        let basis_points: i64 = self.rng(pair, interval, ts, 0).random_range(-100..=100);
        seed_price * Decimal::new(10_000 + basis_points, 0) / Decimal::new(10_000, 0)
    }

    /// Generate the candle for the bucket containing `ts`.
    pub fn candle_at(
        &self,
        pair: &TradingPair,
        interval: Interval,
        ts: i64,
        seed_price: Decimal,
    ) -> CandleData {
        let ts = interval.align(ts);
        let width = interval.seconds() as i64;

        let open = self.close_price(pair, interval, ts - width, seed_price);
        let close = self.close_price(pair, interval, ts, seed_price);

        let mut rng = self.rng(pair, interval, ts, 1);
        let high_bp: i64 = rng.random_range(0..=30);
        let low_bp: i64 = rng.random_range(0..=30);
        let high =
            open.max(close) * Decimal::new(10_000 + high_bp, 0) / Decimal::new(10_000, 0);
        let low = open.min(close) * Decimal::new(10_000 - low_bp, 0) / Decimal::new(10_000, 0);

        let volume = Decimal::new(rng.random_range(10_000..=500_000), 4);
        let taker_fraction = Decimal::new(rng.random_range(3_000..=7_000), 4);
        let n_trades: u64 = rng.random_range(10..=500);

        let quote_volume = volume * close;
        let taker_base = volume * taker_fraction;

        CandleData {
            timestamp: ts,
            open,
            high,
            low,
            close,
            volume,
            quote_asset_volume: quote_volume,
            n_trades,
            taker_buy_base_volume: taker_base,
            taker_buy_quote_volume: taker_base * close,
        }
    }

    /// Generate every bucket in `[start, end]`, ascending.
    pub fn candles_between(
        &self,
        pair: &TradingPair,
        interval: Interval,
        start: i64,
        end: i64,
        seed_price: Decimal,
    ) -> Vec<CandleData> {
        let width = interval.seconds() as i64;
        let mut ts = interval.align(start);
        if ts < start {
            ts += width;
        }
        let mut candles = Vec::new();
        while ts <= end {
            candles.push(self.candle_at(pair, interval, ts, seed_price));
            ts += width;
        }
        candles
    }
}
