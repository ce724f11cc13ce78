//! The immutable OHLCV candle record.
//!
//! [`CandleData`] is created by adapters from parsed exchange messages and
//! is immutable thereafter. Prices and volumes are [`Decimal`] so values
//! round-trip through adapter and plugin boundaries without passing through
//! binary floats. The canonical JSON form serializes every price/volume
//! field as a decimal string and `timestamp` in integer seconds.

use std::hash::{Hash, Hasher};

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{FeedError, Result};

/// Raw timestamps arrive from exchanges in several units; values are
/// normalized to integer seconds at construction:
///
/// - integers ≥ 10^12 are treated as milliseconds and divided by 1000,
/// - floats are floored to integer seconds (the millisecond rule applies
///   after the floor),
/// - strings are parsed as ISO-8601 UTC.
#[derive(Debug, Clone)]
pub enum RawTimestamp {
    /// An integer timestamp in seconds or milliseconds.
    Int(i64),
    /// A float timestamp in seconds (or milliseconds, per the 10^12 rule).
    Float(f64),
    /// An ISO-8601 UTC datetime string.
    Iso(String),
}

/// Integer values at or above this magnitude are interpreted as
/// milliseconds since the Unix epoch.
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

impl RawTimestamp {
    /// Normalize to integer seconds since the Unix epoch, UTC.
    pub fn normalize(&self) -> Result<i64> {
        match self {
            RawTimestamp::Int(n) => Ok(Self::scale(*n)),
            RawTimestamp::Float(f) => {
                if !f.is_finite() {
                    return Err(FeedError::InvalidArgument(format!(
                        "non-finite timestamp: {f}"
                    )));
                }
                Ok(Self::scale(f.floor() as i64))
            }
            RawTimestamp::Iso(s) => parse_iso_utc(s),
        }
    }

    fn scale(n: i64) -> i64 {
        if n.abs() >= MILLIS_THRESHOLD {
            n / 1000
        } else {
            n
        }
    }
}

impl From<i64> for RawTimestamp {
    fn from(n: i64) -> Self {
        RawTimestamp::Int(n)
    }
}

impl From<u64> for RawTimestamp {
    fn from(n: u64) -> Self {
        RawTimestamp::Int(n as i64)
    }
}

impl From<f64> for RawTimestamp {
    fn from(f: f64) -> Self {
        RawTimestamp::Float(f)
    }
}

impl From<&str> for RawTimestamp {
    fn from(s: &str) -> Self {
        RawTimestamp::Iso(s.to_owned())
    }
}

impl From<String> for RawTimestamp {
    fn from(s: String) -> Self {
        RawTimestamp::Iso(s)
    }
}

/// Parse an ISO-8601 datetime as UTC. Accepts RFC 3339 (`…Z` / `…+00:00`)
/// and zone-less `YYYY-MM-DDTHH:MM:SS`, which is taken to be UTC.
fn parse_iso_utc(s: &str) -> Result<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc).timestamp());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(naive.and_utc().timestamp());
    }
    Err(FeedError::InvalidArgument(format!(
        "unparseable ISO-8601 timestamp: {s:?}"
    )))
}

// ---------------------------------------------------------------------------
// CandleData
// ---------------------------------------------------------------------------

/// One OHLCV record for one interval bucket.
///
/// Equality and hashing key on `timestamp` only: two candles for the same
/// bucket are the same entity, and later arrivals supersede earlier ones
/// when merged into a feed store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandleData {
    /// Bucket open time, integer seconds since the Unix epoch, UTC.
    pub timestamp: i64,
    /// Open price.
    pub open: Decimal,
    /// High price.
    pub high: Decimal,
    /// Low price.
    pub low: Decimal,
    /// Close price.
    pub close: Decimal,
    /// Base-asset volume.
    pub volume: Decimal,
    /// Quote-asset volume.
    #[serde(default)]
    pub quote_asset_volume: Decimal,
    /// Number of trades in the bucket.
    #[serde(default)]
    pub n_trades: u64,
    /// Taker-buy base-asset volume.
    #[serde(default)]
    pub taker_buy_base_volume: Decimal,
    /// Taker-buy quote-asset volume.
    #[serde(default)]
    pub taker_buy_quote_volume: Decimal,
}

impl CandleData {
    /// Construct a candle with the defaulted fields at zero, normalizing
    /// and validating on the way in.
    ///
    /// Use [`CandleData::builder`] when the extended volume/trade fields
    /// are available.
    pub fn new(
        timestamp: impl Into<RawTimestamp>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Result<Self> {
        Self::builder(timestamp, open, high, low, close, volume).build()
    }

    /// Start building a candle with the extended fields defaulted.
    pub fn builder(
        timestamp: impl Into<RawTimestamp>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> CandleDataBuilder {
        CandleDataBuilder {
            timestamp: timestamp.into(),
            open,
            high,
            low,
            close,
            volume,
            quote_asset_volume: Decimal::ZERO,
            n_trades: 0,
            taker_buy_base_volume: Decimal::ZERO,
            taker_buy_quote_volume: Decimal::ZERO,
        }
    }

    /// The bucket open time in milliseconds.
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp * 1000
    }

    /// Check the OHLCV invariants: `low ≤ open,close ≤ high`, `low ≤ high`,
    /// and every price/volume field non-negative.
    pub fn validate(&self) -> Result<()> {
        let prices_ordered = self.low <= self.open
            && self.low <= self.close
            && self.open <= self.high
            && self.close <= self.high
            && self.low <= self.high;
        if !prices_ordered {
            return Err(FeedError::InvalidCandle(format!(
                "price ordering violated at ts={}: o={} h={} l={} c={}",
                self.timestamp, self.open, self.high, self.low, self.close
            )));
        }
        let non_negative = [
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
            self.quote_asset_volume,
            self.taker_buy_base_volume,
            self.taker_buy_quote_volume,
        ]
        .iter()
        .all(|d| !d.is_sign_negative());
        if !non_negative {
            return Err(FeedError::InvalidCandle(format!(
                "negative price or volume at ts={}",
                self.timestamp
            )));
        }
        Ok(())
    }

    /// Whether the invariants hold. Used by the data processor to discard
    /// candles built from hostile wire data without constructing an error.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

impl PartialEq for CandleData {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp
    }
}

impl Eq for CandleData {}

impl Hash for CandleData {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.timestamp.hash(state);
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`CandleData`] covering the defaulted fields.
#[derive(Debug, Clone)]
pub struct CandleDataBuilder {
    timestamp: RawTimestamp,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
    quote_asset_volume: Decimal,
    n_trades: u64,
    taker_buy_base_volume: Decimal,
    taker_buy_quote_volume: Decimal,
}

impl CandleDataBuilder {
    /// Set the quote-asset volume. Default: 0.
    pub fn quote_asset_volume(mut self, v: Decimal) -> Self {
        self.quote_asset_volume = v;
        self
    }

    /// Set the trade count. Default: 0.
    pub fn n_trades(mut self, n: u64) -> Self {
        self.n_trades = n;
        self
    }

    /// Set the taker-buy base-asset volume. Default: 0.
    pub fn taker_buy_base_volume(mut self, v: Decimal) -> Self {
        self.taker_buy_base_volume = v;
        self
    }

    /// Set the taker-buy quote-asset volume. Default: 0.
    pub fn taker_buy_quote_volume(mut self, v: Decimal) -> Self {
        self.taker_buy_quote_volume = v;
        self
    }

    /// Normalize the timestamp, validate the invariants, and build.
    pub fn build(self) -> Result<CandleData> {
        let candle = CandleData {
            timestamp: self.timestamp.normalize()?,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            quote_asset_volume: self.quote_asset_volume,
            n_trades: self.n_trades,
            taker_buy_base_volume: self.taker_buy_base_volume,
            taker_buy_quote_volume: self.taker_buy_quote_volume,
        };
        candle.validate()?;
        Ok(candle)
    }
}
