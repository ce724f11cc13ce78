//! Canonical trading pair representation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FeedError;

/// A trading pair in the canonical `BASE-QUOTE` form, e.g. `BTC-USDT`.
///
/// Adapters translate to and from exchange-native symbol notation
/// (`BTCUSDT`, `BTC/USDT`, `XBT/USD`, …); everything inside the feed engine
/// and the mock server store speaks this form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TradingPair {
    base: String,
    quote: String,
}

impl TradingPair {
    /// Build a pair from already-validated base and quote assets.
    ///
    /// Both must be non-empty ASCII-uppercase alphanumeric strings.
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> crate::error::Result<Self> {
        let base = base.into();
        let quote = quote.into();
        for asset in [&base, &quote] {
            if asset.is_empty()
                || !asset
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
            {
                return Err(FeedError::InvalidArgument(format!(
                    "malformed trading pair asset: {asset:?}"
                )));
            }
        }
        Ok(Self { base, quote })
    }

    /// The base asset (`BTC` in `BTC-USDT`).
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The quote asset (`USDT` in `BTC-USDT`).
    pub fn quote(&self) -> &str {
        &self.quote
    }
}

impl FromStr for TradingPair {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, quote) = s.split_once('-').ok_or_else(|| {
            FeedError::InvalidArgument(format!(
                "malformed trading pair {s:?} (expected BASE-QUOTE)"
            ))
        })?;
        Self::new(base, quote)
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.base, self.quote)
    }
}

impl TryFrom<String> for TradingPair {
    type Error = FeedError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TradingPair> for String {
    fn from(pair: TradingPair) -> Self {
        pair.to_string()
    }
}
