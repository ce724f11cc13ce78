//! Coinbase Advanced Trade adapter.
//!
//! REST shape: `GET /api/v3/brokerage/market/products/{product_id}/candles`
//! returning `{"candles":[{start, low, high, open, close, volume}]}` with
//! second timestamps as strings, newest first. The product id rides in the
//! URL path rather than the query string. Granularity is a word token
//! (`ONE_MINUTE`, `ONE_HOUR`, …). WS shape: the `candles` channel on the
//! advanced-trade endpoint, pushing batched `events[].candles[]`.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::adapters::{AdapterCore, ExchangeAdapter, decimal_field, int_field};
use crate::constants::urls;
use crate::error::{FeedError, Result};
use crate::network::{EndpointKind, NetworkConfig};
use crate::types::{CandleData, CandlesRequest, Interval, TradingPair};

/// The intervals Coinbase Advanced Trade serves.
const INTERVALS: [Interval; 8] = [
    Interval::OneMinute,
    Interval::FiveMinutes,
    Interval::FifteenMinutes,
    Interval::ThirtyMinutes,
    Interval::OneHour,
    Interval::TwoHours,
    Interval::SixHours,
    Interval::OneDay,
];

/// Adapter for Coinbase Advanced Trade. Async-only I/O.
pub struct CoinbaseAdvancedTradeAdapter {
    core: AdapterCore,
}

impl CoinbaseAdvancedTradeAdapter {
    /// Create the adapter.
    pub fn new(network_config: Option<NetworkConfig>) -> Self {
        Self {
            core: AdapterCore::new(network_config),
        }
    }

    /// The granularity token for a canonical interval.
    pub fn granularity_token(interval: Interval) -> &'static str {
        match interval {
            Interval::OneMinute => "ONE_MINUTE",
            Interval::FiveMinutes => "FIVE_MINUTE",
            Interval::FifteenMinutes => "FIFTEEN_MINUTE",
            Interval::ThirtyMinutes => "THIRTY_MINUTE",
            Interval::OneHour => "ONE_HOUR",
            Interval::TwoHours => "TWO_HOUR",
            Interval::SixHours => "SIX_HOUR",
            _ => "ONE_DAY",
        }
    }

    /// Parse one candle object.
    fn parse_candle(obj: &Value) -> Result<CandleData> {
        let field = |key: &str| {
            obj.get(key)
                .ok_or_else(|| FeedError::protocol("coinbase candle object", obj))
        };
        CandleData::new(
            int_field(field("start")?, "coinbase candle start")?,
            decimal_field(field("open")?, "coinbase open")?,
            decimal_field(field("high")?, "coinbase high")?,
            decimal_field(field("low")?, "coinbase low")?,
            decimal_field(field("close")?, "coinbase close")?,
            decimal_field(field("volume")?, "coinbase volume")?,
        )
    }
}

#[async_trait]
impl ExchangeAdapter for CoinbaseAdvancedTradeAdapter {
    fn name(&self) -> &'static str {
        "coinbase_advanced_trade"
    }

    fn core(&self) -> &AdapterCore {
        &self.core
    }

    fn intervals(&self) -> &'static [Interval] {
        &INTERVALS
    }

    fn trading_pair_format(&self, pair: &TradingPair) -> String {
        pair.to_string()
    }

    fn production_rest_base(&self) -> &'static str {
        urls::coinbase::REST
    }

    fn production_ws_url(&self) -> &'static str {
        urls::coinbase::WS
    }

    fn rest_path(&self, kind: EndpointKind) -> Result<&'static str> {
        match kind {
            EndpointKind::Candles => Ok("/api/v3/brokerage/market/products"),
            EndpointKind::Ticker => Ok("/api/v3/brokerage/time"),
            EndpointKind::Orders => Ok("/api/v3/brokerage/orders"),
            EndpointKind::Account => Ok("/api/v3/brokerage/accounts"),
        }
    }

    fn candles_url(&self, pair: &TradingPair) -> Result<String> {
        Ok(format!(
            "{}/{}/candles",
            self.rest_url(EndpointKind::Candles)?,
            self.trading_pair_format(pair)
        ))
    }

    fn rest_params(&self, req: &CandlesRequest) -> Result<Vec<(String, String)>> {
        let mut params = vec![(
            "granularity".to_owned(),
            Self::granularity_token(req.interval).to_owned(),
        )];
        if let Some(start) = req.start_time {
            params.push(("start".to_owned(), start.to_string()));
        }
        if let Some(end) = req.end_time {
            params.push(("end".to_owned(), end.to_string()));
        }
        if let Some(limit) = req.limit {
            params.push(("limit".to_owned(), limit.to_string()));
        }
        Ok(params)
    }

    fn parse_rest_response(&self, raw: &Value) -> Result<Vec<CandleData>> {
        let rows = raw
            .get("candles")
            .and_then(Value::as_array)
            .ok_or_else(|| FeedError::protocol("coinbase candles envelope", raw))?;
        let mut candles = rows
            .iter()
            .map(Self::parse_candle)
            .collect::<Result<Vec<_>>>()?;
        candles.reverse();
        Ok(candles)
    }

    fn ws_subscription_payload(&self, pair: &TradingPair, _interval: Interval) -> Result<Value> {
        Ok(json!({
            "type": "subscribe",
            "product_ids": [self.trading_pair_format(pair)],
            "channel": "candles",
        }))
    }

    /// Coinbase's candles channel streams five-minute buckets only.
    fn ws_intervals(&self) -> &'static [Interval] {
        &[Interval::FiveMinutes]
    }

    fn parse_ws_message(&self, raw: &Value) -> Result<Vec<CandleData>> {
        if raw.get("channel").and_then(Value::as_str) != Some("candles") {
            return Ok(Vec::new());
        }
        let events = raw
            .get("events")
            .and_then(Value::as_array)
            .ok_or_else(|| FeedError::protocol("coinbase ws events", raw))?;
        let mut candles = Vec::new();
        for event in events {
            if let Some(rows) = event.get("candles").and_then(Value::as_array) {
                for row in rows {
                    candles.push(Self::parse_candle(row)?);
                }
            }
        }
        Ok(candles)
    }
}
