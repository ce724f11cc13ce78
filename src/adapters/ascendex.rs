//! AscendEX spot adapter (API pro v1).
//!
//! REST shape: `GET /api/pro/v1/barhist` with a `{code, data}` envelope
//! whose entries wrap each bar in a message record: `{"m":"bar","s":
//! "BTC/USDT","data":{"i":"1","ts":ms,"o","c","h","l","v"}}`, ascending,
//! prices as strings. WS shape: `{"op":"sub","ch":"bar:<interval>:<sym>"}`
//! subscriptions and the same `{"m":"bar",…}` records as pushes. Pairs
//! are slash-joined; minute intervals are bare numbers and day/week/month
//! are `1d`/`1w`/`1m` (lowercase `1m` is the *month* bar).

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::adapters::{AdapterCore, ExchangeAdapter, decimal_field, int_field};
use crate::constants::urls;
use crate::error::{FeedError, Result};
use crate::network::{EndpointKind, NetworkConfig};
use crate::types::{CandleData, CandlesRequest, Interval, TradingPair};

/// The intervals AscendEX serves.
const INTERVALS: [Interval; 12] = [
    Interval::OneMinute,
    Interval::FiveMinutes,
    Interval::FifteenMinutes,
    Interval::ThirtyMinutes,
    Interval::OneHour,
    Interval::TwoHours,
    Interval::FourHours,
    Interval::SixHours,
    Interval::TwelveHours,
    Interval::OneDay,
    Interval::OneWeek,
    Interval::OneMonth,
];

/// Adapter for AscendEX spot markets. Async-only I/O.
pub struct AscendexSpotAdapter {
    core: AdapterCore,
}

impl AscendexSpotAdapter {
    /// Create the adapter.
    pub fn new(network_config: Option<NetworkConfig>) -> Self {
        Self {
            core: AdapterCore::new(network_config),
        }
    }

    /// The AscendEX interval token for a canonical interval.
    pub fn interval_token(interval: Interval) -> String {
        match interval {
            Interval::OneDay => "1d".to_owned(),
            Interval::OneWeek => "1w".to_owned(),
            Interval::OneMonth => "1m".to_owned(),
            other => (other.seconds() / 60).to_string(),
        }
    }

    /// Parse one bar record: `{"m":"bar","s":…,"data":{…}}`.
    fn parse_bar(record: &Value) -> Result<CandleData> {
        let data = record
            .get("data")
            .ok_or_else(|| FeedError::protocol("ascendex bar record", record))?;
        let field = |key: &str| {
            data.get(key)
                .ok_or_else(|| FeedError::protocol("ascendex bar record", data))
        };
        CandleData::new(
            int_field(field("ts")?, "ascendex bar ts")?,
            decimal_field(field("o")?, "ascendex open")?,
            decimal_field(field("h")?, "ascendex high")?,
            decimal_field(field("l")?, "ascendex low")?,
            decimal_field(field("c")?, "ascendex close")?,
            decimal_field(field("v")?, "ascendex volume")?,
        )
    }
}

#[async_trait]
impl ExchangeAdapter for AscendexSpotAdapter {
    fn name(&self) -> &'static str {
        "ascendex_spot"
    }

    fn core(&self) -> &AdapterCore {
        &self.core
    }

    fn intervals(&self) -> &'static [Interval] {
        &INTERVALS
    }

    fn trading_pair_format(&self, pair: &TradingPair) -> String {
        format!("{}/{}", pair.base(), pair.quote())
    }

    fn production_rest_base(&self) -> &'static str {
        urls::ascendex::REST
    }

    fn production_ws_url(&self) -> &'static str {
        urls::ascendex::WS
    }

    fn rest_path(&self, kind: EndpointKind) -> Result<&'static str> {
        match kind {
            EndpointKind::Candles => Ok("/api/pro/v1/barhist"),
            EndpointKind::Ticker => Ok("/api/pro/v1/assets"),
            EndpointKind::Orders => Ok("/api/pro/v1/cash/order"),
            EndpointKind::Account => Ok("/api/pro/v1/cash/balance"),
        }
    }

    fn rest_params(&self, req: &CandlesRequest) -> Result<Vec<(String, String)>> {
        let mut params = vec![
            ("symbol".to_owned(), self.trading_pair_format(&req.pair)),
            ("interval".to_owned(), Self::interval_token(req.interval)),
        ];
        if let Some(start) = req.start_time {
            params.push(("from".to_owned(), (start * 1000).to_string()));
        }
        if let Some(end) = req.end_time {
            params.push(("to".to_owned(), (end * 1000).to_string()));
        }
        if let Some(limit) = req.limit {
            params.push(("n".to_owned(), limit.to_string()));
        }
        Ok(params)
    }

    fn parse_rest_response(&self, raw: &Value) -> Result<Vec<CandleData>> {
        if raw.get("code").and_then(Value::as_i64) != Some(0) {
            return Err(FeedError::protocol("ascendex response code", raw));
        }
        let rows = raw
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| FeedError::protocol("ascendex barhist data", raw))?;
        rows.iter().map(Self::parse_bar).collect()
    }

    fn ws_subscription_payload(&self, pair: &TradingPair, interval: Interval) -> Result<Value> {
        Ok(json!({
            "op": "sub",
            "ch": format!(
                "bar:{}:{}",
                Self::interval_token(interval),
                self.trading_pair_format(pair)
            ),
        }))
    }

    fn parse_ws_message(&self, raw: &Value) -> Result<Vec<CandleData>> {
        // Acks arrive as {"m":"sub",…}, heartbeats as {"m":"ping"}.
        if raw.get("m").and_then(Value::as_str) != Some("bar") {
            return Ok(Vec::new());
        }
        Ok(vec![Self::parse_bar(raw)?])
    }
}
