//! Gate.io spot adapter (API v4).
//!
//! REST shape: `GET /api/v4/spot/candlesticks` returning a bare ascending
//! array whose rows put the quote volume second and the open *after* the
//! high and low: `[ts_sec_str, quote_vol, close, high, low, open,
//! base_vol, closed_flag]`. WS shape: the `spot.candlesticks` channel with
//! `[interval, currency_pair]` payloads and object-shaped pushes. Pairs
//! are underscore-joined (`BTC_USDT`); week and month bars are written as
//! `7d` and `30d`.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::adapters::{AdapterCore, ExchangeAdapter, decimal_field, int_field};
use crate::constants::urls;
use crate::error::{FeedError, Result};
use crate::network::{EndpointKind, NetworkConfig};
use crate::types::{CandleData, CandlesRequest, Interval, TradingPair};

/// The intervals Gate.io serves.
const INTERVALS: [Interval; 10] = [
    Interval::OneMinute,
    Interval::FiveMinutes,
    Interval::FifteenMinutes,
    Interval::ThirtyMinutes,
    Interval::OneHour,
    Interval::FourHours,
    Interval::EightHours,
    Interval::OneDay,
    Interval::OneWeek,
    Interval::OneMonth,
];

/// Adapter for Gate.io spot markets. Async-only I/O.
pub struct GateIoSpotAdapter {
    core: AdapterCore,
}

impl GateIoSpotAdapter {
    /// Create the adapter.
    pub fn new(network_config: Option<NetworkConfig>) -> Self {
        Self {
            core: AdapterCore::new(network_config),
        }
    }

    /// The Gate.io interval token for a canonical interval.
    pub fn interval_token(interval: Interval) -> &'static str {
        match interval {
            Interval::OneWeek => "7d",
            Interval::OneMonth => "30d",
            other => other.as_str(),
        }
    }

    /// Parse one candlestick row: `[ts, quote_vol, close, high, low, open,
    /// base_vol, …]`.
    fn parse_row(row: &Value) -> Result<CandleData> {
        let fields = row
            .as_array()
            .filter(|f| f.len() >= 7)
            .ok_or_else(|| FeedError::protocol("gateio candlestick row", row))?;
        CandleData::builder(
            int_field(&fields[0], "gateio candlestick ts")?,
            decimal_field(&fields[5], "gateio open")?,
            decimal_field(&fields[3], "gateio high")?,
            decimal_field(&fields[4], "gateio low")?,
            decimal_field(&fields[2], "gateio close")?,
            decimal_field(&fields[6], "gateio base volume")?,
        )
        .quote_asset_volume(decimal_field(&fields[1], "gateio quote volume")?)
        .build()
    }
}

#[async_trait]
impl ExchangeAdapter for GateIoSpotAdapter {
    fn name(&self) -> &'static str {
        "gateio_spot"
    }

    fn core(&self) -> &AdapterCore {
        &self.core
    }

    fn intervals(&self) -> &'static [Interval] {
        &INTERVALS
    }

    fn trading_pair_format(&self, pair: &TradingPair) -> String {
        format!("{}_{}", pair.base(), pair.quote())
    }

    fn production_rest_base(&self) -> &'static str {
        urls::gateio::REST
    }

    fn production_ws_url(&self) -> &'static str {
        urls::gateio::WS
    }

    fn rest_path(&self, kind: EndpointKind) -> Result<&'static str> {
        match kind {
            EndpointKind::Candles => Ok("/api/v4/spot/candlesticks"),
            EndpointKind::Ticker => Ok("/api/v4/spot/time"),
            EndpointKind::Orders => Ok("/api/v4/spot/orders"),
            EndpointKind::Account => Ok("/api/v4/spot/accounts"),
        }
    }

    fn rest_params(&self, req: &CandlesRequest) -> Result<Vec<(String, String)>> {
        let mut params = vec![
            (
                "currency_pair".to_owned(),
                self.trading_pair_format(&req.pair),
            ),
            (
                "interval".to_owned(),
                Self::interval_token(req.interval).to_owned(),
            ),
        ];
        if let Some(start) = req.start_time {
            params.push(("from".to_owned(), start.to_string()));
        }
        if let Some(end) = req.end_time {
            params.push(("to".to_owned(), end.to_string()));
        }
        if let Some(limit) = req.limit {
            params.push(("limit".to_owned(), limit.to_string()));
        }
        Ok(params)
    }

    fn parse_rest_response(&self, raw: &Value) -> Result<Vec<CandleData>> {
        let rows = raw
            .as_array()
            .ok_or_else(|| FeedError::protocol("gateio candlesticks response", raw))?;
        rows.iter().map(Self::parse_row).collect()
    }

    fn ws_subscription_payload(&self, pair: &TradingPair, interval: Interval) -> Result<Value> {
        Ok(json!({
            "time": 0,
            "channel": "spot.candlesticks",
            "event": "subscribe",
            "payload": [
                Self::interval_token(interval),
                self.trading_pair_format(pair),
            ],
        }))
    }

    fn parse_ws_message(&self, raw: &Value) -> Result<Vec<CandleData>> {
        let is_update = raw.get("channel").and_then(Value::as_str)
            == Some("spot.candlesticks")
            && raw.get("event").and_then(Value::as_str) == Some("update");
        if !is_update {
            return Ok(Vec::new());
        }
        let result = raw
            .get("result")
            .ok_or_else(|| FeedError::protocol("gateio candlestick push", raw))?;
        let field = |key: &str| {
            result
                .get(key)
                .ok_or_else(|| FeedError::protocol("gateio candlestick push", result))
        };
        let candle = CandleData::builder(
            int_field(field("t")?, "gateio push ts")?,
            decimal_field(field("o")?, "gateio push open")?,
            decimal_field(field("h")?, "gateio push high")?,
            decimal_field(field("l")?, "gateio push low")?,
            decimal_field(field("c")?, "gateio push close")?,
            decimal_field(field("a")?, "gateio push base volume")?,
        )
        .quote_asset_volume(decimal_field(field("v")?, "gateio push quote volume")?)
        .build()?;
        Ok(vec![candle])
    }
}
