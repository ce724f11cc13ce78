//! Bybit spot adapter (v5 unified API).
//!
//! REST shape: `GET /v5/market/kline?category=spot` with a `{retCode,
//! retMsg, result}` envelope whose `result.list` rows are newest-first
//! string arrays with millisecond timestamps. WS shape:
//! `kline.<interval>.<symbol>` topics pushing object rows. Bybit encodes
//! minute intervals as bare numbers (`"1"`, `"60"`) and days/weeks/months
//! as `D`/`W`/`M`.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::adapters::{AdapterCore, ExchangeAdapter, decimal_field, int_field};
use crate::constants::urls;
use crate::error::{FeedError, Result};
use crate::network::{EndpointKind, NetworkConfig};
use crate::types::{CandleData, CandlesRequest, Interval, TradingPair};

/// The intervals Bybit v5 serves.
const INTERVALS: [Interval; 13] = [
    Interval::OneMinute,
    Interval::ThreeMinutes,
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

/// Adapter for Bybit spot markets. Async-only I/O with testnet support.
pub struct BybitSpotAdapter {
    core: AdapterCore,
}

impl BybitSpotAdapter {
    /// Create the adapter.
    pub fn new(network_config: Option<NetworkConfig>) -> Self {
        Self {
            core: AdapterCore::new(network_config),
        }
    }

    /// The Bybit interval token for a canonical interval.
    pub fn interval_token(interval: Interval) -> String {
        match interval {
            Interval::OneDay => "D".to_owned(),
            Interval::OneWeek => "W".to_owned(),
            Interval::OneMonth => "M".to_owned(),
            other => (other.seconds() / 60).to_string(),
        }
    }

    /// Parse one kline row: `[start, o, h, l, c, volume, turnover]`.
    fn parse_row(row: &Value) -> Result<CandleData> {
        let fields = row
            .as_array()
            .filter(|f| f.len() >= 7)
            .ok_or_else(|| FeedError::protocol("bybit kline row", row))?;
        CandleData::builder(
            int_field(&fields[0], "bybit kline start")?,
            decimal_field(&fields[1], "bybit open")?,
            decimal_field(&fields[2], "bybit high")?,
            decimal_field(&fields[3], "bybit low")?,
            decimal_field(&fields[4], "bybit close")?,
            decimal_field(&fields[5], "bybit volume")?,
        )
        .quote_asset_volume(decimal_field(&fields[6], "bybit turnover")?)
        .build()
    }
}

#[async_trait]
impl ExchangeAdapter for BybitSpotAdapter {
    fn name(&self) -> &'static str {
        "bybit_spot"
    }

    fn core(&self) -> &AdapterCore {
        &self.core
    }

    fn intervals(&self) -> &'static [Interval] {
        &INTERVALS
    }

    fn trading_pair_format(&self, pair: &TradingPair) -> String {
        format!("{}{}", pair.base(), pair.quote())
    }

    fn production_rest_base(&self) -> &'static str {
        urls::bybit::REST
    }

    fn testnet_rest_base(&self) -> Option<&'static str> {
        Some(urls::bybit::REST_TESTNET)
    }

    fn production_ws_url(&self) -> &'static str {
        urls::bybit::WS
    }

    fn testnet_ws_url(&self) -> Option<&'static str> {
        Some(urls::bybit::WS_TESTNET)
    }

    fn rest_path(&self, kind: EndpointKind) -> Result<&'static str> {
        match kind {
            EndpointKind::Candles => Ok("/v5/market/kline"),
            EndpointKind::Ticker => Ok("/v5/market/time"),
            EndpointKind::Orders => Ok("/v5/order/create"),
            EndpointKind::Account => Ok("/v5/account/wallet-balance"),
        }
    }

    fn rest_params(&self, req: &CandlesRequest) -> Result<Vec<(String, String)>> {
        let mut params = vec![
            ("category".to_owned(), "spot".to_owned()),
            ("symbol".to_owned(), self.trading_pair_format(&req.pair)),
            ("interval".to_owned(), Self::interval_token(req.interval)),
        ];
        if let Some(start) = req.start_time {
            params.push(("start".to_owned(), (start * 1000).to_string()));
        }
        if let Some(end) = req.end_time {
            params.push(("end".to_owned(), (end * 1000).to_string()));
        }
        if let Some(limit) = req.limit {
            params.push(("limit".to_owned(), limit.to_string()));
        }
        Ok(params)
    }

    fn parse_rest_response(&self, raw: &Value) -> Result<Vec<CandleData>> {
        if raw.get("retCode").and_then(Value::as_i64) != Some(0) {
            return Err(FeedError::protocol("bybit retCode", raw));
        }
        let rows = raw
            .get("result")
            .and_then(|r| r.get("list"))
            .and_then(Value::as_array)
            .ok_or_else(|| FeedError::protocol("bybit kline list", raw))?;
        let mut candles = rows
            .iter()
            .map(Self::parse_row)
            .collect::<Result<Vec<_>>>()?;
        candles.reverse();
        Ok(candles)
    }

    fn ws_subscription_payload(&self, pair: &TradingPair, interval: Interval) -> Result<Value> {
        let topic = format!(
            "kline.{}.{}",
            Self::interval_token(interval),
            self.trading_pair_format(pair)
        );
        Ok(json!({ "op": "subscribe", "args": [topic] }))
    }

    fn parse_ws_message(&self, raw: &Value) -> Result<Vec<CandleData>> {
        let is_kline = raw
            .get("topic")
            .and_then(Value::as_str)
            .is_some_and(|t| t.starts_with("kline."));
        if !is_kline {
            return Ok(Vec::new());
        }
        let rows = raw
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| FeedError::protocol("bybit kline push", raw))?;
        let mut candles = Vec::with_capacity(rows.len());
        for row in rows {
            let field = |key: &str| {
                row.get(key)
                    .ok_or_else(|| FeedError::protocol("bybit kline push", row))
            };
            candles.push(
                CandleData::builder(
                    int_field(field("start")?, "bybit push start")?,
                    decimal_field(field("open")?, "bybit push open")?,
                    decimal_field(field("high")?, "bybit push high")?,
                    decimal_field(field("low")?, "bybit push low")?,
                    decimal_field(field("close")?, "bybit push close")?,
                    decimal_field(field("volume")?, "bybit push volume")?,
                )
                .quote_asset_volume(decimal_field(field("turnover")?, "bybit push turnover")?)
                .build()?,
            );
        }
        Ok(candles)
    }
}
