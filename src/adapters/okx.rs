//! OKX spot adapter.
//!
//! REST shape: `GET /api/v5/market/candles` with a `{code, msg, data}`
//! envelope whose rows are newest-first string arrays with millisecond
//! timestamps. WS shape: `candle<bar>` channels on the business endpoint.
//! OKX writes hour-and-larger bar tokens in uppercase (`1H`, `1D`, `1W`)
//! and has no 8-hour bar.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::adapters::{AdapterCore, ExchangeAdapter, decimal_field, int_field};
use crate::constants::urls;
use crate::error::{FeedError, Result};
use crate::network::{EndpointKind, NetworkConfig};
use crate::types::{CandleData, CandlesRequest, Interval, TradingPair};

/// The intervals OKX serves (everything canonical except `8h`).
const INTERVALS: [Interval; 15] = [
    Interval::OneSecond,
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
    Interval::ThreeDays,
    Interval::OneWeek,
    Interval::OneMonth,
];

/// Adapter for OKX spot markets. Async-only I/O.
pub struct OkxSpotAdapter {
    core: AdapterCore,
}

impl OkxSpotAdapter {
    /// Create the adapter.
    pub fn new(network_config: Option<NetworkConfig>) -> Self {
        Self {
            core: AdapterCore::new(network_config),
        }
    }

    /// The OKX bar token for a canonical interval.
    pub fn bar_token(interval: Interval) -> &'static str {
        match interval {
            Interval::OneSecond => "1s",
            Interval::OneMinute => "1m",
            Interval::ThreeMinutes => "3m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::ThirtyMinutes => "30m",
            Interval::OneHour => "1H",
            Interval::TwoHours => "2H",
            Interval::FourHours => "4H",
            Interval::SixHours => "6H",
            Interval::EightHours => "8H",
            Interval::TwelveHours => "12H",
            Interval::OneDay => "1D",
            Interval::ThreeDays => "3D",
            Interval::OneWeek => "1W",
            Interval::OneMonth => "1M",
        }
    }

    /// Parse one candle row: `[ts, o, h, l, c, vol, volCcy, …]`.
    fn parse_row(row: &Value) -> Result<CandleData> {
        let fields = row
            .as_array()
            .filter(|f| f.len() >= 7)
            .ok_or_else(|| FeedError::protocol("okx candle row", row))?;
        CandleData::builder(
            int_field(&fields[0], "okx candle ts")?,
            decimal_field(&fields[1], "okx open")?,
            decimal_field(&fields[2], "okx high")?,
            decimal_field(&fields[3], "okx low")?,
            decimal_field(&fields[4], "okx close")?,
            decimal_field(&fields[5], "okx volume")?,
        )
        .quote_asset_volume(decimal_field(&fields[6], "okx quote volume")?)
        .build()
    }

    fn parse_rows_newest_first(rows: &[Value]) -> Result<Vec<CandleData>> {
        let mut candles = rows
            .iter()
            .map(Self::parse_row)
            .collect::<Result<Vec<_>>>()?;
        candles.reverse();
        Ok(candles)
    }
}

#[async_trait]
impl ExchangeAdapter for OkxSpotAdapter {
    fn name(&self) -> &'static str {
        "okx_spot"
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
        urls::okx::REST
    }

    fn production_ws_url(&self) -> &'static str {
        urls::okx::WS
    }

    fn rest_path(&self, kind: EndpointKind) -> Result<&'static str> {
        match kind {
            EndpointKind::Candles => Ok("/api/v5/market/candles"),
            EndpointKind::Ticker => Ok("/api/v5/public/time"),
            EndpointKind::Orders => Ok("/api/v5/trade/order"),
            EndpointKind::Account => Ok("/api/v5/account/balance"),
        }
    }

    fn rest_params(&self, req: &CandlesRequest) -> Result<Vec<(String, String)>> {
        let mut params = vec![
            ("instId".to_owned(), self.trading_pair_format(&req.pair)),
            ("bar".to_owned(), Self::bar_token(req.interval).to_owned()),
        ];
        // OKX paginates with exclusive millisecond bounds: `after` returns
        // records older than it, `before` records newer than it.
        if let Some(end) = req.end_time {
            params.push(("after".to_owned(), (end * 1000 + 1).to_string()));
        }
        if let Some(start) = req.start_time {
            params.push(("before".to_owned(), (start * 1000 - 1).to_string()));
        }
        if let Some(limit) = req.limit {
            params.push(("limit".to_owned(), limit.to_string()));
        }
        Ok(params)
    }

    fn parse_rest_response(&self, raw: &Value) -> Result<Vec<CandleData>> {
        if raw.get("code").and_then(Value::as_str) != Some("0") {
            return Err(FeedError::protocol("okx response code", raw));
        }
        let rows = raw
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| FeedError::protocol("okx candles data", raw))?;
        Self::parse_rows_newest_first(rows)
    }

    fn ws_subscription_payload(&self, pair: &TradingPair, interval: Interval) -> Result<Value> {
        Ok(json!({
            "op": "subscribe",
            "args": [{
                "channel": format!("candle{}", Self::bar_token(interval)),
                "instId": self.trading_pair_format(pair),
            }],
        }))
    }

    fn parse_ws_message(&self, raw: &Value) -> Result<Vec<CandleData>> {
        // Subscribe acks and errors arrive as "event" messages.
        if raw.get("event").is_some() {
            return Ok(Vec::new());
        }
        let Some(rows) = raw.get("data").and_then(Value::as_array) else {
            return Ok(Vec::new());
        };
        if raw
            .get("arg")
            .and_then(|a| a.get("channel"))
            .and_then(Value::as_str)
            .is_none_or(|c| !c.starts_with("candle"))
        {
            return Ok(Vec::new());
        }
        Self::parse_rows_newest_first(rows)
    }
}
