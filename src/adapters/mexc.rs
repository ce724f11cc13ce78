//! MEXC spot adapter (API v3).
//!
//! REST shape: a Binance-like `GET /api/v3/klines` returning ascending
//! 8-element arrays (no trade-count or taker fields): `[openTime_ms,
//! open, high, low, close, volume, closeTime_ms, quoteVolume]`. MEXC
//! writes the hour bar as `60m` and the week as `1W`. WS shape: the
//! protobuf-era v3 channel names `spot@public.kline.v3.api@<SYMBOL>@<Tok>`
//! with word tokens (`Min1`, `Hour4`, `Day1`) and JSON kline payloads
//! under `d.k`.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::adapters::{AdapterCore, ExchangeAdapter, decimal_field, int_field};
use crate::constants::urls;
use crate::error::{FeedError, Result};
use crate::network::{EndpointKind, NetworkConfig};
use crate::types::{CandleData, CandlesRequest, Interval, TradingPair};

/// The intervals MEXC serves.
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

/// Adapter for MEXC spot markets. Async-only I/O.
pub struct MexcSpotAdapter {
    core: AdapterCore,
}

impl MexcSpotAdapter {
    /// Create the adapter.
    pub fn new(network_config: Option<NetworkConfig>) -> Self {
        Self {
            core: AdapterCore::new(network_config),
        }
    }

    /// The REST interval token for a canonical interval.
    pub fn rest_interval_token(interval: Interval) -> &'static str {
        match interval {
            Interval::OneHour => "60m",
            Interval::OneWeek => "1W",
            other => other.as_str(),
        }
    }

    /// The WS stream interval token for a canonical interval.
    pub fn ws_interval_token(interval: Interval) -> &'static str {
        match interval {
            Interval::OneMinute => "Min1",
            Interval::FiveMinutes => "Min5",
            Interval::FifteenMinutes => "Min15",
            Interval::ThirtyMinutes => "Min30",
            Interval::OneHour => "Min60",
            Interval::FourHours => "Hour4",
            Interval::EightHours => "Hour8",
            Interval::OneDay => "Day1",
            Interval::OneWeek => "Week1",
            _ => "Month1",
        }
    }

    /// Parse one 8-element kline row.
    fn parse_row(row: &Value) -> Result<CandleData> {
        let fields = row
            .as_array()
            .filter(|f| f.len() >= 8)
            .ok_or_else(|| FeedError::protocol("mexc kline row", row))?;
        CandleData::builder(
            int_field(&fields[0], "mexc open time")?,
            decimal_field(&fields[1], "mexc open")?,
            decimal_field(&fields[2], "mexc high")?,
            decimal_field(&fields[3], "mexc low")?,
            decimal_field(&fields[4], "mexc close")?,
            decimal_field(&fields[5], "mexc volume")?,
        )
        .quote_asset_volume(decimal_field(&fields[7], "mexc quote volume")?)
        .build()
    }
}

#[async_trait]
impl ExchangeAdapter for MexcSpotAdapter {
    fn name(&self) -> &'static str {
        "mexc_spot"
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
        urls::mexc::REST
    }

    fn production_ws_url(&self) -> &'static str {
        urls::mexc::WS
    }

    fn rest_path(&self, kind: EndpointKind) -> Result<&'static str> {
        match kind {
            EndpointKind::Candles => Ok("/api/v3/klines"),
            EndpointKind::Ticker => Ok("/api/v3/ping"),
            EndpointKind::Orders => Ok("/api/v3/order"),
            EndpointKind::Account => Ok("/api/v3/account"),
        }
    }

    fn rest_params(&self, req: &CandlesRequest) -> Result<Vec<(String, String)>> {
        let mut params = vec![
            ("symbol".to_owned(), self.trading_pair_format(&req.pair)),
            (
                "interval".to_owned(),
                Self::rest_interval_token(req.interval).to_owned(),
            ),
        ];
        if let Some(start) = req.start_time {
            params.push(("startTime".to_owned(), (start * 1000).to_string()));
        }
        if let Some(end) = req.end_time {
            params.push(("endTime".to_owned(), (end * 1000).to_string()));
        }
        if let Some(limit) = req.limit {
            params.push(("limit".to_owned(), limit.to_string()));
        }
        Ok(params)
    }

    fn parse_rest_response(&self, raw: &Value) -> Result<Vec<CandleData>> {
        let rows = raw
            .as_array()
            .ok_or_else(|| FeedError::protocol("mexc klines response", raw))?;
        rows.iter().map(Self::parse_row).collect()
    }

    fn ws_subscription_payload(&self, pair: &TradingPair, interval: Interval) -> Result<Value> {
        let stream = format!(
            "spot@public.kline.v3.api@{}@{}",
            self.trading_pair_format(pair),
            Self::ws_interval_token(interval)
        );
        Ok(json!({ "method": "SUBSCRIPTION", "params": [stream] }))
    }

    fn parse_ws_message(&self, raw: &Value) -> Result<Vec<CandleData>> {
        let is_kline = raw
            .get("c")
            .and_then(Value::as_str)
            .is_some_and(|c| c.contains("public.kline"));
        if !is_kline {
            return Ok(Vec::new());
        }
        let k = raw
            .get("d")
            .and_then(|d| d.get("k"))
            .ok_or_else(|| FeedError::protocol("mexc kline push", raw))?;
        let field = |key: &str| {
            k.get(key)
                .ok_or_else(|| FeedError::protocol("mexc kline push", k))
        };
        let candle = CandleData::builder(
            int_field(field("t")?, "mexc push ts")?,
            decimal_field(field("o")?, "mexc push open")?,
            decimal_field(field("h")?, "mexc push high")?,
            decimal_field(field("l")?, "mexc push low")?,
            decimal_field(field("c")?, "mexc push close")?,
            decimal_field(field("v")?, "mexc push volume")?,
        )
        .quote_asset_volume(decimal_field(field("a")?, "mexc push quote volume")?)
        .build()?;
        Ok(vec![candle])
    }
}
