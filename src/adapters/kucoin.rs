//! KuCoin spot adapter.
//!
//! REST shape: `GET /api/v1/market/candles` with a `{"code":"200000",
//! "data":[…]}` envelope whose rows are newest-first string arrays with
//! *open-close-high-low* field order and second timestamps. WS shape:
//! `/market/candles:<symbol>_<type>` topics. KuCoin writes intervals as
//! word tokens (`1min`, `1hour`, `1day`, `1week`).

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::adapters::{AdapterCore, ExchangeAdapter, decimal_field, int_field};
use crate::constants::urls;
use crate::error::{FeedError, Result};
use crate::network::{EndpointKind, NetworkConfig};
use crate::types::{CandleData, CandlesRequest, Interval, TradingPair};

/// The intervals KuCoin serves.
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
    Interval::EightHours,
    Interval::TwelveHours,
    Interval::OneDay,
    Interval::OneWeek,
];

/// Adapter for KuCoin spot markets. Async-only I/O.
pub struct KucoinSpotAdapter {
    core: AdapterCore,
}

impl KucoinSpotAdapter {
    /// Create the adapter.
    pub fn new(network_config: Option<NetworkConfig>) -> Self {
        Self {
            core: AdapterCore::new(network_config),
        }
    }

    /// The KuCoin type token for a canonical interval.
    pub fn type_token(interval: Interval) -> &'static str {
        match interval {
            Interval::OneMinute => "1min",
            Interval::ThreeMinutes => "3min",
            Interval::FiveMinutes => "5min",
            Interval::FifteenMinutes => "15min",
            Interval::ThirtyMinutes => "30min",
            Interval::OneHour => "1hour",
            Interval::TwoHours => "2hour",
            Interval::FourHours => "4hour",
            Interval::SixHours => "6hour",
            Interval::EightHours => "8hour",
            Interval::TwelveHours => "12hour",
            Interval::OneDay => "1day",
            _ => "1week",
        }
    }

    /// Parse one candle row: `[ts, open, close, high, low, volume,
    /// turnover]` — note the o,c,h,l order.
    fn parse_row(row: &Value) -> Result<CandleData> {
        let fields = row
            .as_array()
            .filter(|f| f.len() >= 7)
            .ok_or_else(|| FeedError::protocol("kucoin candle row", row))?;
        CandleData::builder(
            int_field(&fields[0], "kucoin candle ts")?,
            decimal_field(&fields[1], "kucoin open")?,
            decimal_field(&fields[3], "kucoin high")?,
            decimal_field(&fields[4], "kucoin low")?,
            decimal_field(&fields[2], "kucoin close")?,
            decimal_field(&fields[5], "kucoin volume")?,
        )
        .quote_asset_volume(decimal_field(&fields[6], "kucoin turnover")?)
        .build()
    }
}

#[async_trait]
impl ExchangeAdapter for KucoinSpotAdapter {
    fn name(&self) -> &'static str {
        "kucoin_spot"
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
        urls::kucoin::REST
    }

    fn production_ws_url(&self) -> &'static str {
        urls::kucoin::WS
    }

    fn rest_path(&self, kind: EndpointKind) -> Result<&'static str> {
        match kind {
            EndpointKind::Candles => Ok("/api/v1/market/candles"),
            EndpointKind::Ticker => Ok("/api/v1/timestamp"),
            EndpointKind::Orders => Ok("/api/v1/orders"),
            EndpointKind::Account => Ok("/api/v1/accounts"),
        }
    }

    fn rest_params(&self, req: &CandlesRequest) -> Result<Vec<(String, String)>> {
        let mut params = vec![
            ("symbol".to_owned(), self.trading_pair_format(&req.pair)),
            ("type".to_owned(), Self::type_token(req.interval).to_owned()),
        ];
        if let Some(start) = req.start_time {
            params.push(("startAt".to_owned(), start.to_string()));
        }
        if let Some(end) = req.end_time {
            params.push(("endAt".to_owned(), end.to_string()));
        }
        Ok(params)
    }

    fn parse_rest_response(&self, raw: &Value) -> Result<Vec<CandleData>> {
        if raw.get("code").and_then(Value::as_str) != Some("200000") {
            return Err(FeedError::protocol("kucoin response code", raw));
        }
        let rows = raw
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| FeedError::protocol("kucoin candles data", raw))?;
        let mut candles = rows
            .iter()
            .map(Self::parse_row)
            .collect::<Result<Vec<_>>>()?;
        candles.reverse();
        Ok(candles)
    }

    fn ws_subscription_payload(&self, pair: &TradingPair, interval: Interval) -> Result<Value> {
        Ok(json!({
            "id": 1,
            "type": "subscribe",
            "topic": format!(
                "/market/candles:{}_{}",
                self.trading_pair_format(pair),
                Self::type_token(interval)
            ),
            "privateChannel": false,
            "response": true,
        }))
    }

    fn parse_ws_message(&self, raw: &Value) -> Result<Vec<CandleData>> {
        let is_candle_update = raw.get("type").and_then(Value::as_str) == Some("message")
            && raw
                .get("topic")
                .and_then(Value::as_str)
                .is_some_and(|t| t.starts_with("/market/candles:"));
        if !is_candle_update {
            return Ok(Vec::new());
        }
        let row = raw
            .get("data")
            .and_then(|d| d.get("candles"))
            .ok_or_else(|| FeedError::protocol("kucoin ws candles", raw))?;
        Ok(vec![Self::parse_row(row)?])
    }
}
