//! Hyperliquid adapter.
//!
//! REST shape: everything rides on `POST /info` with a typed JSON body;
//! candle snapshots use `{"type":"candleSnapshot","req":{coin, interval,
//! startTime, endTime}}` (millisecond bounds) and return an ascending
//! array of candle objects with string prices: `{"t":open_ms,"T":close_ms,
//! "s":coin,"i":interval,"o","c","h","l","v","n":trades}`. WS shape: a
//! `candle` subscription pushing the same object under
//! `{"channel":"candle","data":{…}}`. Markets are keyed by bare coin
//! (`BTC`), quoted in USD.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::adapters::{AdapterCore, ExchangeAdapter, decimal_field, int_field};
use crate::constants::urls;
use crate::error::{FeedError, Result};
use crate::network::{EndpointKind, NetworkClient, NetworkConfig};
use crate::types::{CandleData, CandlesRequest, Interval, TradingPair};

/// The intervals Hyperliquid serves.
const INTERVALS: [Interval; 14] = [
    Interval::OneMinute,
    Interval::ThreeMinutes,
    Interval::FiveMinutes,
    Interval::FifteenMinutes,
    Interval::ThirtyMinutes,
    Interval::OneHour,
    Interval::TwoHours,
    Interval::FourHours,
    Interval::EightHours,
    Interval::TwelveHours,
    Interval::OneDay,
    Interval::ThreeDays,
    Interval::OneWeek,
    Interval::OneMonth,
];

/// Adapter for Hyperliquid markets. Async-only I/O.
pub struct HyperliquidAdapter {
    core: AdapterCore,
}

impl HyperliquidAdapter {
    /// Create the adapter.
    pub fn new(network_config: Option<NetworkConfig>) -> Self {
        Self {
            core: AdapterCore::new(network_config),
        }
    }

    /// The `POST /info` body for a candle snapshot.
    pub fn info_request_body(&self, req: &CandlesRequest) -> Value {
        let mut body = json!({
            "type": "candleSnapshot",
            "req": {
                "coin": self.trading_pair_format(&req.pair),
                "interval": req.interval.as_str(),
            },
        });
        if let Some(start) = req.start_time {
            body["req"]["startTime"] = json!(start * 1000);
        }
        if let Some(end) = req.end_time {
            body["req"]["endTime"] = json!(end * 1000);
        }
        body
    }

    /// Parse one candle object.
    fn parse_candle(obj: &Value) -> Result<CandleData> {
        let field = |key: &str| {
            obj.get(key)
                .ok_or_else(|| FeedError::protocol("hyperliquid candle object", obj))
        };
        CandleData::builder(
            int_field(field("t")?, "hyperliquid candle t")?,
            decimal_field(field("o")?, "hyperliquid open")?,
            decimal_field(field("h")?, "hyperliquid high")?,
            decimal_field(field("l")?, "hyperliquid low")?,
            decimal_field(field("c")?, "hyperliquid close")?,
            decimal_field(field("v")?, "hyperliquid volume")?,
        )
        .n_trades(int_field(field("n")?, "hyperliquid trades")?.max(0) as u64)
        .build()
    }

    /// Apply the limit the snapshot endpoint cannot express.
    fn finalize(mut candles: Vec<CandleData>, req: &CandlesRequest) -> Vec<CandleData> {
        if let Some(limit) = req.limit {
            if candles.len() > limit {
                candles.drain(..candles.len() - limit);
            }
        }
        candles
    }
}

#[async_trait]
impl ExchangeAdapter for HyperliquidAdapter {
    fn name(&self) -> &'static str {
        "hyperliquid"
    }

    fn core(&self) -> &AdapterCore {
        &self.core
    }

    fn intervals(&self) -> &'static [Interval] {
        &INTERVALS
    }

    /// Hyperliquid keys markets by bare coin; the quote is implicit USD.
    fn trading_pair_format(&self, pair: &TradingPair) -> String {
        pair.base().to_owned()
    }

    fn production_rest_base(&self) -> &'static str {
        urls::hyperliquid::REST
    }

    fn production_ws_url(&self) -> &'static str {
        urls::hyperliquid::WS
    }

    fn rest_path(&self, kind: EndpointKind) -> Result<&'static str> {
        match kind {
            EndpointKind::Candles | EndpointKind::Ticker => Ok("/info"),
            EndpointKind::Orders | EndpointKind::Account => Ok("/exchange"),
        }
    }

    /// Candle arguments ride in the POST body, not the query string.
    fn rest_params(&self, _req: &CandlesRequest) -> Result<Vec<(String, String)>> {
        Ok(Vec::new())
    }

    fn parse_rest_response(&self, raw: &Value) -> Result<Vec<CandleData>> {
        let rows = raw
            .as_array()
            .ok_or_else(|| FeedError::protocol("hyperliquid snapshot response", raw))?;
        rows.iter().map(Self::parse_candle).collect()
    }

    fn ws_subscription_payload(&self, pair: &TradingPair, interval: Interval) -> Result<Value> {
        Ok(json!({
            "method": "subscribe",
            "subscription": {
                "type": "candle",
                "coin": self.trading_pair_format(pair),
                "interval": interval.as_str(),
            },
        }))
    }

    fn parse_ws_message(&self, raw: &Value) -> Result<Vec<CandleData>> {
        if raw.get("channel").and_then(Value::as_str) != Some("candle") {
            return Ok(Vec::new());
        }
        let data = raw
            .get("data")
            .ok_or_else(|| FeedError::protocol("hyperliquid candle push", raw))?;
        Ok(vec![Self::parse_candle(data)?])
    }

    async fn fetch_rest_candles(
        &self,
        req: &CandlesRequest,
        client: &NetworkClient,
    ) -> Result<Vec<CandleData>> {
        self.check_interval(req.interval)?;
        let url = self.candles_url(&req.pair)?;
        let body = self.info_request_body(req);
        let raw = client.post_rest_data(&url, &[], &body).await?;
        Ok(Self::finalize(self.parse_rest_response(&raw)?, req))
    }
}
