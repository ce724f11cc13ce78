//! The canonical-format mock exchange adapter.
//!
//! Speaks the crate's canonical wire format directly (hyphenated pairs,
//! canonical interval tokens, candle objects with decimal-string prices and
//! second timestamps), so it exercises the full adapter surface with no
//! translation noise. Hybrid I/O: both fetch paths are genuine.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::adapters::{AdapterCore, ExchangeAdapter, IoCapability};
use crate::constants::urls;
use crate::error::{FeedError, Result};
use crate::network::{BlockingNetworkClient, EndpointKind, NetworkConfig};
use crate::types::{CandleData, CandlesRequest, Interval, TradingPair};

/// Adapter for the in-process mock exchange.
pub struct MockAdapter {
    core: AdapterCore,
}

impl MockAdapter {
    /// Create the adapter.
    pub fn new(network_config: Option<NetworkConfig>) -> Self {
        Self {
            core: AdapterCore::new(network_config),
        }
    }

    fn parse_candle_array(raw: &Value) -> Result<Vec<CandleData>> {
        let rows = raw
            .get("candles")
            .and_then(Value::as_array)
            .ok_or_else(|| FeedError::protocol("mock candles envelope", raw))?;
        let mut candles = Vec::with_capacity(rows.len());
        for row in rows {
            let candle: CandleData = serde_json::from_value(row.clone())
                .map_err(|_| FeedError::protocol("mock candle object", row))?;
            candle.validate()?;
            candles.push(candle);
        }
        Ok(candles)
    }
}

#[async_trait]
impl ExchangeAdapter for MockAdapter {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn core(&self) -> &AdapterCore {
        &self.core
    }

    fn io_capability(&self) -> IoCapability {
        IoCapability::Hybrid
    }

    fn intervals(&self) -> &'static [Interval] {
        &Interval::ALL
    }

    fn trading_pair_format(&self, pair: &TradingPair) -> String {
        pair.to_string()
    }

    fn production_rest_base(&self) -> &'static str {
        urls::mock::REST
    }

    fn production_ws_url(&self) -> &'static str {
        urls::mock::WS
    }

    fn rest_path(&self, kind: EndpointKind) -> Result<&'static str> {
        match kind {
            EndpointKind::Candles => Ok("/api/candles"),
            EndpointKind::Ticker => Ok("/api/ping"),
            EndpointKind::Orders | EndpointKind::Account => Err(FeedError::InvalidArgument(
                format!("mock exchange has no {kind:?} endpoint"),
            )),
        }
    }

    fn rest_params(&self, req: &CandlesRequest) -> Result<Vec<(String, String)>> {
        let mut params = vec![
            ("symbol".to_owned(), self.trading_pair_format(&req.pair)),
            ("interval".to_owned(), req.interval.as_str().to_owned()),
        ];
        if let Some(start) = req.start_time {
            params.push(("start_time".to_owned(), start.to_string()));
        }
        if let Some(end) = req.end_time {
            params.push(("end_time".to_owned(), end.to_string()));
        }
        if let Some(limit) = req.limit {
            params.push(("limit".to_owned(), limit.to_string()));
        }
        Ok(params)
    }

    fn parse_rest_response(&self, raw: &Value) -> Result<Vec<CandleData>> {
        Self::parse_candle_array(raw)
    }

    fn ws_subscription_payload(&self, pair: &TradingPair, interval: Interval) -> Result<Value> {
        Ok(json!({
            "op": "subscribe",
            "symbol": self.trading_pair_format(pair),
            "interval": interval.as_str(),
        }))
    }

    fn parse_ws_message(&self, raw: &Value) -> Result<Vec<CandleData>> {
        if raw.get("type").and_then(Value::as_str) != Some("candle") {
            return Ok(Vec::new());
        }
        let data = raw
            .get("data")
            .ok_or_else(|| FeedError::protocol("mock ws candle", raw))?;
        let candle: CandleData = serde_json::from_value(data.clone())
            .map_err(|_| FeedError::protocol("mock ws candle", data))?;
        candle.validate()?;
        Ok(vec![candle])
    }

    fn fetch_rest_candles_blocking(&self, req: &CandlesRequest) -> Result<Vec<CandleData>> {
        self.check_interval(req.interval)?;
        let url = self.candles_url(&req.pair)?;
        let params = self.rest_params(req)?;
        let raw = BlockingNetworkClient::new()?.get_rest_data(&url, &params)?;
        self.parse_rest_response(&raw)
    }
}
