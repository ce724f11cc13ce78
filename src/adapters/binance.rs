//! Binance spot adapter.
//!
//! REST shape: `GET /api/v3/klines` returning an array of 12-element kline
//! arrays with millisecond open/close times and decimal-string prices.
//! WS shape: `<symbol>@kline_<interval>` streams pushing `{"e":"kline",
//! "k":{…}}` events. Binance's interval tokens coincide with the canonical
//! set, and a separate spot testnet exists at `testnet.binance.vision`.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::adapters::{AdapterCore, ExchangeAdapter, IoCapability, decimal_field, int_field};
use crate::constants::urls;
use crate::error::{FeedError, Result};
use crate::network::{BlockingNetworkClient, EndpointKind, NetworkConfig};
use crate::types::{CandleData, CandlesRequest, Interval, TradingPair};

/// Adapter for Binance spot markets. Hybrid I/O with testnet support.
pub struct BinanceSpotAdapter {
    core: AdapterCore,
}

impl BinanceSpotAdapter {
    /// Create the adapter.
    pub fn new(network_config: Option<NetworkConfig>) -> Self {
        Self {
            core: AdapterCore::new(network_config),
        }
    }

    /// Parse one 12-element kline array.
    fn parse_kline_row(row: &Value) -> Result<CandleData> {
        let fields = row
            .as_array()
            .filter(|f| f.len() >= 11)
            .ok_or_else(|| FeedError::protocol("binance kline row", row))?;
        CandleData::builder(
            int_field(&fields[0], "binance open time")?,
            decimal_field(&fields[1], "binance open")?,
            decimal_field(&fields[2], "binance high")?,
            decimal_field(&fields[3], "binance low")?,
            decimal_field(&fields[4], "binance close")?,
            decimal_field(&fields[5], "binance volume")?,
        )
        .quote_asset_volume(decimal_field(&fields[7], "binance quote volume")?)
        .n_trades(int_field(&fields[8], "binance trades")?.max(0) as u64)
        .taker_buy_base_volume(decimal_field(&fields[9], "binance taker base")?)
        .taker_buy_quote_volume(decimal_field(&fields[10], "binance taker quote")?)
        .build()
    }
}

#[async_trait]
impl ExchangeAdapter for BinanceSpotAdapter {
    fn name(&self) -> &'static str {
        "binance_spot"
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
        format!("{}{}", pair.base(), pair.quote())
    }

    fn production_rest_base(&self) -> &'static str {
        urls::binance::REST
    }

    fn testnet_rest_base(&self) -> Option<&'static str> {
        Some(urls::binance::REST_TESTNET)
    }

    fn production_ws_url(&self) -> &'static str {
        urls::binance::WS
    }

    fn testnet_ws_url(&self) -> Option<&'static str> {
        Some(urls::binance::WS_TESTNET)
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
            ("interval".to_owned(), req.interval.as_str().to_owned()),
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
            .ok_or_else(|| FeedError::protocol("binance klines response", raw))?;
        rows.iter().map(Self::parse_kline_row).collect()
    }

    fn ws_subscription_payload(&self, pair: &TradingPair, interval: Interval) -> Result<Value> {
        let stream = format!(
            "{}@kline_{}",
            self.trading_pair_format(pair).to_lowercase(),
            interval.as_str()
        );
        Ok(json!({
            "method": "SUBSCRIBE",
            "params": [stream],
            "id": 1,
        }))
    }

    fn parse_ws_message(&self, raw: &Value) -> Result<Vec<CandleData>> {
        // Subscription acks and keepalives carry no "e" field.
        if raw.get("e").and_then(Value::as_str) != Some("kline") {
            return Ok(Vec::new());
        }
        let k = raw
            .get("k")
            .ok_or_else(|| FeedError::protocol("binance kline event", raw))?;
        let field = |key: &str| {
            k.get(key)
                .ok_or_else(|| FeedError::protocol("binance kline event", k))
        };
        let candle = CandleData::builder(
            int_field(field("t")?, "binance kline open time")?,
            decimal_field(field("o")?, "binance kline open")?,
            decimal_field(field("h")?, "binance kline high")?,
            decimal_field(field("l")?, "binance kline low")?,
            decimal_field(field("c")?, "binance kline close")?,
            decimal_field(field("v")?, "binance kline volume")?,
        )
        .quote_asset_volume(decimal_field(field("q")?, "binance kline quote volume")?)
        .n_trades(int_field(field("n")?, "binance kline trades")?.max(0) as u64)
        .taker_buy_base_volume(decimal_field(field("V")?, "binance kline taker base")?)
        .taker_buy_quote_volume(decimal_field(field("Q")?, "binance kline taker quote")?)
        .build()?;
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
