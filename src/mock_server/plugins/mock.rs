//! Plugin for the canonical-format mock exchange.

use axum::http::Method;
use serde_json::{Value, json};

use crate::error::Result;
use crate::mock_server::plugin::{
    CandlesParams, ExchangePlugin, RestRequest, RestRoute, WsRoute,
};
use crate::types::{CandleData, Interval, TradingPair};

/// Serves the crate's canonical wire format directly.
#[derive(Debug, Default)]
pub struct MockPlugin;

impl MockPlugin {
    /// Create the plugin.
    pub fn new() -> Self {
        Self
    }
}

impl ExchangePlugin for MockPlugin {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn rest_routes(&self) -> Vec<RestRoute> {
        vec![
            RestRoute {
                path: "/api/candles",
                method: Method::GET,
                handler: "candles",
            },
            RestRoute {
                path: "/api/ping",
                method: Method::GET,
                handler: "ping",
            },
        ]
    }

    fn ws_routes(&self) -> Vec<WsRoute> {
        vec![WsRoute {
            path: "/ws",
            handler: "ws",
        }]
    }

    fn exchange_symbol(&self, pair: &TradingPair) -> String {
        pair.to_string()
    }

    fn normalize_trading_pair(&self, exchange_form: &str) -> Result<TradingPair> {
        exchange_form.parse()
    }

    fn interval_token(&self, interval: Interval) -> String {
        interval.as_str().to_owned()
    }

    fn format_rest_candles(
        &self,
        candles: &[CandleData],
        _pair: &TradingPair,
        _interval: Interval,
    ) -> Value {
        json!({ "candles": candles })
    }

    fn format_ws_candle_message(
        &self,
        candle: &CandleData,
        pair: &TradingPair,
        interval: Interval,
        is_final: bool,
    ) -> Value {
        json!({
            "type": "candle",
            "symbol": self.exchange_symbol(pair),
            "interval": interval.as_str(),
            "is_final": is_final,
            "data": candle,
        })
    }

    fn parse_rest_candles_params(&self, request: &RestRequest) -> Result<CandlesParams> {
        Ok(CandlesParams {
            symbol: request.query_param("symbol").unwrap_or_default().to_owned(),
            interval: request
                .query_param("interval")
                .unwrap_or_default()
                .to_owned(),
            start_time: request.query_i64("start_time")?,
            end_time: request.query_i64("end_time")?,
            limit: request.query_i64("limit")?.map(|n| n.max(0) as usize),
        })
    }

    fn parse_ws_subscription(&self, message: &Value) -> Vec<(String, String)> {
        if message.get("op").and_then(Value::as_str) != Some("subscribe") {
            return Vec::new();
        }
        match (
            message.get("symbol").and_then(Value::as_str),
            message.get("interval").and_then(Value::as_str),
        ) {
            (Some(symbol), Some(interval)) => vec![(symbol.to_owned(), interval.to_owned())],
            _ => Vec::new(),
        }
    }

    fn ws_subscription_ack(&self, _message: &Value, subs: &[(String, String)]) -> Option<Value> {
        subs.first().map(|(symbol, interval)| {
            json!({
                "op": "subscribe",
                "success": true,
                "symbol": symbol,
                "interval": interval,
            })
        })
    }
}
