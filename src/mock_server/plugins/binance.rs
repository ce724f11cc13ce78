//! Plugin reproducing the Binance spot wire format.

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use crate::error::Result;
use crate::mock_server::plugin::{
    CandlesParams, ExchangePlugin, RestRequest, RestRoute, split_concatenated_symbol,
};
use crate::types::{CandleData, Interval, TradingPair};

/// Binance spot: `GET /api/v3/klines` arrays with millisecond timestamps
/// as numbers, prices as strings, and a trailing ignore field; WS kline
/// events under `{"e":"kline","k":{…}}`.
#[derive(Debug, Default)]
pub struct BinanceSpotPlugin;

impl BinanceSpotPlugin {
    /// Create the plugin.
    pub fn new() -> Self {
        Self
    }

    fn kline_row(candle: &CandleData, interval: Interval) -> Value {
        let close_time = (candle.timestamp + interval.seconds() as i64) * 1000 - 1;
        json!([
            candle.timestamp_ms(),
            candle.open.to_string(),
            candle.high.to_string(),
            candle.low.to_string(),
            candle.close.to_string(),
            candle.volume.to_string(),
            close_time,
            candle.quote_asset_volume.to_string(),
            candle.n_trades,
            candle.taker_buy_base_volume.to_string(),
            candle.taker_buy_quote_volume.to_string(),
            "0",
        ])
    }
}

impl ExchangePlugin for BinanceSpotPlugin {
    fn name(&self) -> &'static str {
        "binance_spot"
    }

    fn rest_routes(&self) -> Vec<RestRoute> {
        vec![
            RestRoute {
                path: "/api/v3/klines",
                method: Method::GET,
                handler: "candles",
            },
            RestRoute {
                path: "/api/v3/ping",
                method: Method::GET,
                handler: "ping",
            },
            RestRoute {
                path: "/api/v3/exchangeInfo",
                method: Method::GET,
                handler: "exchange_info",
            },
        ]
    }

    fn exchange_symbol(&self, pair: &TradingPair) -> String {
        format!("{}{}", pair.base(), pair.quote())
    }

    fn normalize_trading_pair(&self, exchange_form: &str) -> Result<TradingPair> {
        split_concatenated_symbol(exchange_form)
    }

    fn interval_token(&self, interval: Interval) -> String {
        interval.as_str().to_owned()
    }

    fn format_rest_candles(
        &self,
        candles: &[CandleData],
        _pair: &TradingPair,
        interval: Interval,
    ) -> Value {
        Value::Array(
            candles
                .iter()
                .map(|c| Self::kline_row(c, interval))
                .collect(),
        )
    }

    fn format_ws_candle_message(
        &self,
        candle: &CandleData,
        pair: &TradingPair,
        interval: Interval,
        is_final: bool,
    ) -> Value {
        let symbol = self.exchange_symbol(pair);
        let close_time = (candle.timestamp + interval.seconds() as i64) * 1000 - 1;
        json!({
            "e": "kline",
            "E": candle.timestamp_ms(),
            "s": symbol,
            "k": {
                "t": candle.timestamp_ms(),
                "T": close_time,
                "s": symbol,
                "i": interval.as_str(),
                "f": 0,
                "L": 0,
                "o": candle.open.to_string(),
                "c": candle.close.to_string(),
                "h": candle.high.to_string(),
                "l": candle.low.to_string(),
                "v": candle.volume.to_string(),
                "n": candle.n_trades,
                "x": is_final,
                "q": candle.quote_asset_volume.to_string(),
                "V": candle.taker_buy_base_volume.to_string(),
                "Q": candle.taker_buy_quote_volume.to_string(),
                "B": "0",
            },
        })
    }

    fn parse_rest_candles_params(&self, request: &RestRequest) -> Result<CandlesParams> {
        Ok(CandlesParams {
            symbol: request.query_param("symbol").unwrap_or_default().to_owned(),
            interval: request
                .query_param("interval")
                .unwrap_or_default()
                .to_owned(),
            start_time: request.query_i64("startTime")?.map(|ms| ms / 1000),
            end_time: request.query_i64("endTime")?.map(|ms| ms / 1000),
            limit: request.query_i64("limit")?.map(|n| n.max(0) as usize),
        })
    }

    fn parse_ws_subscription(&self, message: &Value) -> Vec<(String, String)> {
        if message.get("method").and_then(Value::as_str) != Some("SUBSCRIBE") {
            return Vec::new();
        }
        let Some(params) = message.get("params").and_then(Value::as_array) else {
            return Vec::new();
        };
        params
            .iter()
            .filter_map(Value::as_str)
            .filter_map(|stream| {
                let (symbol, token) = stream.split_once("@kline_")?;
                Some((symbol.to_ascii_uppercase(), token.to_owned()))
            })
            .collect()
    }

    fn ws_subscription_ack(&self, message: &Value, _subs: &[(String, String)]) -> Option<Value> {
        Some(json!({
            "result": Value::Null,
            "id": message.get("id").cloned().unwrap_or(json!(1)),
        }))
    }

    fn rest_error_body(&self, status: StatusCode, reason: &str) -> Value {
        let code = match status {
            StatusCode::TOO_MANY_REQUESTS => -1003,
            StatusCode::BAD_REQUEST => -1121,
            _ => -1000,
        };
        json!({ "code": code, "msg": reason })
    }

    fn extra_rest(&self, handler: &str, _request: &RestRequest) -> Option<Value> {
        match handler {
            "exchange_info" => Some(json!({
                "timezone": "UTC",
                "serverTime": 0,
                "rateLimits": [],
                "symbols": [],
            })),
            _ => None,
        }
    }
}
