//! Plugin reproducing the MEXC spot wire format.

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use crate::adapters::mexc::MexcSpotAdapter;
use crate::error::{FeedError, Result};
use crate::mock_server::plugin::{
    CandlesParams, ExchangePlugin, RestRequest, RestRoute, split_concatenated_symbol,
};
use crate::types::{CandleData, Interval, TradingPair};

/// MEXC spot: Binance-like ascending 8-element kline arrays over REST
/// (`60m` hour bar, `1W` week bar), and `spot@public.kline.v3.api` WS
/// channels with word interval tokens (`Min1`, `Hour4`, `Day1`) pushing
/// kline objects under `d.k` with second timestamps.
#[derive(Debug, Default)]
pub struct MexcSpotPlugin;

impl MexcSpotPlugin {
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
        ])
    }
}

impl ExchangePlugin for MexcSpotPlugin {
    fn name(&self) -> &'static str {
        "mexc_spot"
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
        ]
    }

    fn exchange_symbol(&self, pair: &TradingPair) -> String {
        format!("{}{}", pair.base(), pair.quote())
    }

    fn normalize_trading_pair(&self, exchange_form: &str) -> Result<TradingPair> {
        split_concatenated_symbol(exchange_form)
    }

    /// The WS token; it is what subscription keys are built from.
    fn interval_token(&self, interval: Interval) -> String {
        MexcSpotAdapter::ws_interval_token(interval).to_owned()
    }

    /// Accepts both the REST tokens (`1m`, `60m`, `1W`) and the WS tokens
    /// (`Min1`, `Hour4`).
    fn interval_to_seconds(&self, token: &str) -> Result<u64> {
        Interval::ALL
            .iter()
            .find(|i| {
                MexcSpotAdapter::rest_interval_token(**i) == token
                    || MexcSpotAdapter::ws_interval_token(**i) == token
            })
            .map(|i| i.seconds())
            .ok_or_else(|| {
                FeedError::InvalidArgument(format!("unknown MEXC interval token: {token:?}"))
            })
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
        _is_final: bool,
    ) -> Value {
        let symbol = self.exchange_symbol(pair);
        let token = self.interval_token(interval);
        json!({
            "c": format!("spot@public.kline.v3.api@{symbol}@{token}"),
            "d": {
                "e": "spot@public.kline.v3.api",
                "k": {
                    "t": candle.timestamp,
                    "o": candle.open.to_string(),
                    "c": candle.close.to_string(),
                    "h": candle.high.to_string(),
                    "l": candle.low.to_string(),
                    "v": candle.volume.to_string(),
                    "a": candle.quote_asset_volume.to_string(),
                    "T": candle.timestamp + interval.seconds() as i64,
                    "i": token,
                },
            },
            "s": symbol,
            "t": candle.timestamp_ms(),
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
        if message.get("method").and_then(Value::as_str) != Some("SUBSCRIPTION") {
            return Vec::new();
        }
        let Some(params) = message.get("params").and_then(Value::as_array) else {
            return Vec::new();
        };
        params
            .iter()
            .filter_map(Value::as_str)
            .filter_map(|stream| {
                let mut parts = stream.split('@');
                let channel = parts.next()?;
                let api = parts.next()?;
                let symbol = parts.next()?;
                let token = parts.next()?;
                if channel != "spot" || !api.contains("kline") {
                    return None;
                }
                Some((symbol.to_owned(), token.to_owned()))
            })
            .collect()
    }

    fn ws_subscription_ack(&self, message: &Value, _subs: &[(String, String)]) -> Option<Value> {
        let msg = message
            .get("params")
            .and_then(Value::as_array)
            .and_then(|p| p.first())
            .cloned()
            .unwrap_or(json!(""));
        Some(json!({ "id": 0, "code": 0, "msg": msg }))
    }

    fn rest_error_body(&self, status: StatusCode, reason: &str) -> Value {
        let code = match status {
            StatusCode::TOO_MANY_REQUESTS => 429,
            StatusCode::BAD_REQUEST => -1121,
            _ => -1000,
        };
        json!({ "code": code, "msg": reason })
    }
}
