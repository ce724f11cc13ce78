//! Plugin reproducing the Gate.io spot wire format.

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use crate::adapters::gateio::GateIoSpotAdapter;
use crate::error::{FeedError, Result};
use crate::mock_server::plugin::{CandlesParams, ExchangePlugin, RestRequest, RestRoute};
use crate::types::{CandleData, Interval, TradingPair};

/// Gate.io spot: bare ascending candlestick arrays with the quote volume
/// second and the open after the high and low, second timestamps as
/// strings, and the `spot.candlesticks` WS channel. Pairs are
/// underscore-joined; week and month bars are `7d` and `30d`.
#[derive(Debug, Default)]
pub struct GateIoSpotPlugin;

impl GateIoSpotPlugin {
    /// Create the plugin.
    pub fn new() -> Self {
        Self
    }

    fn candle_row(candle: &CandleData, is_final: bool) -> Value {
        json!([
            candle.timestamp.to_string(),
            candle.quote_asset_volume.to_string(),
            candle.close.to_string(),
            candle.high.to_string(),
            candle.low.to_string(),
            candle.open.to_string(),
            candle.volume.to_string(),
            if is_final { "true" } else { "false" },
        ])
    }
}

impl ExchangePlugin for GateIoSpotPlugin {
    fn name(&self) -> &'static str {
        "gateio_spot"
    }

    fn rest_routes(&self) -> Vec<RestRoute> {
        vec![
            RestRoute {
                path: "/api/v4/spot/candlesticks",
                method: Method::GET,
                handler: "candles",
            },
            RestRoute {
                path: "/api/v4/spot/time",
                method: Method::GET,
                handler: "ping",
            },
        ]
    }

    fn exchange_symbol(&self, pair: &TradingPair) -> String {
        format!("{}_{}", pair.base(), pair.quote())
    }

    fn normalize_trading_pair(&self, exchange_form: &str) -> Result<TradingPair> {
        let (base, quote) = exchange_form.split_once('_').ok_or_else(|| {
            FeedError::InvalidArgument(format!(
                "cannot split Gate.io pair {exchange_form:?}"
            ))
        })?;
        TradingPair::new(base, quote)
    }

    fn interval_token(&self, interval: Interval) -> String {
        GateIoSpotAdapter::interval_token(interval).to_owned()
    }

    fn interval_to_seconds(&self, token: &str) -> Result<u64> {
        Interval::ALL
            .iter()
            .find(|i| GateIoSpotAdapter::interval_token(**i) == token)
            .map(|i| i.seconds())
            .ok_or_else(|| {
                FeedError::InvalidArgument(format!("unknown Gate.io interval token: {token:?}"))
            })
    }

    fn format_rest_candles(
        &self,
        candles: &[CandleData],
        _pair: &TradingPair,
        _interval: Interval,
    ) -> Value {
        Value::Array(
            candles
                .iter()
                .map(|c| Self::candle_row(c, true))
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
        json!({
            "time": candle.timestamp,
            "channel": "spot.candlesticks",
            "event": "update",
            "result": {
                "t": candle.timestamp.to_string(),
                "v": candle.quote_asset_volume.to_string(),
                "c": candle.close.to_string(),
                "h": candle.high.to_string(),
                "l": candle.low.to_string(),
                "o": candle.open.to_string(),
                "n": format!(
                    "{}_{}",
                    self.interval_token(interval),
                    self.exchange_symbol(pair)
                ),
                "a": candle.volume.to_string(),
                "w": is_final,
            },
        })
    }

    fn parse_rest_candles_params(&self, request: &RestRequest) -> Result<CandlesParams> {
        Ok(CandlesParams {
            symbol: request
                .query_param("currency_pair")
                .unwrap_or_default()
                .to_owned(),
            interval: request
                .query_param("interval")
                .unwrap_or_default()
                .to_owned(),
            start_time: request.query_i64("from")?,
            end_time: request.query_i64("to")?,
            limit: request.query_i64("limit")?.map(|n| n.max(0) as usize),
        })
    }

    fn parse_ws_subscription(&self, message: &Value) -> Vec<(String, String)> {
        let is_subscribe = message.get("channel").and_then(Value::as_str)
            == Some("spot.candlesticks")
            && message.get("event").and_then(Value::as_str) == Some("subscribe");
        if !is_subscribe {
            return Vec::new();
        }
        let Some(payload) = message.get("payload").and_then(Value::as_array) else {
            return Vec::new();
        };
        match (
            payload.first().and_then(Value::as_str),
            payload.get(1).and_then(Value::as_str),
        ) {
            (Some(token), Some(symbol)) => vec![(symbol.to_owned(), token.to_owned())],
            _ => Vec::new(),
        }
    }

    fn ws_subscription_ack(&self, message: &Value, _subs: &[(String, String)]) -> Option<Value> {
        Some(json!({
            "time": message.get("time").cloned().unwrap_or(json!(0)),
            "channel": "spot.candlesticks",
            "event": "subscribe",
            "result": { "status": "success" },
        }))
    }

    fn rest_error_body(&self, status: StatusCode, reason: &str) -> Value {
        let label = match status {
            StatusCode::TOO_MANY_REQUESTS => "TOO_MANY_REQUESTS",
            StatusCode::BAD_REQUEST => "INVALID_PARAM_VALUE",
            _ => "INTERNAL",
        };
        json!({ "label": label, "message": reason })
    }

    fn ping_body(&self) -> Value {
        json!({ "server_time": 0 })
    }
}
