//! Plugin reproducing the KuCoin spot wire format.

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use crate::adapters::kucoin::KucoinSpotAdapter;
use crate::error::{FeedError, Result};
use crate::mock_server::plugin::{CandlesParams, ExchangePlugin, RestRequest, RestRoute};
use crate::types::{CandleData, Interval, TradingPair};

/// KuCoin spot: `{"code":"200000","data":[…]}` envelopes with newest-first
/// string arrays in *open-close-high-low* order and second timestamps;
/// `/market/candles:<symbol>_<type>` WS topics. Intervals are word tokens
/// (`1min`, `1hour`, `1day`).
#[derive(Debug, Default)]
pub struct KucoinSpotPlugin;

impl KucoinSpotPlugin {
    /// Create the plugin.
    pub fn new() -> Self {
        Self
    }

    fn candle_row(candle: &CandleData) -> Value {
        json!([
            candle.timestamp.to_string(),
            candle.open.to_string(),
            candle.close.to_string(),
            candle.high.to_string(),
            candle.low.to_string(),
            candle.volume.to_string(),
            candle.quote_asset_volume.to_string(),
        ])
    }
}

impl ExchangePlugin for KucoinSpotPlugin {
    fn name(&self) -> &'static str {
        "kucoin_spot"
    }

    fn rest_routes(&self) -> Vec<RestRoute> {
        vec![
            RestRoute {
                path: "/api/v1/market/candles",
                method: Method::GET,
                handler: "candles",
            },
            RestRoute {
                path: "/api/v1/timestamp",
                method: Method::GET,
                handler: "ping",
            },
        ]
    }

    fn exchange_symbol(&self, pair: &TradingPair) -> String {
        pair.to_string()
    }

    fn normalize_trading_pair(&self, exchange_form: &str) -> Result<TradingPair> {
        exchange_form.parse()
    }

    fn interval_token(&self, interval: Interval) -> String {
        KucoinSpotAdapter::type_token(interval).to_owned()
    }

    fn interval_to_seconds(&self, token: &str) -> Result<u64> {
        Interval::ALL
            .iter()
            .find(|i| KucoinSpotAdapter::type_token(**i) == token)
            .map(|i| i.seconds())
            .ok_or_else(|| {
                FeedError::InvalidArgument(format!("unknown KuCoin type token: {token:?}"))
            })
    }

    fn format_rest_candles(
        &self,
        candles: &[CandleData],
        _pair: &TradingPair,
        _interval: Interval,
    ) -> Value {
        let rows: Vec<Value> = candles.iter().rev().map(Self::candle_row).collect();
        json!({ "code": "200000", "data": rows })
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
            "type": "message",
            "topic": format!("/market/candles:{symbol}_{token}"),
            "subject": "trade.candles.update",
            "data": {
                "symbol": symbol,
                "candles": Self::candle_row(candle),
                "time": candle.timestamp * 1_000_000_000,
            },
        })
    }

    fn parse_rest_candles_params(&self, request: &RestRequest) -> Result<CandlesParams> {
        Ok(CandlesParams {
            symbol: request.query_param("symbol").unwrap_or_default().to_owned(),
            interval: request.query_param("type").unwrap_or_default().to_owned(),
            start_time: request.query_i64("startAt")?,
            end_time: request.query_i64("endAt")?,
            limit: None,
        })
    }

    fn parse_ws_subscription(&self, message: &Value) -> Vec<(String, String)> {
        if message.get("type").and_then(Value::as_str) != Some("subscribe") {
            return Vec::new();
        }
        let Some(topic) = message.get("topic").and_then(Value::as_str) else {
            return Vec::new();
        };
        let Some(series) = topic.strip_prefix("/market/candles:") else {
            return Vec::new();
        };
        series.rsplit_once('_')
            .map(|(symbol, token)| vec![(symbol.to_owned(), token.to_owned())])
            .unwrap_or_default()
    }

    fn ws_subscription_ack(&self, message: &Value, _subs: &[(String, String)]) -> Option<Value> {
        Some(json!({
            "id": message.get("id").cloned().unwrap_or(json!(1)),
            "type": "ack",
        }))
    }

    fn rest_error_body(&self, status: StatusCode, reason: &str) -> Value {
        let code = match status {
            StatusCode::TOO_MANY_REQUESTS => "429000",
            StatusCode::BAD_REQUEST => "400100",
            _ => "500000",
        };
        json!({ "code": code, "msg": reason })
    }

    fn ping_body(&self) -> Value {
        json!({ "code": "200000", "data": 0 })
    }
}
