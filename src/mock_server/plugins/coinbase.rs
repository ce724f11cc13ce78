//! Plugin reproducing the Coinbase Advanced Trade wire format.

use axum::http::{Method, StatusCode};
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};

use crate::adapters::coinbase::CoinbaseAdvancedTradeAdapter;
use crate::error::{FeedError, Result};
use crate::mock_server::plugin::{CandlesParams, ExchangePlugin, RestRequest, RestRoute};
use crate::types::{CandleData, Interval, TradingPair};

/// Coinbase Advanced Trade: candle objects with second timestamps as
/// strings, newest first, under `{"candles":[…]}`; the product id rides
/// in the URL path; granularity is a word token. The WS `candles`
/// channel pushes batched `events[].candles[]`.
#[derive(Debug, Default)]
pub struct CoinbaseAdvancedTradePlugin;

impl CoinbaseAdvancedTradePlugin {
    /// Create the plugin.
    pub fn new() -> Self {
        Self
    }

    fn candle_object(candle: &CandleData, product_id: Option<&str>) -> Value {
        let mut obj = json!({
            "start": candle.timestamp.to_string(),
            "low": candle.low.to_string(),
            "high": candle.high.to_string(),
            "open": candle.open.to_string(),
            "close": candle.close.to_string(),
            "volume": candle.volume.to_string(),
        });
        if let Some(product_id) = product_id {
            obj["product_id"] = json!(product_id);
        }
        obj
    }
}

impl ExchangePlugin for CoinbaseAdvancedTradePlugin {
    fn name(&self) -> &'static str {
        "coinbase_advanced_trade"
    }

    fn rest_routes(&self) -> Vec<RestRoute> {
        vec![
            RestRoute {
                path: "/api/v3/brokerage/market/products/{product_id}/candles",
                method: Method::GET,
                handler: "candles",
            },
            RestRoute {
                path: "/api/v3/brokerage/time",
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
        CoinbaseAdvancedTradeAdapter::granularity_token(interval).to_owned()
    }

    fn interval_to_seconds(&self, token: &str) -> Result<u64> {
        match token {
            "ONE_MINUTE" => Ok(60),
            "FIVE_MINUTE" => Ok(300),
            "FIFTEEN_MINUTE" => Ok(900),
            "THIRTY_MINUTE" => Ok(1800),
            "ONE_HOUR" => Ok(3600),
            "TWO_HOUR" => Ok(7200),
            "SIX_HOUR" => Ok(21_600),
            "ONE_DAY" => Ok(86_400),
            _ => Err(FeedError::InvalidArgument(format!(
                "unknown Coinbase granularity: {token:?}"
            ))),
        }
    }

    fn format_rest_candles(
        &self,
        candles: &[CandleData],
        _pair: &TradingPair,
        _interval: Interval,
    ) -> Value {
        let rows: Vec<Value> = candles
            .iter()
            .rev()
            .map(|c| Self::candle_object(c, None))
            .collect();
        json!({ "candles": rows })
    }

    fn format_ws_candle_message(
        &self,
        candle: &CandleData,
        pair: &TradingPair,
        _interval: Interval,
        _is_final: bool,
    ) -> Value {
        let iso = Utc
            .timestamp_opt(candle.timestamp, 0)
            .single()
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default();
        json!({
            "channel": "candles",
            "client_id": "",
            "timestamp": iso,
            "sequence_num": 0,
            "events": [{
                "type": "update",
                "candles": [Self::candle_object(candle, Some(&self.exchange_symbol(pair)))],
            }],
        })
    }

    fn parse_rest_candles_params(&self, request: &RestRequest) -> Result<CandlesParams> {
        let product_id = request
            .path_params
            .get("product_id")
            .cloned()
            .unwrap_or_default();
        Ok(CandlesParams {
            symbol: product_id,
            interval: request
                .query_param("granularity")
                .unwrap_or_default()
                .to_owned(),
            start_time: request.query_i64("start")?,
            end_time: request.query_i64("end")?,
            limit: request.query_i64("limit")?.map(|n| n.max(0) as usize),
        })
    }

    fn parse_ws_subscription(&self, message: &Value) -> Vec<(String, String)> {
        let is_candles_sub = message.get("type").and_then(Value::as_str) == Some("subscribe")
            && message.get("channel").and_then(Value::as_str) == Some("candles");
        if !is_candles_sub {
            return Vec::new();
        }
        message
            .get("product_ids")
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_str)
                    .map(|id| (id.to_owned(), "FIVE_MINUTE".to_owned()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn ws_subscription_ack(&self, _message: &Value, subs: &[(String, String)]) -> Option<Value> {
        let products: Vec<&str> = subs.iter().map(|(p, _)| p.as_str()).collect();
        Some(json!({
            "channel": "subscriptions",
            "client_id": "",
            "timestamp": "",
            "sequence_num": 0,
            "events": [{ "subscriptions": { "candles": products } }],
        }))
    }

    fn rest_error_body(&self, status: StatusCode, reason: &str) -> Value {
        let code = match status {
            StatusCode::TOO_MANY_REQUESTS => "RATE_LIMIT_EXCEEDED",
            StatusCode::BAD_REQUEST => "INVALID_ARGUMENT",
            _ => "INTERNAL",
        };
        json!({ "error": code, "error_details": reason, "message": reason })
    }

    fn ping_body(&self) -> Value {
        json!({ "iso": "1970-01-01T00:00:00Z", "epochSeconds": "0", "epochMillis": "0" })
    }
}
