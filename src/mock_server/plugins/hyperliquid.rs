//! Plugin reproducing the Hyperliquid wire format.

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use crate::error::{FeedError, Result};
use crate::mock_server::plugin::{CandlesParams, ExchangePlugin, RestRequest, RestRoute};
use crate::types::{CandleData, Interval, TradingPair};

/// Hyperliquid: candle snapshots are queried with `POST /info` and a
/// `{"type":"candleSnapshot","req":{…}}` body (millisecond bounds) and
/// answered with an ascending array of candle objects with string prices;
/// the WS `candle` channel pushes the same object shape. Markets are
/// keyed by bare coin, quoted in USD.
#[derive(Debug, Default)]
pub struct HyperliquidPlugin;

impl HyperliquidPlugin {
    /// Create the plugin.
    pub fn new() -> Self {
        Self
    }

    fn candle_object(candle: &CandleData, coin: &str, interval: Interval) -> Value {
        json!({
            "t": candle.timestamp_ms(),
            "T": (candle.timestamp + interval.seconds() as i64) * 1000 - 1,
            "s": coin,
            "i": interval.as_str(),
            "o": candle.open.to_string(),
            "c": candle.close.to_string(),
            "h": candle.high.to_string(),
            "l": candle.low.to_string(),
            "v": candle.volume.to_string(),
            "n": candle.n_trades,
        })
    }
}

impl ExchangePlugin for HyperliquidPlugin {
    fn name(&self) -> &'static str {
        "hyperliquid"
    }

    fn rest_routes(&self) -> Vec<RestRoute> {
        vec![
            RestRoute {
                path: "/info",
                method: Method::POST,
                handler: "candles",
            },
            RestRoute {
                path: "/info",
                method: Method::GET,
                handler: "ping",
            },
        ]
    }

    fn exchange_symbol(&self, pair: &TradingPair) -> String {
        pair.base().to_owned()
    }

    fn normalize_trading_pair(&self, exchange_form: &str) -> Result<TradingPair> {
        TradingPair::new(exchange_form, "USD")
    }

    fn interval_token(&self, interval: Interval) -> String {
        interval.as_str().to_owned()
    }

    fn format_rest_candles(
        &self,
        candles: &[CandleData],
        pair: &TradingPair,
        interval: Interval,
    ) -> Value {
        let coin = self.exchange_symbol(pair);
        Value::Array(
            candles
                .iter()
                .map(|c| Self::candle_object(c, &coin, interval))
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
        json!({
            "channel": "candle",
            "data": Self::candle_object(candle, &self.exchange_symbol(pair), interval),
        })
    }

    fn parse_rest_candles_params(&self, request: &RestRequest) -> Result<CandlesParams> {
        let body = request.body.as_ref().ok_or_else(|| {
            FeedError::InvalidArgument("candleSnapshot requires a JSON body".to_owned())
        })?;
        if body.get("type").and_then(Value::as_str) != Some("candleSnapshot") {
            return Err(FeedError::InvalidArgument(
                "unsupported info request type".to_owned(),
            ));
        }
        let req = body
            .get("req")
            .ok_or_else(|| FeedError::InvalidArgument("missing req object".to_owned()))?;
        Ok(CandlesParams {
            symbol: req
                .get("coin")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
            interval: req
                .get("interval")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
            start_time: req
                .get("startTime")
                .and_then(Value::as_i64)
                .map(|ms| ms / 1000),
            end_time: req
                .get("endTime")
                .and_then(Value::as_i64)
                .map(|ms| ms / 1000),
            limit: None,
        })
    }

    fn parse_ws_subscription(&self, message: &Value) -> Vec<(String, String)> {
        if message.get("method").and_then(Value::as_str) != Some("subscribe") {
            return Vec::new();
        }
        let Some(subscription) = message.get("subscription") else {
            return Vec::new();
        };
        if subscription.get("type").and_then(Value::as_str) != Some("candle") {
            return Vec::new();
        }
        match (
            subscription.get("coin").and_then(Value::as_str),
            subscription.get("interval").and_then(Value::as_str),
        ) {
            (Some(coin), Some(token)) => vec![(coin.to_owned(), token.to_owned())],
            _ => Vec::new(),
        }
    }

    fn ws_subscription_ack(&self, message: &Value, _subs: &[(String, String)]) -> Option<Value> {
        Some(json!({
            "channel": "subscriptionResponse",
            "data": {
                "method": "subscribe",
                "subscription": message.get("subscription").cloned().unwrap_or(json!({})),
            },
        }))
    }

    fn rest_error_body(&self, _status: StatusCode, reason: &str) -> Value {
        json!({ "error": reason })
    }
}
