//! Plugin reproducing the Bybit spot (v5) wire format.

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use crate::adapters::bybit::BybitSpotAdapter;
use crate::error::{FeedError, Result};
use crate::mock_server::plugin::{
    CandlesParams, ExchangePlugin, RestRequest, RestRoute, split_concatenated_symbol,
};
use crate::types::{CandleData, Interval, TradingPair};

/// Bybit v5: `{retCode, retMsg, result}` envelopes with newest-first
/// string-array klines, `kline.<interval>.<symbol>` WS topics pushing
/// object rows. Interval tokens are bare minutes plus `D`/`W`/`M`.
#[derive(Debug, Default)]
pub struct BybitSpotPlugin;

impl BybitSpotPlugin {
    /// Create the plugin.
    pub fn new() -> Self {
        Self
    }

    fn kline_row(candle: &CandleData) -> Value {
        json!([
            candle.timestamp_ms().to_string(),
            candle.open.to_string(),
            candle.high.to_string(),
            candle.low.to_string(),
            candle.close.to_string(),
            candle.volume.to_string(),
            candle.quote_asset_volume.to_string(),
        ])
    }
}

impl ExchangePlugin for BybitSpotPlugin {
    fn name(&self) -> &'static str {
        "bybit_spot"
    }

    fn rest_routes(&self) -> Vec<RestRoute> {
        vec![
            RestRoute {
                path: "/v5/market/kline",
                method: Method::GET,
                handler: "candles",
            },
            RestRoute {
                path: "/v5/market/time",
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

    fn interval_token(&self, interval: Interval) -> String {
        BybitSpotAdapter::interval_token(interval)
    }

    fn interval_to_seconds(&self, token: &str) -> Result<u64> {
        match token {
            "D" => Ok(86_400),
            "W" => Ok(604_800),
            "M" => Ok(2_592_000),
            minutes => minutes
                .parse::<u64>()
                .map(|m| m * 60)
                .map_err(|_| {
                    FeedError::InvalidArgument(format!("unknown Bybit interval token: {token:?}"))
                }),
        }
    }

    fn format_rest_candles(
        &self,
        candles: &[CandleData],
        pair: &TradingPair,
        _interval: Interval,
    ) -> Value {
        let rows: Vec<Value> = candles.iter().rev().map(Self::kline_row).collect();
        json!({
            "retCode": 0,
            "retMsg": "OK",
            "result": {
                "category": "spot",
                "symbol": self.exchange_symbol(pair),
                "list": rows,
            },
            "retExtInfo": {},
            "time": 0,
        })
    }

    fn format_ws_candle_message(
        &self,
        candle: &CandleData,
        pair: &TradingPair,
        interval: Interval,
        is_final: bool,
    ) -> Value {
        let token = self.interval_token(interval);
        let end = (candle.timestamp + interval.seconds() as i64) * 1000 - 1;
        json!({
            "topic": format!("kline.{}.{}", token, self.exchange_symbol(pair)),
            "type": "snapshot",
            "ts": candle.timestamp_ms(),
            "data": [{
                "start": candle.timestamp_ms(),
                "end": end,
                "interval": token,
                "open": candle.open.to_string(),
                "close": candle.close.to_string(),
                "high": candle.high.to_string(),
                "low": candle.low.to_string(),
                "volume": candle.volume.to_string(),
                "turnover": candle.quote_asset_volume.to_string(),
                "confirm": is_final,
                "timestamp": candle.timestamp_ms(),
            }],
        })
    }

    fn parse_rest_candles_params(&self, request: &RestRequest) -> Result<CandlesParams> {
        Ok(CandlesParams {
            symbol: request.query_param("symbol").unwrap_or_default().to_owned(),
            interval: request
                .query_param("interval")
                .unwrap_or_default()
                .to_owned(),
            start_time: request.query_i64("start")?.map(|ms| ms / 1000),
            end_time: request.query_i64("end")?.map(|ms| ms / 1000),
            limit: request.query_i64("limit")?.map(|n| n.max(0) as usize),
        })
    }

    fn parse_ws_subscription(&self, message: &Value) -> Vec<(String, String)> {
        if message.get("op").and_then(Value::as_str) != Some("subscribe") {
            return Vec::new();
        }
        let Some(args) = message.get("args").and_then(Value::as_array) else {
            return Vec::new();
        };
        args.iter()
            .filter_map(Value::as_str)
            .filter_map(|topic| {
                let rest = topic.strip_prefix("kline.")?;
                let (token, symbol) = rest.split_once('.')?;
                Some((symbol.to_owned(), token.to_owned()))
            })
            .collect()
    }

    fn ws_subscription_ack(&self, _message: &Value, _subs: &[(String, String)]) -> Option<Value> {
        Some(json!({
            "op": "subscribe",
            "success": true,
            "conn_id": "mock",
            "ret_msg": "subscribe",
        }))
    }

    fn rest_error_body(&self, status: StatusCode, reason: &str) -> Value {
        let code = match status {
            StatusCode::TOO_MANY_REQUESTS => 10_006,
            StatusCode::BAD_REQUEST => 10_001,
            _ => 10_000,
        };
        json!({ "retCode": code, "retMsg": reason, "result": {}, "retExtInfo": {}, "time": 0 })
    }

    fn ping_body(&self) -> Value {
        json!({
            "retCode": 0,
            "retMsg": "OK",
            "result": { "timeSecond": "0", "timeNano": "0" },
            "retExtInfo": {},
            "time": 0,
        })
    }
}
