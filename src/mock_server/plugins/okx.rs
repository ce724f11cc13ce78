//! Plugin reproducing the OKX spot wire format.

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use crate::adapters::okx::OkxSpotAdapter;
use crate::error::{FeedError, Result};
use crate::mock_server::plugin::{
    CandlesParams, ExchangePlugin, RestRequest, RestRoute,
};
use crate::types::{CandleData, Interval, TradingPair};

/// OKX spot: `{code, msg, data}` envelopes whose candle rows are
/// newest-first string arrays with millisecond timestamps, and
/// `candle<bar>` WS channels. Accepts OKX's uppercase bar aliases
/// (`1H`, `1D`, `1W`).
#[derive(Debug, Default)]
pub struct OkxSpotPlugin;

impl OkxSpotPlugin {
    /// Create the plugin.
    pub fn new() -> Self {
        Self
    }

    fn candle_row(candle: &CandleData) -> Value {
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

impl ExchangePlugin for OkxSpotPlugin {
    fn name(&self) -> &'static str {
        "okx_spot"
    }

    fn rest_routes(&self) -> Vec<RestRoute> {
        vec![
            RestRoute {
                path: "/api/v5/market/candles",
                method: Method::GET,
                handler: "candles",
            },
            RestRoute {
                path: "/api/v5/public/time",
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
        OkxSpotAdapter::bar_token(interval).to_owned()
    }

    fn interval_to_seconds(&self, token: &str) -> Result<u64> {
        Interval::ALL
            .iter()
            .find(|i| OkxSpotAdapter::bar_token(**i) == token)
            .map(|i| i.seconds())
            .or_else(|| token.parse::<Interval>().ok().map(|i| i.seconds()))
            .ok_or_else(|| {
                FeedError::InvalidArgument(format!("unknown OKX bar token: {token:?}"))
            })
    }

    fn format_rest_candles(
        &self,
        candles: &[CandleData],
        _pair: &TradingPair,
        _interval: Interval,
    ) -> Value {
        let rows: Vec<Value> = candles.iter().rev().map(Self::candle_row).collect();
        json!({ "code": "0", "msg": "", "data": rows })
    }

    fn format_ws_candle_message(
        &self,
        candle: &CandleData,
        pair: &TradingPair,
        interval: Interval,
        is_final: bool,
    ) -> Value {
        json!({
            "arg": {
                "channel": format!("candle{}", self.interval_token(interval)),
                "instId": self.exchange_symbol(pair),
            },
            "data": [[
                candle.timestamp_ms().to_string(),
                candle.open.to_string(),
                candle.high.to_string(),
                candle.low.to_string(),
                candle.close.to_string(),
                candle.volume.to_string(),
                candle.quote_asset_volume.to_string(),
                candle.quote_asset_volume.to_string(),
                if is_final { "1" } else { "0" },
            ]],
        })
    }

    fn parse_rest_candles_params(&self, request: &RestRequest) -> Result<CandlesParams> {
        // OKX paginates with exclusive millisecond bounds; invert the
        // adapter's mapping.
        let end_time = request.query_i64("after")?.map(|after| (after - 1) / 1000);
        let start_time = request.query_i64("before")?.map(|before| (before + 1) / 1000);
        Ok(CandlesParams {
            symbol: request.query_param("instId").unwrap_or_default().to_owned(),
            interval: request.query_param("bar").unwrap_or_default().to_owned(),
            start_time,
            end_time,
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
            .filter_map(|arg| {
                let channel = arg.get("channel")?.as_str()?;
                let inst_id = arg.get("instId")?.as_str()?;
                let token = channel.strip_prefix("candle")?;
                Some((inst_id.to_owned(), token.to_owned()))
            })
            .collect()
    }

    fn ws_subscription_ack(&self, _message: &Value, subs: &[(String, String)]) -> Option<Value> {
        subs.first().map(|(symbol, token)| {
            json!({
                "event": "subscribe",
                "arg": {
                    "channel": format!("candle{token}"),
                    "instId": symbol,
                },
                "connId": "mock",
            })
        })
    }

    fn rest_error_body(&self, status: StatusCode, reason: &str) -> Value {
        let code = match status {
            StatusCode::TOO_MANY_REQUESTS => "50011",
            StatusCode::BAD_REQUEST => "51000",
            _ => "50000",
        };
        json!({ "code": code, "msg": reason, "data": [] })
    }

    fn ping_body(&self) -> Value {
        json!({ "code": "0", "msg": "", "data": [{ "ts": "0" }] })
    }
}
