//! Plugin reproducing the AscendEX spot wire format.

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use crate::adapters::ascendex::AscendexSpotAdapter;
use crate::error::{FeedError, Result};
use crate::mock_server::plugin::{CandlesParams, ExchangePlugin, RestRequest, RestRoute};
use crate::types::{CandleData, Interval, TradingPair};

/// AscendEX spot: `{code, data}` envelopes whose ascending entries wrap
/// each bar in a `{"m":"bar","s":…,"data":{…}}` record with millisecond
/// timestamps and string prices; `bar:<interval>:<symbol>` WS channels
/// push the same records. Pairs are slash-joined; minute intervals are
/// bare numbers and the lowercase `1m` token is the month bar.
#[derive(Debug, Default)]
pub struct AscendexSpotPlugin;

impl AscendexSpotPlugin {
    /// Create the plugin.
    pub fn new() -> Self {
        Self
    }

    fn bar_record(candle: &CandleData, symbol: &str, interval: Interval) -> Value {
        json!({
            "m": "bar",
            "s": symbol,
            "data": {
                "i": AscendexSpotAdapter::interval_token(interval),
                "ts": candle.timestamp_ms(),
                "o": candle.open.to_string(),
                "c": candle.close.to_string(),
                "h": candle.high.to_string(),
                "l": candle.low.to_string(),
                "v": candle.volume.to_string(),
            },
        })
    }
}

impl ExchangePlugin for AscendexSpotPlugin {
    fn name(&self) -> &'static str {
        "ascendex_spot"
    }

    fn rest_routes(&self) -> Vec<RestRoute> {
        vec![
            RestRoute {
                path: "/api/pro/v1/barhist",
                method: Method::GET,
                handler: "candles",
            },
            RestRoute {
                path: "/api/pro/v1/assets",
                method: Method::GET,
                handler: "ping",
            },
        ]
    }

    fn exchange_symbol(&self, pair: &TradingPair) -> String {
        format!("{}/{}", pair.base(), pair.quote())
    }

    fn normalize_trading_pair(&self, exchange_form: &str) -> Result<TradingPair> {
        let (base, quote) = exchange_form.split_once('/').ok_or_else(|| {
            FeedError::InvalidArgument(format!(
                "cannot split AscendEX pair {exchange_form:?}"
            ))
        })?;
        TradingPair::new(base, quote)
    }

    fn interval_token(&self, interval: Interval) -> String {
        AscendexSpotAdapter::interval_token(interval)
    }

    fn interval_to_seconds(&self, token: &str) -> Result<u64> {
        match token {
            "1d" => Ok(86_400),
            "1w" => Ok(604_800),
            "1m" => Ok(2_592_000),
            minutes => minutes.parse::<u64>().map(|m| m * 60).map_err(|_| {
                FeedError::InvalidArgument(format!(
                    "unknown AscendEX interval token: {token:?}"
                ))
            }),
        }
    }

    fn format_rest_candles(
        &self,
        candles: &[CandleData],
        pair: &TradingPair,
        interval: Interval,
    ) -> Value {
        let symbol = self.exchange_symbol(pair);
        let rows: Vec<Value> = candles
            .iter()
            .map(|c| Self::bar_record(c, &symbol, interval))
            .collect();
        json!({ "code": 0, "data": rows })
    }

    fn format_ws_candle_message(
        &self,
        candle: &CandleData,
        pair: &TradingPair,
        interval: Interval,
        _is_final: bool,
    ) -> Value {
        Self::bar_record(candle, &self.exchange_symbol(pair), interval)
    }

    fn parse_rest_candles_params(&self, request: &RestRequest) -> Result<CandlesParams> {
        Ok(CandlesParams {
            symbol: request.query_param("symbol").unwrap_or_default().to_owned(),
            interval: request
                .query_param("interval")
                .unwrap_or_default()
                .to_owned(),
            start_time: request.query_i64("from")?.map(|ms| ms / 1000),
            end_time: request.query_i64("to")?.map(|ms| ms / 1000),
            limit: request.query_i64("n")?.map(|n| n.max(0) as usize),
        })
    }

    fn parse_ws_subscription(&self, message: &Value) -> Vec<(String, String)> {
        if message.get("op").and_then(Value::as_str) != Some("sub") {
            return Vec::new();
        }
        let Some(channel) = message.get("ch").and_then(Value::as_str) else {
            return Vec::new();
        };
        let Some(rest) = channel.strip_prefix("bar:") else {
            return Vec::new();
        };
        rest.split_once(':')
            .map(|(token, symbol)| vec![(symbol.to_owned(), token.to_owned())])
            .unwrap_or_default()
    }

    fn ws_subscription_ack(&self, message: &Value, _subs: &[(String, String)]) -> Option<Value> {
        Some(json!({
            "m": "sub",
            "id": "",
            "ch": message.get("ch").cloned().unwrap_or(json!("")),
            "code": 0,
        }))
    }

    fn rest_error_body(&self, status: StatusCode, reason: &str) -> Value {
        let code = match status {
            StatusCode::TOO_MANY_REQUESTS => 100_050,
            StatusCode::BAD_REQUEST => 100_001,
            _ => 100_000,
        };
        json!({ "code": code, "reason": "API_ERROR", "message": reason })
    }

    fn ping_body(&self) -> Value {
        json!({ "code": 0, "data": [] })
    }
}
