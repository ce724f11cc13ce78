//! Plugin reproducing the Kraken spot wire format.

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use crate::adapters::kraken::{asset_code, canonical_asset};
use crate::error::{FeedError, Result};
use crate::mock_server::plugin::{CandlesParams, ExchangePlugin, RestRequest, RestRoute};
use crate::types::{CandleData, Interval, TradingPair};

/// Kraken spot: `{error, result}` envelopes keyed by pair name with
/// ascending rows (timestamps as numbers, prices as strings), and the v1
/// WS protocol's array frames `[channelId, data, "ohlc-<minutes>", pair]`.
/// Intervals are minutes; Bitcoin is `XBT`.
#[derive(Debug, Default)]
pub struct KrakenSpotPlugin;

impl KrakenSpotPlugin {
    /// Create the plugin.
    pub fn new() -> Self {
        Self
    }

    fn rest_symbol(pair: &TradingPair) -> String {
        format!("{}{}", asset_code(pair.base()), asset_code(pair.quote()))
    }

    fn ohlc_row(candle: &CandleData) -> Value {
        json!([
            candle.timestamp,
            candle.open.to_string(),
            candle.high.to_string(),
            candle.low.to_string(),
            candle.close.to_string(),
            candle.close.to_string(),
            candle.volume.to_string(),
            candle.n_trades,
        ])
    }
}

impl ExchangePlugin for KrakenSpotPlugin {
    fn name(&self) -> &'static str {
        "kraken_spot"
    }

    fn rest_routes(&self) -> Vec<RestRoute> {
        vec![
            RestRoute {
                path: "/0/public/OHLC",
                method: Method::GET,
                handler: "candles",
            },
            RestRoute {
                path: "/0/public/SystemStatus",
                method: Method::GET,
                handler: "ping",
            },
        ]
    }

    /// The WS pair name (`XBT/USDT`); broadcasts key on this form.
    fn exchange_symbol(&self, pair: &TradingPair) -> String {
        format!("{}/{}", asset_code(pair.base()), asset_code(pair.quote()))
    }

    fn normalize_trading_pair(&self, exchange_form: &str) -> Result<TradingPair> {
        // WS form carries a slash; the REST form is concatenated codes.
        if let Some((base, quote)) = exchange_form.split_once('/') {
            return TradingPair::new(canonical_asset(base), canonical_asset(quote));
        }
        const QUOTES: [&str; 7] = ["USDT", "USDC", "USD", "EUR", "GBP", "XBT", "ETH"];
        let upper = exchange_form.to_ascii_uppercase();
        for quote in QUOTES {
            if let Some(base) = upper.strip_suffix(quote) {
                if !base.is_empty() {
                    return TradingPair::new(canonical_asset(base), canonical_asset(quote));
                }
            }
        }
        Err(FeedError::InvalidArgument(format!(
            "cannot split Kraken pair {exchange_form:?}"
        )))
    }

    fn interval_token(&self, interval: Interval) -> String {
        (interval.seconds() / 60).to_string()
    }

    fn interval_to_seconds(&self, token: &str) -> Result<u64> {
        token.parse::<u64>().map(|m| m * 60).map_err(|_| {
            FeedError::InvalidArgument(format!("unknown Kraken interval token: {token:?}"))
        })
    }

    fn format_rest_candles(
        &self,
        candles: &[CandleData],
        pair: &TradingPair,
        _interval: Interval,
    ) -> Value {
        let rows: Vec<Value> = candles.iter().map(Self::ohlc_row).collect();
        let last = candles.last().map(|c| c.timestamp).unwrap_or_default();
        let mut result = serde_json::Map::new();
        result.insert(Self::rest_symbol(pair), Value::Array(rows));
        result.insert("last".to_owned(), json!(last));
        json!({ "error": [], "result": result })
    }

    fn format_ws_candle_message(
        &self,
        candle: &CandleData,
        pair: &TradingPair,
        interval: Interval,
        _is_final: bool,
    ) -> Value {
        let width = interval.seconds() as i64;
        json!([
            42,
            [
                format!("{}.000000", candle.timestamp),
                format!("{}.000000", candle.timestamp + width),
                candle.open.to_string(),
                candle.high.to_string(),
                candle.low.to_string(),
                candle.close.to_string(),
                candle.close.to_string(),
                candle.volume.to_string(),
                candle.n_trades,
            ],
            format!("ohlc-{}", self.interval_token(interval)),
            self.exchange_symbol(pair),
        ])
    }

    fn parse_rest_candles_params(&self, request: &RestRequest) -> Result<CandlesParams> {
        let interval = request.query_param("interval").unwrap_or("1").to_owned();
        let width = self.interval_to_seconds(&interval)? as i64;
        // `since` is exclusive; the adapter steps one interval back, so
        // step forward to recover the inclusive start.
        let start_time = request.query_i64("since")?.map(|since| since + width);
        Ok(CandlesParams {
            symbol: request.query_param("pair").unwrap_or_default().to_owned(),
            interval,
            start_time,
            end_time: None,
            limit: None,
        })
    }

    fn parse_ws_subscription(&self, message: &Value) -> Vec<(String, String)> {
        if message.get("event").and_then(Value::as_str) != Some("subscribe") {
            return Vec::new();
        }
        let subscription = message.get("subscription");
        if subscription
            .and_then(|s| s.get("name"))
            .and_then(Value::as_str)
            != Some("ohlc")
        {
            return Vec::new();
        }
        let interval = subscription
            .and_then(|s| s.get("interval"))
            .and_then(Value::as_i64)
            .unwrap_or(1);
        message
            .get("pair")
            .and_then(Value::as_array)
            .map(|pairs| {
                pairs
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|p| (p.to_owned(), interval.to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn ws_subscription_ack(&self, _message: &Value, subs: &[(String, String)]) -> Option<Value> {
        subs.first().map(|(pair, interval)| {
            json!({
                "channelID": 42,
                "channelName": format!("ohlc-{interval}"),
                "event": "subscriptionStatus",
                "pair": pair,
                "status": "subscribed",
                "subscription": { "interval": interval.parse::<i64>().unwrap_or(1), "name": "ohlc" },
            })
        })
    }

    fn ws_error_reply(&self, reason: &str) -> Value {
        json!({
            "event": "subscriptionStatus",
            "status": "error",
            "errorMessage": reason,
        })
    }

    fn rest_error_body(&self, status: StatusCode, _reason: &str) -> Value {
        let code = match status {
            StatusCode::TOO_MANY_REQUESTS => "EGeneral:Too many requests",
            StatusCode::BAD_REQUEST => "EQuery:Unknown asset pair",
            _ => "EService:Internal error",
        };
        json!({ "error": [code] })
    }

    fn ping_body(&self) -> Value {
        json!({
            "error": [],
            "result": { "status": "online", "timestamp": "1970-01-01T00:00:00Z" },
        })
    }
}
