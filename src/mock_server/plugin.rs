//! The per-exchange mock-server plugin contract.
//!
//! One plugin exists per supported (exchange, market) pair, mirroring that
//! exchange's adapter: where the adapter parses the exchange's wire format
//! into canonical candles, the plugin formats canonical candles back into
//! the wire format, bit-exactly. The pair behaves as a bijection and the
//! test suite round-trips every adapter against its plugin.

use std::collections::HashMap;

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use crate::error::{FeedError, Result};
use crate::types::{CandleData, Interval, TradingPair};

/// One REST route exposed by a plugin.
#[derive(Debug, Clone)]
pub struct RestRoute {
    /// Axum-style path, e.g. `/api/v3/klines` or
    /// `/api/v3/brokerage/market/products/{product_id}/candles`.
    pub path: &'static str,
    /// HTTP method.
    pub method: Method,
    /// Handler name, resolved on the plugin at request time.
    pub handler: &'static str,
}

/// One WebSocket route exposed by a plugin.
#[derive(Debug, Clone)]
pub struct WsRoute {
    /// URL path, e.g. `/ws`.
    pub path: &'static str,
    /// Handler name.
    pub handler: &'static str,
}

/// A decoded REST request handed to plugin parsers.
#[derive(Debug, Clone, Default)]
pub struct RestRequest {
    /// The request path.
    pub path: String,
    /// Decoded query-string parameters.
    pub query: HashMap<String, String>,
    /// Captured path parameters.
    pub path_params: HashMap<String, String>,
    /// Decoded JSON body, for exchanges that query candles over POST.
    pub body: Option<Value>,
}

impl RestRequest {
    /// A query parameter by name.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// A query parameter parsed as an integer.
    pub fn query_i64(&self, name: &str) -> Result<Option<i64>> {
        match self.query.get(name) {
            None => Ok(None),
            Some(raw) => raw.parse::<i64>().map(Some).map_err(|_| {
                FeedError::InvalidArgument(format!("query param {name}={raw:?} is not an integer"))
            }),
        }
    }
}

/// Canonical candle-request arguments decoded from a plugin-specific
/// query string: times in seconds, symbol and interval still in the
/// exchange's own notation.
#[derive(Debug, Clone)]
pub struct CandlesParams {
    /// Symbol in exchange notation.
    pub symbol: String,
    /// Interval token in exchange notation.
    pub interval: String,
    /// Inclusive window start, seconds.
    pub start_time: Option<i64>,
    /// Inclusive window end, seconds.
    pub end_time: Option<i64>,
    /// Maximum number of candles.
    pub limit: Option<usize>,
}

/// The per-exchange wire-format plugin.
///
/// Formatting and parsing methods are synchronous and pure; the server
/// owns all I/O and state.
pub trait ExchangePlugin: Send + Sync {
    /// The plugin's registry name (matches the adapter's exchange name).
    fn name(&self) -> &'static str;

    /// REST route table.
    fn rest_routes(&self) -> Vec<RestRoute>;

    /// WebSocket route table.
    fn ws_routes(&self) -> Vec<WsRoute> {
        vec![WsRoute {
            path: "/ws",
            handler: "ws",
        }]
    }

    /// Canonical pair → exchange-native symbol.
    fn exchange_symbol(&self, pair: &TradingPair) -> String;

    /// Exchange-native symbol → canonical pair, used for the server's
    /// internal store key.
    fn normalize_trading_pair(&self, exchange_form: &str) -> Result<TradingPair>;

    /// Canonical interval → exchange-native token.
    fn interval_token(&self, interval: Interval) -> String;

    /// Exchange-native interval token → seconds. The default accepts the
    /// canonical tokens; plugins override it for exchange-specific
    /// aliases (e.g. OKX `1H`, Bybit `60`).
    fn interval_to_seconds(&self, token: &str) -> Result<u64> {
        token.parse::<Interval>().map(|i| i.seconds())
    }

    /// Exchange-native interval token → canonical interval.
    fn interval_from_token(&self, token: &str) -> Result<Interval> {
        let seconds = self.interval_to_seconds(token)?;
        Interval::from_seconds(seconds).ok_or_else(|| {
            FeedError::InvalidArgument(format!("interval token {token:?} has no canonical width"))
        })
    }

    /// Shape ascending canonical candles into the exchange's REST
    /// response, including its timestamp unit, field order, and string/
    /// number encoding.
    fn format_rest_candles(
        &self,
        candles: &[CandleData],
        pair: &TradingPair,
        interval: Interval,
    ) -> Value;

    /// Shape one candle into the exchange's WS push message.
    fn format_ws_candle_message(
        &self,
        candle: &CandleData,
        pair: &TradingPair,
        interval: Interval,
        is_final: bool,
    ) -> Value;

    /// Decode the exchange-specific candle query into canonical params.
    fn parse_rest_candles_params(&self, request: &RestRequest) -> Result<CandlesParams>;

    /// Decode a WS subscribe message into `(symbol, interval-token)`
    /// pairs. Unrecognized messages yield an empty list (the server then
    /// sends an error reply).
    fn parse_ws_subscription(&self, message: &Value) -> Vec<(String, String)>;

    /// The ack to send after a successful subscription, if the exchange
    /// sends one.
    fn ws_subscription_ack(&self, message: &Value, subs: &[(String, String)]) -> Option<Value>;

    /// The reply for an unrecognized WS message.
    fn ws_error_reply(&self, reason: &str) -> Value {
        json!({ "error": reason })
    }

    /// The exchange-appropriate REST error body (400s, 429s, 5xx).
    fn rest_error_body(&self, status: StatusCode, reason: &str) -> Value {
        json!({ "code": status.as_u16(), "msg": reason })
    }

    /// Body of the health/ping endpoint.
    fn ping_body(&self) -> Value {
        json!({})
    }

    /// Serve a plugin-specific route beyond candles and ping. `None`
    /// becomes a 404.
    fn extra_rest(&self, _handler: &str, _request: &RestRequest) -> Option<Value> {
        None
    }

    /// The key WS broadcasts are multiplexed on.
    fn create_ws_subscription_key(&self, symbol: &str, interval_token: &str) -> String {
        format!("{symbol}_{interval_token}")
    }
}

/// Split a concatenated symbol like `BTCUSDT` into a canonical pair by
/// matching known quote-asset suffixes, longest first.
pub(crate) fn split_concatenated_symbol(symbol: &str) -> Result<TradingPair> {
    const QUOTES: [&str; 10] = [
        "USDT", "USDC", "TUSD", "BUSD", "USD", "EUR", "GBP", "BTC", "ETH", "BNB",
    ];
    let upper = symbol.to_ascii_uppercase();
    for quote in QUOTES {
        if let Some(base) = upper.strip_suffix(quote) {
            if !base.is_empty() {
                return TradingPair::new(base, quote);
            }
        }
    }
    Err(FeedError::InvalidArgument(format!(
        "cannot split symbol {symbol:?} into base and quote"
    )))
}
