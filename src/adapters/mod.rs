//! The exchange adapter contract and the built-in adapters.
//!
//! An adapter is bound to one exchange market (e.g. Binance spot) and
//! normalizes its REST endpoints, WebSocket subscription protocol, interval
//! encoding, symbol notation, and timestamp units behind one uniform
//! capability surface. The feed engine and the mock framework instantiate
//! every adapter identically: `Adapter::new(network_config)`, with the
//! [`NetworkClient`] supplied per call.
//!
//! ## Organization
//!
//! - [`registry`] — Process-wide name → adapter-factory map
//! - [`mock`] — The canonical-format in-process exchange
//! - [`binance`] — Binance spot (hybrid I/O, testnet)
//! - [`okx`] — OKX spot
//! - [`bybit`] — Bybit spot v5 (testnet)
//! - [`kraken`] — Kraken spot (sync-only I/O)
//! - [`coinbase`] — Coinbase Advanced Trade
//! - [`kucoin`] — KuCoin spot
//! - [`gateio`] — Gate.io spot
//! - [`mexc`] — MEXC spot
//! - [`hyperliquid`] — Hyperliquid
//! - [`ascendex`] — AscendEX spot

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::{FeedError, Result};
use crate::network::{BlockingNetworkClient, EndpointKind, NetworkClient, NetworkConfig};
use crate::types::{CandleData, CandlesRequest, Interval, TradingPair};

pub mod ascendex;
pub mod binance;
pub mod bybit;
pub mod coinbase;
pub mod gateio;
pub mod hyperliquid;
pub mod kraken;
pub mod kucoin;
pub mod mexc;
pub mod mock;
pub mod okx;
pub mod registry;

pub use registry::{available_exchanges, get_adapter_instance, register};

// ---------------------------------------------------------------------------
// I/O capability
// ---------------------------------------------------------------------------

/// The I/O surface an adapter genuinely implements.
///
/// The feed engine branches on this when selecting a collection strategy;
/// a synchronous call on an async-only adapter fails eagerly with
/// [`FeedError::Capability`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoCapability {
    /// Only the async fetch path is real; the blocking variant fails.
    AsyncOnly,
    /// The blocking path is real; async dispatches it on a worker thread.
    SyncOnly,
    /// Both paths are genuine.
    Hybrid,
}

impl IoCapability {
    /// Whether the async surface is genuine (not bridged through a worker
    /// thread). WebSocket streaming requires this.
    pub fn is_native_async(&self) -> bool {
        matches!(self, IoCapability::AsyncOnly | IoCapability::Hybrid)
    }

    /// Whether the blocking fetch variant is genuine.
    pub fn supports_blocking(&self) -> bool {
        matches!(self, IoCapability::SyncOnly | IoCapability::Hybrid)
    }
}

// ---------------------------------------------------------------------------
// URL patching & the shared adapter core
// ---------------------------------------------------------------------------

/// A test-time rebinding of an adapter's URLs onto a mock server.
#[derive(Debug, Clone)]
pub struct UrlPatch {
    /// Replacement REST base URL (scheme + authority, no trailing slash).
    pub rest_base: String,
    /// Replacement WebSocket URL.
    pub ws_url: String,
}

/// State every adapter embeds: the optional [`NetworkConfig`] and the
/// test-time URL patch.
///
/// Keeping these in one value is what makes adapter construction uniform —
/// `Adapter::new(network_config)` — for the registry and the mock
/// framework alike. An adapter without a config runs in production mode.
#[derive(Debug, Default)]
pub struct AdapterCore {
    network_config: Option<NetworkConfig>,
    url_patch: Mutex<Option<UrlPatch>>,
}

impl AdapterCore {
    /// Build the core from an optional network config.
    pub fn new(network_config: Option<NetworkConfig>) -> Self {
        Self {
            network_config,
            url_patch: Mutex::new(None),
        }
    }

    /// Whether the given endpoint kind routes to the testnet.
    pub fn is_testnet_for(&self, kind: EndpointKind) -> bool {
        self.network_config
            .as_ref()
            .is_some_and(|c| c.is_testnet_for(kind))
    }

    /// Install or clear the URL patch.
    pub fn set_url_patch(&self, patch: Option<UrlPatch>) {
        *self.url_patch.lock().expect("url patch lock poisoned") = patch;
    }

    /// The patched REST base, if a patch is installed.
    pub fn patched_rest_base(&self) -> Option<String> {
        self.url_patch
            .lock()
            .expect("url patch lock poisoned")
            .as_ref()
            .map(|p| p.rest_base.clone())
    }

    /// The patched WebSocket URL, if a patch is installed.
    pub fn patched_ws_url(&self) -> Option<String> {
        self.url_patch
            .lock()
            .expect("url patch lock poisoned")
            .as_ref()
            .map(|p| p.ws_url.clone())
    }
}

// ---------------------------------------------------------------------------
// The adapter contract
// ---------------------------------------------------------------------------

/// The per-exchange capability contract.
///
/// Implementations provide the pure translation methods (symbols, interval
/// tokens, request params, payload parsing) and the URL constants; the
/// provided methods compose them into complete fetches and route URLs
/// through the [`AdapterCore`] (patch override → testnet → production).
impl std::fmt::Debug for dyn ExchangeAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeAdapter")
            .field("name", &self.name())
            .finish()
    }
}

#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    /// Canonical registry name, e.g. `"binance_spot"`.
    fn name(&self) -> &'static str;

    /// The shared adapter state.
    fn core(&self) -> &AdapterCore;

    /// Which fetch paths are genuine.
    fn io_capability(&self) -> IoCapability {
        IoCapability::AsyncOnly
    }

    /// The intervals this adapter can serve over REST.
    fn intervals(&self) -> &'static [Interval];

    /// The intervals streamable over WebSocket. May be a subset of
    /// [`ExchangeAdapter::intervals`].
    fn ws_intervals(&self) -> &'static [Interval] {
        self.intervals()
    }

    /// The supported intervals as a token → seconds map.
    fn intervals_map(&self) -> HashMap<&'static str, u64> {
        self.intervals()
            .iter()
            .map(|i| (i.as_str(), i.seconds()))
            .collect()
    }

    /// Whether `interval` is in the REST-supported subset.
    fn supports_interval(&self, interval: Interval) -> bool {
        self.intervals().contains(&interval)
    }

    /// Whether `interval` is streamable over WebSocket.
    fn supports_ws_interval(&self, interval: Interval) -> bool {
        self.ws_intervals().contains(&interval)
    }

    /// Translate a canonical pair into the exchange-native symbol.
    fn trading_pair_format(&self, pair: &TradingPair) -> String;

    /// Production REST base URL (scheme + authority).
    fn production_rest_base(&self) -> &'static str;

    /// Testnet REST base URL, for adapters that have one.
    fn testnet_rest_base(&self) -> Option<&'static str> {
        None
    }

    /// Production WebSocket URL.
    fn production_ws_url(&self) -> &'static str;

    /// Testnet WebSocket URL, for adapters that have one.
    fn testnet_ws_url(&self) -> Option<&'static str> {
        None
    }

    /// The URL path for an endpoint kind, e.g. `/api/v3/klines`.
    ///
    /// Errors with [`FeedError::InvalidArgument`] for kinds the exchange
    /// has no endpoint for.
    fn rest_path(&self, kind: EndpointKind) -> Result<&'static str>;

    /// Full REST URL for an endpoint kind, routed through the core:
    /// URL patch → testnet per [`NetworkConfig`] → production. An adapter
    /// without testnet URLs stays on production even when testnet routing
    /// is requested.
    fn rest_url(&self, kind: EndpointKind) -> Result<String> {
        let path = self.rest_path(kind)?;
        if let Some(base) = self.core().patched_rest_base() {
            return Ok(format!("{base}{path}"));
        }
        let base = if self.core().is_testnet_for(kind) {
            self.testnet_rest_base()
                .unwrap_or_else(|| self.production_rest_base())
        } else {
            self.production_rest_base()
        };
        Ok(format!("{base}{path}"))
    }

    /// Full WebSocket URL, routed like [`ExchangeAdapter::rest_url`] under
    /// the `Candles` endpoint kind.
    fn ws_url(&self) -> String {
        if let Some(url) = self.core().patched_ws_url() {
            return url;
        }
        if self.core().is_testnet_for(EndpointKind::Candles) {
            if let Some(url) = self.testnet_ws_url() {
                return url.to_owned();
            }
        }
        self.production_ws_url().to_owned()
    }

    /// The full URL candles are fetched from.
    ///
    /// Most exchanges take the symbol as a query parameter; exchanges that
    /// embed it in the path (Coinbase) override this.
    fn candles_url(&self, _pair: &TradingPair) -> Result<String> {
        self.rest_url(EndpointKind::Candles)
    }

    /// Map canonical fetch arguments onto exchange-native query parameters.
    fn rest_params(&self, req: &CandlesRequest) -> Result<Vec<(String, String)>>;

    /// Parse a decoded REST response into ascending candles.
    fn parse_rest_response(&self, raw: &Value) -> Result<Vec<CandleData>>;

    /// The message to send on the WebSocket after connect.
    fn ws_subscription_payload(&self, pair: &TradingPair, interval: Interval) -> Result<Value>;

    /// Parse a decoded WebSocket message into candles.
    ///
    /// Returns an empty list for keepalives, acks, and other non-candle
    /// messages.
    fn parse_ws_message(&self, raw: &Value) -> Result<Vec<CandleData>>;

    /// Fetch candles over REST: compose URL + params + GET + parse.
    async fn fetch_rest_candles(
        &self,
        req: &CandlesRequest,
        client: &NetworkClient,
    ) -> Result<Vec<CandleData>> {
        self.check_interval(req.interval)?;
        let url = self.candles_url(&req.pair)?;
        let params = self.rest_params(req)?;
        let raw = client.get_rest_data(&url, &params).await?;
        self.parse_rest_response(&raw)
    }

    /// Synchronous fetch variant.
    ///
    /// The default fails with [`FeedError::Capability`] (async-only
    /// surface); sync-capable adapters override it with a genuine blocking
    /// implementation.
    fn fetch_rest_candles_blocking(&self, _req: &CandlesRequest) -> Result<Vec<CandleData>> {
        Err(FeedError::Capability(format!(
            "{} is async-only: no blocking candle fetch",
            self.name()
        )))
    }

    /// Validate that the interval is REST-supported.
    fn check_interval(&self, interval: Interval) -> Result<()> {
        if self.supports_interval(interval) {
            Ok(())
        } else {
            Err(FeedError::UnsupportedInterval {
                interval: interval.to_string(),
                exchange: self.name().to_owned(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Shared parsing helpers
// ---------------------------------------------------------------------------

/// Parse a decimal that may arrive as a JSON string or number, preserving
/// the textual precision either way.
pub(crate) fn decimal_field(v: &Value, context: &'static str) -> Result<Decimal> {
    let text = match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return Err(FeedError::protocol(context, v)),
    };
    text.trim()
        .parse::<Decimal>()
        .map_err(|_| FeedError::protocol(context, v))
}

/// Parse an integer that may arrive as a JSON string or number.
pub(crate) fn int_field(v: &Value, context: &'static str) -> Result<i64> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| FeedError::protocol(context, v)),
        Value::String(s) => {
            if let Ok(n) = s.trim().parse::<i64>() {
                Ok(n)
            } else if let Ok(f) = s.trim().parse::<f64>() {
                Ok(f as i64)
            } else {
                Err(FeedError::protocol(context, v))
            }
        }
        _ => Err(FeedError::protocol(context, v)),
    }
}

/// Run a blocking candle fetch on the tokio blocking pool, for sync-only
/// adapters bridging their real implementation to async callers.
pub(crate) async fn blocking_get(
    url: String,
    params: Vec<(String, String)>,
) -> Result<Value> {
    tokio::task::spawn_blocking(move || {
        BlockingNetworkClient::new()?.get_rest_data(&url, &params)
    })
    .await
    .map_err(|e| FeedError::Fatal(format!("blocking fetch task failed: {e}")))?
}
