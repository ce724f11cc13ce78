//! The mock exchange framework.
//!
//! An in-process HTTP + WebSocket server driven by per-exchange plugins
//! that reproduce each real exchange's wire format with deterministic
//! candle generation, so the feed engine and adapters can be exercised
//! end-to-end without external network.
//!
//! ## Organization
//!
//! - [`server`] — The HTTP+WS server core, rate limiting, fault simulation
//! - [`plugin`] — The per-exchange wire-format plugin contract
//! - [`plugins`] — One plugin per supported exchange
//! - [`registry`] — ExchangeType → plugin map, [`create_mock_server`]
//! - [`factory`] — Deterministic pseudo-random candle generation
//! - [`clock`] — Pluggable time source (system / fake)
//! - [`rate_limit`] — Per-client-IP token buckets
//! - [`faults`] — Packet-drop / malformed-JSON / 5xx simulation
//! - [`patch`] — Test-time rebinding of adapter URLs to a mock server
//!
//! # Example
//!
//! ```no_run
//! use candles_feed::mock_server::{ExchangeType, create_mock_server};
//! use rust_decimal::Decimal;
//!
//! # #[tokio::main]
//! # async fn main() -> candles_feed::error::Result<()> {
//! let server = create_mock_server(
//!     ExchangeType::BinanceSpot,
//!     "127.0.0.1",
//!     0,
//!     &[("BTC", "USDT", Decimal::new(50_000, 0))],
//! )
//! .await?;
//! println!("REST at {}, WS at {}", server.rest_url(), server.ws_url());
//! server.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod factory;
pub mod faults;
pub mod patch;
pub mod plugin;
pub mod plugins;
pub mod rate_limit;
pub mod registry;
pub mod server;

pub use clock::{Clock, FakeClock, SystemClock};
pub use factory::CandleDataFactory;
pub use faults::{FaultConfig, LatencyConfig};
pub use patch::{UrlPatchGuard, patch_adapter_urls};
pub use plugin::{CandlesParams, ExchangePlugin, RestRequest, RestRoute, WsRoute};
pub use rate_limit::RateLimitConfig;
pub use registry::{
    ExchangeType, create_mock_server, create_mock_server_with, get_plugin, register_plugin,
};
pub use server::{MockedExchangeServer, ServerOptions};
