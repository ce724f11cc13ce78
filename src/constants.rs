//! Constants for the supported exchanges and the feed engine.
//!
//! Contains production and testnet base URLs per exchange, network client
//! timeouts, and the backoff bounds used by the collection strategies.
//! These are used internally by the adapters and the feed engine, but are
//! also exported for advanced usage.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Network client defaults
// ---------------------------------------------------------------------------

/// Default HTTP connect timeout.
pub const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default total HTTP request timeout.
pub const HTTP_TOTAL_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum redirect depth followed by the network client.
pub const HTTP_MAX_REDIRECTS: usize = 5;

// ---------------------------------------------------------------------------
// Strategy timing
// ---------------------------------------------------------------------------

/// Lower clamp on the REST polling cadence.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Upper clamp on the REST polling cadence, bounding tail latency on long
/// candle intervals.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Initial reconnect / retry backoff delay.
pub const BACKOFF_INITIAL: Duration = Duration::from_secs(1);

/// Maximum reconnect / retry backoff delay.
pub const BACKOFF_MAX: Duration = Duration::from_secs(60);

/// Jitter applied to WebSocket reconnect delays, as a fraction of the delay.
pub const BACKOFF_JITTER: f64 = 0.2;

/// A streaming interval this long without a disconnect resets the
/// WebSocket backoff to [`BACKOFF_INITIAL`].
pub const BACKOFF_RESET_AFTER: Duration = Duration::from_secs(60);

/// Floor on the WebSocket liveness timeout; the effective timeout is
/// `max(3 × interval, WS_LIVENESS_FLOOR)`.
pub const WS_LIVENESS_FLOOR: Duration = Duration::from_secs(30);

/// How long `stop()` waits for a strategy or server task to wind down
/// before abandoning it.
pub const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(5);

/// Retry budget for targeted gap-backfill fetches.
pub const GAP_BACKFILL_RETRIES: u32 = 3;

// ---------------------------------------------------------------------------
// Feed defaults
// ---------------------------------------------------------------------------

/// Default bound on a feed's candle store.
pub const DEFAULT_MAX_RECORDS: usize = 150;

// ---------------------------------------------------------------------------
// Exchange base URLs
// ---------------------------------------------------------------------------

/// Production and testnet endpoints per supported exchange.
pub mod urls {
    /// Binance spot.
    pub mod binance {
        /// REST base URL.
        pub const REST: &str = "https://api.binance.com";
        /// Testnet REST base URL.
        pub const REST_TESTNET: &str = "https://testnet.binance.vision";
        /// Market stream WebSocket URL.
        pub const WS: &str = "wss://stream.binance.com:9443/ws";
        /// Testnet market stream WebSocket URL.
        pub const WS_TESTNET: &str = "wss://testnet.binance.vision/ws";
    }

    /// OKX spot.
    pub mod okx {
        /// REST base URL.
        pub const REST: &str = "https://www.okx.com";
        /// Business WebSocket URL (candlestick channels).
        pub const WS: &str = "wss://ws.okx.com:8443/ws/v5/business";
    }

    /// Bybit spot (v5 unified API).
    pub mod bybit {
        /// REST base URL.
        pub const REST: &str = "https://api.bybit.com";
        /// Testnet REST base URL.
        pub const REST_TESTNET: &str = "https://api-testnet.bybit.com";
        /// Public spot WebSocket URL.
        pub const WS: &str = "wss://stream.bybit.com/v5/public/spot";
        /// Testnet public spot WebSocket URL.
        pub const WS_TESTNET: &str = "wss://stream-testnet.bybit.com/v5/public/spot";
    }

    /// Kraken spot.
    pub mod kraken {
        /// REST base URL.
        pub const REST: &str = "https://api.kraken.com";
        /// Public WebSocket (v1) URL.
        pub const WS: &str = "wss://ws.kraken.com";
    }

    /// Coinbase Advanced Trade.
    pub mod coinbase {
        /// REST base URL.
        pub const REST: &str = "https://api.coinbase.com";
        /// Market data WebSocket URL.
        pub const WS: &str = "wss://advanced-trade-ws.coinbase.com";
    }

    /// KuCoin spot.
    pub mod kucoin {
        /// REST base URL.
        pub const REST: &str = "https://api.kucoin.com";
        /// Public WebSocket URL (nominal; the real endpoint is negotiated
        /// through a token handshake).
        pub const WS: &str = "wss://ws-api-spot.kucoin.com";
    }

    /// Gate.io spot (API v4).
    pub mod gateio {
        /// REST base URL.
        pub const REST: &str = "https://api.gateio.ws";
        /// Spot WebSocket URL.
        pub const WS: &str = "wss://api.gateio.ws/ws/v4/";
    }

    /// MEXC spot (API v3).
    pub mod mexc {
        /// REST base URL.
        pub const REST: &str = "https://api.mexc.com";
        /// Spot WebSocket URL.
        pub const WS: &str = "wss://wbs.mexc.com/ws";
    }

    /// Hyperliquid.
    pub mod hyperliquid {
        /// REST base URL (the `info` endpoint family).
        pub const REST: &str = "https://api.hyperliquid.xyz";
        /// WebSocket URL.
        pub const WS: &str = "wss://api.hyperliquid.xyz/ws";
    }

    /// AscendEX spot (API pro v1).
    pub mod ascendex {
        /// REST base URL.
        pub const REST: &str = "https://ascendex.com";
        /// Public WebSocket URL.
        pub const WS: &str = "wss://ascendex.com/api/pro/v1/stream";
    }

    /// The in-process mock exchange. These are placeholders; tests rebind
    /// them to a live mock server with a URL patch.
    pub mod mock {
        /// REST base URL.
        pub const REST: &str = "http://127.0.0.1:8080";
        /// WebSocket URL.
        pub const WS: &str = "ws://127.0.0.1:8080/ws";
    }
}
