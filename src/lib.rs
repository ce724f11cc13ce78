//! # candles-feed
//!
//! Live OHLCV candle feeds for cryptocurrency exchanges: for each
//! (exchange, trading-pair, interval) triple, a bounded, gap-free,
//! always-current in-memory series consumable by trading strategies.
//! Exchange-specific REST pagination, WebSocket subscription formats,
//! symbol notation, and timestamp units are normalized behind one adapter
//! contract, and an in-process mock exchange framework reproduces each
//! exchange's wire format for end-to-end tests without external network.
//!
//! ## Quick Start
//!
//! ```no_run
//! use candles_feed::feed::CandlesFeed;
//! use candles_feed::feed::strategy::StrategyKind;
//!
//! #[tokio::main]
//! async fn main() -> candles_feed::error::Result<()> {
//!     let feed = CandlesFeed::new("binance_spot", "BTC-USDT", "1m", 150, None)?;
//!     feed.start(StrategyKind::Auto).await?;
//!     // ... consume feed.get_candles().await ...
//!     feed.stop().await;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod constants;
pub mod error;
pub mod feed;
pub mod mock_server;
pub mod network;
pub mod processor;
pub mod types;

/// Re-export the main feed type at crate root for convenience.
pub use feed::CandlesFeed;
/// Re-export the error type and Result alias.
pub use error::{FeedError, Result};
/// Re-export the core data types.
pub use types::{CandleData, Interval, TradingPair};
