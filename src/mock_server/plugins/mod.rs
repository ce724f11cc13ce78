//! Per-exchange mock-server plugins.
//!
//! Each plugin is the formatting mirror of its adapter: the adapter parses
//! the exchange's wire format into canonical candles, the plugin formats
//! canonical candles back into that wire format, bit-exactly.

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

pub use ascendex::AscendexSpotPlugin;
pub use binance::BinanceSpotPlugin;
pub use bybit::BybitSpotPlugin;
pub use coinbase::CoinbaseAdvancedTradePlugin;
pub use gateio::GateIoSpotPlugin;
pub use hyperliquid::HyperliquidPlugin;
pub use kraken::KrakenSpotPlugin;
pub use kucoin::KucoinSpotPlugin;
pub use mexc::MexcSpotPlugin;
pub use mock::MockPlugin;
pub use okx::OkxSpotPlugin;
