//! Process-wide exchange-type → plugin map and the one-call server
//! factory.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, OnceLock, RwLock};

use rust_decimal::Decimal;

use crate::error::{FeedError, Result};
use crate::mock_server::plugin::ExchangePlugin;
use crate::mock_server::plugins::{
    AscendexSpotPlugin, BinanceSpotPlugin, BybitSpotPlugin, CoinbaseAdvancedTradePlugin,
    GateIoSpotPlugin, HyperliquidPlugin, KrakenSpotPlugin, KucoinSpotPlugin, MexcSpotPlugin,
    MockPlugin, OkxSpotPlugin,
};
use crate::mock_server::server::{MockedExchangeServer, ServerOptions};
use crate::types::TradingPair;

/// The exchanges the mock framework can impersonate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeType {
    /// The canonical-format mock exchange.
    Mock,
    /// Binance spot.
    BinanceSpot,
    /// OKX spot.
    OkxSpot,
    /// Bybit spot.
    BybitSpot,
    /// Kraken spot.
    KrakenSpot,
    /// Coinbase Advanced Trade.
    CoinbaseAdvancedTrade,
    /// KuCoin spot.
    KucoinSpot,
    /// Gate.io spot.
    GateIoSpot,
    /// MEXC spot.
    MexcSpot,
    /// Hyperliquid.
    Hyperliquid,
    /// AscendEX spot.
    AscendexSpot,
}

impl ExchangeType {
    /// The canonical adapter/registry name for this exchange.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeType::Mock => "mock",
            ExchangeType::BinanceSpot => "binance_spot",
            ExchangeType::OkxSpot => "okx_spot",
            ExchangeType::BybitSpot => "bybit_spot",
            ExchangeType::KrakenSpot => "kraken_spot",
            ExchangeType::CoinbaseAdvancedTrade => "coinbase_advanced_trade",
            ExchangeType::KucoinSpot => "kucoin_spot",
            ExchangeType::GateIoSpot => "gateio_spot",
            ExchangeType::MexcSpot => "mexc_spot",
            ExchangeType::Hyperliquid => "hyperliquid",
            ExchangeType::AscendexSpot => "ascendex_spot",
        }
    }

    /// Every supported exchange type.
    pub const ALL: [ExchangeType; 11] = [
        ExchangeType::Mock,
        ExchangeType::BinanceSpot,
        ExchangeType::OkxSpot,
        ExchangeType::BybitSpot,
        ExchangeType::KrakenSpot,
        ExchangeType::CoinbaseAdvancedTrade,
        ExchangeType::KucoinSpot,
        ExchangeType::GateIoSpot,
        ExchangeType::MexcSpot,
        ExchangeType::Hyperliquid,
        ExchangeType::AscendexSpot,
    ];
}

impl FromStr for ExchangeType {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self> {
        ExchangeType::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| FeedError::UnknownExchange(s.to_owned()))
    }
}

/// Builds a plugin instance.
pub type PluginFactory = Arc<dyn Fn() -> Arc<dyn ExchangePlugin> + Send + Sync>;

fn registry() -> &'static RwLock<HashMap<ExchangeType, PluginFactory>> {
    static REGISTRY: OnceLock<RwLock<HashMap<ExchangeType, PluginFactory>>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut map: HashMap<ExchangeType, PluginFactory> = HashMap::new();
        fn entry<P, F>(map: &mut HashMap<ExchangeType, PluginFactory>, t: ExchangeType, make: F)
        where
            P: ExchangePlugin + 'static,
            F: Fn() -> P + Send + Sync + 'static,
        {
            map.insert(t, Arc::new(move || Arc::new(make()) as Arc<dyn ExchangePlugin>));
        }
        entry(&mut map, ExchangeType::Mock, MockPlugin::new);
        entry(&mut map, ExchangeType::BinanceSpot, BinanceSpotPlugin::new);
        entry(&mut map, ExchangeType::OkxSpot, OkxSpotPlugin::new);
        entry(&mut map, ExchangeType::BybitSpot, BybitSpotPlugin::new);
        entry(&mut map, ExchangeType::KrakenSpot, KrakenSpotPlugin::new);
        entry(
            &mut map,
            ExchangeType::CoinbaseAdvancedTrade,
            CoinbaseAdvancedTradePlugin::new,
        );
        entry(&mut map, ExchangeType::KucoinSpot, KucoinSpotPlugin::new);
        entry(&mut map, ExchangeType::GateIoSpot, GateIoSpotPlugin::new);
        entry(&mut map, ExchangeType::MexcSpot, MexcSpotPlugin::new);
        entry(&mut map, ExchangeType::Hyperliquid, HyperliquidPlugin::new);
        entry(&mut map, ExchangeType::AscendexSpot, AscendexSpotPlugin::new);
        tracing::debug!(plugins = map.len(), "plugin registry discovered");
        RwLock::new(map)
    })
}

/// Register (or replace) a plugin factory for an exchange type.
pub fn register_plugin(exchange_type: ExchangeType, factory: PluginFactory) {
    registry()
        .write()
        .expect("plugin registry lock poisoned")
        .insert(exchange_type, factory);
}

/// Instantiate the plugin registered for `exchange_type`.
pub fn get_plugin(exchange_type: ExchangeType) -> Result<Arc<dyn ExchangePlugin>> {
    let factory = registry()
        .read()
        .expect("plugin registry lock poisoned")
        .get(&exchange_type)
        .cloned()
        .ok_or_else(|| FeedError::UnknownExchange(exchange_type.as_str().to_owned()))?;
    Ok(factory())
}

/// Instantiate the plugin, start a server on `host:port` (0 = ephemeral),
/// preload the given `(base, quote, seed_price)` triples, and return the
/// started server.
pub async fn create_mock_server(
    exchange_type: ExchangeType,
    host: &str,
    port: u16,
    trading_pairs: &[(&str, &str, Decimal)],
) -> Result<MockedExchangeServer> {
    create_mock_server_with(exchange_type, host, port, trading_pairs, ServerOptions::default())
        .await
}

/// [`create_mock_server`] with explicit server options (clock, seed,
/// latency, limits, faults).
pub async fn create_mock_server_with(
    exchange_type: ExchangeType,
    host: &str,
    port: u16,
    trading_pairs: &[(&str, &str, Decimal)],
    options: ServerOptions,
) -> Result<MockedExchangeServer> {
    let plugin = get_plugin(exchange_type)?;
    let server = MockedExchangeServer::start(plugin, host, port, options).await?;
    for (base, quote, seed_price) in trading_pairs {
        server.add_trading_pair(TradingPair::new(*base, *quote)?, *seed_price);
    }
    tracing::info!(
        exchange = exchange_type.as_str(),
        rest = %server.rest_url(),
        ws = %server.ws_url(),
        "mock server ready"
    );
    Ok(server)
}
