//! Process-wide exchange name → adapter-factory map.
//!
//! The registry is populated once by a discovery pass over the built-in
//! adapters the first time it is consulted; after that it is read-only
//! except for explicit test-time [`register`] calls.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::adapters::{
    ExchangeAdapter, ascendex::AscendexSpotAdapter, binance::BinanceSpotAdapter,
    bybit::BybitSpotAdapter, coinbase::CoinbaseAdvancedTradeAdapter,
    gateio::GateIoSpotAdapter, hyperliquid::HyperliquidAdapter, kraken::KrakenSpotAdapter,
    kucoin::KucoinSpotAdapter, mexc::MexcSpotAdapter, mock::MockAdapter, okx::OkxSpotAdapter,
};
use crate::error::{FeedError, Result};
use crate::network::NetworkConfig;

/// Builds an adapter instance from an optional network config.
pub type AdapterFactory =
    Arc<dyn Fn(Option<NetworkConfig>) -> Arc<dyn ExchangeAdapter> + Send + Sync>;

fn registry() -> &'static RwLock<HashMap<String, AdapterFactory>> {
    static REGISTRY: OnceLock<RwLock<HashMap<String, AdapterFactory>>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut map: HashMap<String, AdapterFactory> = HashMap::new();
        discover_into(&mut map);
        RwLock::new(map)
    })
}

/// The one-time discovery pass over the built-in adapters.
fn discover_into(map: &mut HashMap<String, AdapterFactory>) {
    fn entry<A, F>(map: &mut HashMap<String, AdapterFactory>, name: &str, make: F)
    where
        A: ExchangeAdapter + 'static,
        F: Fn(Option<NetworkConfig>) -> A + Send + Sync + 'static,
    {
        map.insert(
            name.to_owned(),
            Arc::new(move |cfg| Arc::new(make(cfg)) as Arc<dyn ExchangeAdapter>),
        );
    }

    entry(map, "mock", MockAdapter::new);
    entry(map, "binance_spot", BinanceSpotAdapter::new);
    entry(map, "okx_spot", OkxSpotAdapter::new);
    entry(map, "bybit_spot", BybitSpotAdapter::new);
    entry(map, "kraken_spot", KrakenSpotAdapter::new);
    entry(map, "coinbase_advanced_trade", CoinbaseAdvancedTradeAdapter::new);
    entry(map, "kucoin_spot", KucoinSpotAdapter::new);
    entry(map, "gateio_spot", GateIoSpotAdapter::new);
    entry(map, "mexc_spot", MexcSpotAdapter::new);
    entry(map, "hyperliquid", HyperliquidAdapter::new);
    entry(map, "ascendex_spot", AscendexSpotAdapter::new);

    tracing::debug!(adapters = map.len(), "exchange registry discovered");
}

/// Register (or replace) an adapter factory under a canonical name.
///
/// Built-ins are registered automatically; this entry point exists for
/// tests and downstream crates adding exchanges at runtime.
pub fn register(name: impl Into<String>, factory: AdapterFactory) {
    let name = name.into();
    registry()
        .write()
        .expect("exchange registry lock poisoned")
        .insert(name.clone(), factory);
    tracing::debug!(%name, "adapter registered");
}

/// Instantiate the adapter registered under `name`.
///
/// Errors with [`FeedError::UnknownExchange`] when no factory is
/// registered.
pub fn get_adapter_instance(
    name: &str,
    network_config: Option<NetworkConfig>,
) -> Result<Arc<dyn ExchangeAdapter>> {
    let factory = registry()
        .read()
        .expect("exchange registry lock poisoned")
        .get(name)
        .cloned()
        .ok_or_else(|| FeedError::UnknownExchange(name.to_owned()))?;
    Ok(factory(network_config))
}

/// The canonical names of every registered exchange, sorted.
pub fn available_exchanges() -> Vec<String> {
    let mut names: Vec<String> = registry()
        .read()
        .expect("exchange registry lock poisoned")
        .keys()
        .cloned()
        .collect();
    names.sort();
    names
}
