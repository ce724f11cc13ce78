//! Tests for the adapter contract: registry resolution, I/O capability
//! gating, strategy selection, testnet URL routing, and per-exchange
//! translation of symbols, intervals, and request parameters.

use std::sync::Arc;

use candles_feed::adapters::ascendex::AscendexSpotAdapter;
use candles_feed::adapters::binance::BinanceSpotAdapter;
use candles_feed::adapters::bybit::BybitSpotAdapter;
use candles_feed::adapters::coinbase::CoinbaseAdvancedTradeAdapter;
use candles_feed::adapters::gateio::GateIoSpotAdapter;
use candles_feed::adapters::hyperliquid::HyperliquidAdapter;
use candles_feed::adapters::kraken::KrakenSpotAdapter;
use candles_feed::adapters::kucoin::KucoinSpotAdapter;
use candles_feed::adapters::mexc::MexcSpotAdapter;
use candles_feed::adapters::okx::OkxSpotAdapter;
use candles_feed::adapters::{self, ExchangeAdapter, IoCapability};
use candles_feed::error::FeedError;
use candles_feed::network::{EndpointKind, Environment, NetworkConfig};
use candles_feed::types::{CandlesRequest, Interval, TradingPair};

fn pair(s: &str) -> TradingPair {
    s.parse().expect("test pair parses")
}

fn interval(s: &str) -> Interval {
    s.parse().expect("test interval parses")
}

#[test]
fn registry_resolves_known_exchanges() {
    for name in [
        "mock",
        "binance_spot",
        "okx_spot",
        "bybit_spot",
        "kraken_spot",
        "coinbase_advanced_trade",
        "kucoin_spot",
        "gateio_spot",
        "mexc_spot",
        "hyperliquid",
        "ascendex_spot",
    ] {
        let adapter = adapters::get_adapter_instance(name, None).expect("known exchange");
        assert_eq!(adapter.name(), name);
    }
    assert!(adapters::available_exchanges().contains(&"binance_spot".to_owned()));
}

#[test]
fn registry_rejects_unknown_exchanges() {
    let err = adapters::get_adapter_instance("binance_perpetual", None).unwrap_err();
    assert!(matches!(err, FeedError::UnknownExchange(name) if name == "binance_perpetual"));
}

#[test]
fn registry_accepts_dynamic_registration() {
    adapters::register(
        "registered_at_runtime",
        Arc::new(|cfg| Arc::new(BinanceSpotAdapter::new(cfg)) as Arc<dyn ExchangeAdapter>),
    );
    let adapter =
        adapters::get_adapter_instance("registered_at_runtime", None).expect("registered");
    assert_eq!(adapter.name(), "binance_spot");
}

#[test]
fn async_only_adapters_reject_the_blocking_fetch() {
    let okx = OkxSpotAdapter::new(None);
    let req = CandlesRequest::latest(pair("BTC-USDT"), interval("1m"), 10);
    assert!(matches!(
        okx.fetch_rest_candles_blocking(&req),
        Err(FeedError::Capability(_))
    ));

    let coinbase = CoinbaseAdvancedTradeAdapter::new(None);
    assert!(matches!(
        coinbase.fetch_rest_candles_blocking(&req),
        Err(FeedError::Capability(_))
    ));
}

#[test]
fn io_capabilities_are_declared() {
    assert_eq!(
        BinanceSpotAdapter::new(None).io_capability(),
        IoCapability::Hybrid
    );
    assert_eq!(
        KrakenSpotAdapter::new(None).io_capability(),
        IoCapability::SyncOnly
    );
    assert_eq!(
        OkxSpotAdapter::new(None).io_capability(),
        IoCapability::AsyncOnly
    );
    assert!(!IoCapability::SyncOnly.is_native_async());
    assert!(IoCapability::Hybrid.supports_blocking());
}

#[test]
fn unsupported_intervals_fail_at_the_call_site() {
    // OKX has no 8h bar.
    let okx = OkxSpotAdapter::new(None);
    assert!(matches!(
        okx.check_interval(interval("8h")),
        Err(FeedError::UnsupportedInterval { .. })
    ));
    assert!(okx.check_interval(interval("1h")).is_ok());
}

#[test]
fn network_config_routes_per_endpoint_kind() {
    // S6: candles on production, orders on the testnet.
    let config = NetworkConfig::hybrid([(EndpointKind::Orders, Environment::Testnet)]);
    let adapter = BinanceSpotAdapter::new(Some(config));

    assert_eq!(
        adapter.rest_url(EndpointKind::Candles).unwrap(),
        "https://api.binance.com/api/v3/klines"
    );
    assert_eq!(
        adapter.rest_url(EndpointKind::Orders).unwrap(),
        "https://testnet.binance.vision/api/v3/order"
    );
}

#[test]
fn testnet_default_routes_everything_with_testnet_urls() {
    let adapter = BybitSpotAdapter::new(Some(NetworkConfig::testnet()));
    assert_eq!(
        adapter.rest_url(EndpointKind::Candles).unwrap(),
        "https://api-testnet.bybit.com/v5/market/kline"
    );
    assert_eq!(
        adapter.ws_url(),
        "wss://stream-testnet.bybit.com/v5/public/spot"
    );
}

#[test]
fn adapters_without_testnet_urls_stay_on_production() {
    let adapter = OkxSpotAdapter::new(Some(NetworkConfig::testnet()));
    assert_eq!(
        adapter.rest_url(EndpointKind::Candles).unwrap(),
        "https://www.okx.com/api/v5/market/candles"
    );
}

#[test]
fn for_testing_config_forces_production_routing() {
    let config = NetworkConfig::for_testing();
    assert!(!config.is_testnet_for(EndpointKind::Candles));
    let adapter = BinanceSpotAdapter::new(Some(config));
    assert_eq!(
        adapter.rest_url(EndpointKind::Candles).unwrap(),
        "https://api.binance.com/api/v3/klines"
    );
}

#[test]
fn adapters_without_a_config_run_in_production_mode() {
    let adapter = BinanceSpotAdapter::new(None);
    assert_eq!(
        adapter.rest_url(EndpointKind::Ticker).unwrap(),
        "https://api.binance.com/api/v3/ping"
    );
    assert_eq!(adapter.ws_url(), "wss://stream.binance.com:9443/ws");
}

#[test]
fn symbol_translation_per_exchange() {
    let p = pair("BTC-USDT");
    assert_eq!(BinanceSpotAdapter::new(None).trading_pair_format(&p), "BTCUSDT");
    assert_eq!(OkxSpotAdapter::new(None).trading_pair_format(&p), "BTC-USDT");
    assert_eq!(KrakenSpotAdapter::new(None).trading_pair_format(&p), "XBTUSDT");
    assert_eq!(KrakenSpotAdapter::ws_pair_format(&p), "XBT/USDT");
    assert_eq!(KucoinSpotAdapter::new(None).trading_pair_format(&p), "BTC-USDT");
    assert_eq!(GateIoSpotAdapter::new(None).trading_pair_format(&p), "BTC_USDT");
    assert_eq!(MexcSpotAdapter::new(None).trading_pair_format(&p), "BTCUSDT");
    assert_eq!(AscendexSpotAdapter::new(None).trading_pair_format(&p), "BTC/USDT");
    let usd = pair("BTC-USD");
    assert_eq!(HyperliquidAdapter::new(None).trading_pair_format(&usd), "BTC");
}

#[test]
fn interval_translation_per_exchange() {
    assert_eq!(OkxSpotAdapter::bar_token(interval("1h")), "1H");
    assert_eq!(OkxSpotAdapter::bar_token(interval("1m")), "1m");
    assert_eq!(BybitSpotAdapter::interval_token(interval("1h")), "60");
    assert_eq!(BybitSpotAdapter::interval_token(interval("1d")), "D");
    assert_eq!(
        CoinbaseAdvancedTradeAdapter::granularity_token(interval("5m")),
        "FIVE_MINUTE"
    );
    assert_eq!(KucoinSpotAdapter::type_token(interval("1m")), "1min");
    assert_eq!(KucoinSpotAdapter::type_token(interval("1h")), "1hour");
    assert_eq!(GateIoSpotAdapter::interval_token(interval("1w")), "7d");
    assert_eq!(GateIoSpotAdapter::interval_token(interval("1M")), "30d");
    assert_eq!(MexcSpotAdapter::rest_interval_token(interval("1h")), "60m");
    assert_eq!(MexcSpotAdapter::ws_interval_token(interval("1h")), "Min60");
    assert_eq!(AscendexSpotAdapter::interval_token(interval("1h")), "60");
    // AscendEX's lowercase `1m` is the month bar, not the minute bar.
    assert_eq!(AscendexSpotAdapter::interval_token(interval("1M")), "1m");
    assert_eq!(AscendexSpotAdapter::interval_token(interval("1m")), "1");
}

#[test]
fn binance_rest_params_use_milliseconds() {
    let adapter = BinanceSpotAdapter::new(None);
    let req = CandlesRequest::window(
        pair("BTC-USDT"),
        interval("1m"),
        Some(1_700_000_000),
        Some(1_700_000_600),
        Some(10),
    )
    .unwrap();
    let params = adapter.rest_params(&req).unwrap();
    assert!(params.contains(&("symbol".to_owned(), "BTCUSDT".to_owned())));
    assert!(params.contains(&("interval".to_owned(), "1m".to_owned())));
    assert!(params.contains(&("startTime".to_owned(), "1700000000000".to_owned())));
    assert!(params.contains(&("endTime".to_owned(), "1700000600000".to_owned())));
    assert!(params.contains(&("limit".to_owned(), "10".to_owned())));
}

#[test]
fn requests_reject_inverted_windows() {
    let result = CandlesRequest::window(
        pair("BTC-USDT"),
        interval("1m"),
        Some(1_700_000_600),
        Some(1_700_000_000),
        None,
    );
    assert!(matches!(result, Err(FeedError::InvalidArgument(_))));
}

#[test]
fn ws_subscription_payloads_match_exchange_protocols() {
    let p = pair("BTC-USDT");
    let binance = BinanceSpotAdapter::new(None)
        .ws_subscription_payload(&p, interval("1m"))
        .unwrap();
    assert_eq!(binance["method"], "SUBSCRIBE");
    assert_eq!(binance["params"][0], "btcusdt@kline_1m");

    let okx = OkxSpotAdapter::new(None)
        .ws_subscription_payload(&p, interval("1h"))
        .unwrap();
    assert_eq!(okx["op"], "subscribe");
    assert_eq!(okx["args"][0]["channel"], "candle1H");
    assert_eq!(okx["args"][0]["instId"], "BTC-USDT");

    let kraken = KrakenSpotAdapter::new(None)
        .ws_subscription_payload(&p, interval("1m"))
        .unwrap();
    assert_eq!(kraken["event"], "subscribe");
    assert_eq!(kraken["pair"][0], "XBT/USDT");
    assert_eq!(kraken["subscription"]["interval"], 1);
}

#[test]
fn keepalive_messages_parse_to_empty() {
    let binance = BinanceSpotAdapter::new(None);
    let ack = serde_json::json!({ "result": null, "id": 1 });
    assert!(binance.parse_ws_message(&ack).unwrap().is_empty());

    let okx = OkxSpotAdapter::new(None);
    let event = serde_json::json!({ "event": "subscribe", "arg": {} });
    assert!(okx.parse_ws_message(&event).unwrap().is_empty());

    let kraken = KrakenSpotAdapter::new(None);
    let heartbeat = serde_json::json!({ "event": "heartbeat" });
    assert!(kraken.parse_ws_message(&heartbeat).unwrap().is_empty());
}

#[test]
fn strategy_selection_follows_capabilities() {
    use candles_feed::feed::strategy::{StrategyKind, select_strategy};

    let binance = BinanceSpotAdapter::new(None);
    let kraken = KrakenSpotAdapter::new(None);
    let coinbase = CoinbaseAdvancedTradeAdapter::new(None);

    // Auto prefers WebSocket when the adapter can stream the interval.
    assert_eq!(
        select_strategy(StrategyKind::Auto, &binance, interval("1m")).unwrap(),
        StrategyKind::WebSocket
    );
    // Sync-only adapters can't stream; Auto falls back to REST.
    assert_eq!(
        select_strategy(StrategyKind::Auto, &kraken, interval("1m")).unwrap(),
        StrategyKind::Rest
    );
    // Coinbase only streams five-minute buckets.
    assert_eq!(
        select_strategy(StrategyKind::Auto, &coinbase, interval("1m")).unwrap(),
        StrategyKind::Rest
    );
    assert_eq!(
        select_strategy(StrategyKind::Auto, &coinbase, interval("5m")).unwrap(),
        StrategyKind::WebSocket
    );

    // Forcing WebSocket on an incompatible pairing fails instead of
    // falling back.
    assert!(select_strategy(StrategyKind::WebSocket, &kraken, interval("1m")).is_err());
    assert!(select_strategy(StrategyKind::WebSocket, &coinbase, interval("1m")).is_err());
    // Forcing REST is always valid.
    assert_eq!(
        select_strategy(StrategyKind::Rest, &binance, interval("1m")).unwrap(),
        StrategyKind::Rest
    );
}

#[test]
fn malformed_payloads_surface_protocol_errors() {
    let adapter = BinanceSpotAdapter::new(None);
    let bad = serde_json::json!({ "unexpected": "shape" });
    assert!(matches!(
        adapter.parse_rest_response(&bad),
        Err(FeedError::Protocol { .. })
    ));

    let truncated_row = serde_json::json!([[1_700_000_000_000_i64, "1", "2"]]);
    assert!(matches!(
        adapter.parse_rest_response(&truncated_row),
        Err(FeedError::Protocol { .. })
    ));
}
