//! Golden wire-format tests for every mock-server plugin, and round-trip
//! tests proving each (adapter, plugin) pair is a bijection: the adapter
//! parses exactly what its plugin formats, over REST and over WebSocket.

use std::sync::Arc;

use candles_feed::adapters::{self, ExchangeAdapter};
use candles_feed::mock_server::{CandleDataFactory, ExchangeType, get_plugin};
use candles_feed::types::{CandleData, Interval, TradingPair};
use serde_json::Value;

fn pair(s: &str) -> TradingPair {
    s.parse().expect("test pair parses")
}

fn interval(s: &str) -> Interval {
    s.parse().expect("test interval parses")
}

/// Five deterministic, fully-populated candles, bucket-aligned.
fn sample_candles(p: &TradingPair, i: Interval) -> Vec<CandleData> {
    let factory = CandleDataFactory::new(7);
    let width = i.seconds() as i64;
    let start = i.align(1_700_000_000);
    factory.candles_between(p, i, start, start + 4 * width, 50_000.into())
}

fn adapter_for(exchange_type: ExchangeType) -> Arc<dyn ExchangeAdapter> {
    adapters::get_adapter_instance(exchange_type.as_str(), None).expect("adapter exists")
}

/// The OHLCV core every exchange format carries.
fn assert_core_fields_eq(parsed: &[CandleData], original: &[CandleData], label: &str) {
    assert_eq!(parsed.len(), original.len(), "{label}: length");
    for (a, b) in parsed.iter().zip(original) {
        assert_eq!(a.timestamp, b.timestamp, "{label}: timestamp");
        assert_eq!(a.open, b.open, "{label}: open");
        assert_eq!(a.high, b.high, "{label}: high");
        assert_eq!(a.low, b.low, "{label}: low");
        assert_eq!(a.close, b.close, "{label}: close");
        assert_eq!(a.volume, b.volume, "{label}: volume");
    }
}

// ---------------------------------------------------------------------------
// REST round trips (adapter ∘ plugin = identity on the carried fields)
// ---------------------------------------------------------------------------

#[test]
fn rest_round_trip_for_every_plugin() {
    let cases = [
        (ExchangeType::Mock, "BTC-USDT", "1m"),
        (ExchangeType::BinanceSpot, "BTC-USDT", "1m"),
        (ExchangeType::OkxSpot, "BTC-USDT", "1h"),
        (ExchangeType::BybitSpot, "ETH-USDT", "5m"),
        (ExchangeType::KrakenSpot, "BTC-USDT", "1m"),
        (ExchangeType::CoinbaseAdvancedTrade, "BTC-USD", "5m"),
        (ExchangeType::KucoinSpot, "BTC-USDT", "15m"),
        (ExchangeType::GateIoSpot, "BTC-USDT", "5m"),
        (ExchangeType::MexcSpot, "BTC-USDT", "1h"),
        (ExchangeType::Hyperliquid, "BTC-USD", "1m"),
        (ExchangeType::AscendexSpot, "BTC-USDT", "1h"),
    ];

    for (exchange_type, pair_token, interval_token) in cases {
        let p = pair(pair_token);
        let i = interval(interval_token);
        let plugin = get_plugin(exchange_type).expect("plugin exists");
        let adapter = adapter_for(exchange_type);

        let original = sample_candles(&p, i);
        let wire = plugin.format_rest_candles(&original, &p, i);
        let parsed = adapter
            .parse_rest_response(&wire)
            .unwrap_or_else(|e| panic!("{}: REST parse failed: {e}", exchange_type.as_str()));

        assert_core_fields_eq(&parsed, &original, exchange_type.as_str());
    }
}

#[test]
fn rest_round_trip_preserves_extended_fields_where_the_format_carries_them() {
    let p = pair("BTC-USDT");
    let i = interval("1m");
    let original = sample_candles(&p, i);

    // Binance klines carry the full field set.
    let plugin = get_plugin(ExchangeType::BinanceSpot).unwrap();
    let adapter = adapter_for(ExchangeType::BinanceSpot);
    let parsed = adapter
        .parse_rest_response(&plugin.format_rest_candles(&original, &p, i))
        .unwrap();
    for (a, b) in parsed.iter().zip(&original) {
        assert_eq!(a.quote_asset_volume, b.quote_asset_volume);
        assert_eq!(a.n_trades, b.n_trades);
        assert_eq!(a.taker_buy_base_volume, b.taker_buy_base_volume);
        assert_eq!(a.taker_buy_quote_volume, b.taker_buy_quote_volume);
    }

    // Kraken carries the trade count.
    let plugin = get_plugin(ExchangeType::KrakenSpot).unwrap();
    let adapter = adapter_for(ExchangeType::KrakenSpot);
    let parsed = adapter
        .parse_rest_response(&plugin.format_rest_candles(&original, &p, i))
        .unwrap();
    for (a, b) in parsed.iter().zip(&original) {
        assert_eq!(a.n_trades, b.n_trades);
    }

    // Gate.io and MEXC carry the quote volume.
    for exchange_type in [ExchangeType::GateIoSpot, ExchangeType::MexcSpot] {
        let plugin = get_plugin(exchange_type).unwrap();
        let adapter = adapter_for(exchange_type);
        let parsed = adapter
            .parse_rest_response(&plugin.format_rest_candles(&original, &p, i))
            .unwrap();
        for (a, b) in parsed.iter().zip(&original) {
            assert_eq!(a.quote_asset_volume, b.quote_asset_volume, "{}", exchange_type.as_str());
        }
    }

    // Hyperliquid carries the trade count.
    let hl_pair = pair("BTC-USD");
    let original = sample_candles(&hl_pair, i);
    let plugin = get_plugin(ExchangeType::Hyperliquid).unwrap();
    let adapter = adapter_for(ExchangeType::Hyperliquid);
    let parsed = adapter
        .parse_rest_response(&plugin.format_rest_candles(&original, &hl_pair, i))
        .unwrap();
    for (a, b) in parsed.iter().zip(&original) {
        assert_eq!(a.n_trades, b.n_trades);
    }
}

// ---------------------------------------------------------------------------
// WebSocket round trips
// ---------------------------------------------------------------------------

#[test]
fn ws_round_trip_for_every_plugin() {
    let cases = [
        (ExchangeType::Mock, "BTC-USDT", "1m"),
        (ExchangeType::BinanceSpot, "BTC-USDT", "1m"),
        (ExchangeType::OkxSpot, "BTC-USDT", "1h"),
        (ExchangeType::BybitSpot, "ETH-USDT", "5m"),
        (ExchangeType::KrakenSpot, "BTC-USDT", "1m"),
        (ExchangeType::CoinbaseAdvancedTrade, "BTC-USD", "5m"),
        (ExchangeType::KucoinSpot, "BTC-USDT", "15m"),
        (ExchangeType::GateIoSpot, "BTC-USDT", "5m"),
        (ExchangeType::MexcSpot, "BTC-USDT", "1h"),
        (ExchangeType::Hyperliquid, "BTC-USD", "1m"),
        (ExchangeType::AscendexSpot, "BTC-USDT", "1h"),
    ];

    for (exchange_type, pair_token, interval_token) in cases {
        let p = pair(pair_token);
        let i = interval(interval_token);
        let plugin = get_plugin(exchange_type).expect("plugin exists");
        let adapter = adapter_for(exchange_type);

        let original = sample_candles(&p, i).remove(0);
        let message = plugin.format_ws_candle_message(&original, &p, i, true);
        let parsed = adapter
            .parse_ws_message(&message)
            .unwrap_or_else(|e| panic!("{}: WS parse failed: {e}", exchange_type.as_str()));

        assert_core_fields_eq(&parsed, std::slice::from_ref(&original), exchange_type.as_str());
    }
}

#[test]
fn adapter_subscriptions_are_understood_by_their_plugins() {
    let cases = [
        (ExchangeType::Mock, "BTC-USDT", "1m"),
        (ExchangeType::BinanceSpot, "BTC-USDT", "1m"),
        (ExchangeType::OkxSpot, "BTC-USDT", "1h"),
        (ExchangeType::BybitSpot, "ETH-USDT", "5m"),
        (ExchangeType::KrakenSpot, "BTC-USDT", "1m"),
        (ExchangeType::CoinbaseAdvancedTrade, "BTC-USD", "5m"),
        (ExchangeType::KucoinSpot, "BTC-USDT", "15m"),
        (ExchangeType::GateIoSpot, "BTC-USDT", "5m"),
        (ExchangeType::MexcSpot, "BTC-USDT", "1h"),
        (ExchangeType::Hyperliquid, "BTC-USD", "1m"),
        (ExchangeType::AscendexSpot, "BTC-USDT", "1h"),
    ];

    for (exchange_type, pair_token, interval_token) in cases {
        let p = pair(pair_token);
        let i = interval(interval_token);
        let plugin = get_plugin(exchange_type).expect("plugin exists");
        let adapter = adapter_for(exchange_type);

        let payload = adapter
            .ws_subscription_payload(&p, i)
            .expect("subscription payload");
        let subs = plugin.parse_ws_subscription(&payload);
        assert!(
            !subs.is_empty(),
            "{}: plugin did not recognize its adapter's subscription",
            exchange_type.as_str()
        );

        // The key the server would register for this subscription must be
        // the key it broadcasts pushes on.
        let (symbol, token) = &subs[0];
        let subscribed_key = plugin.create_ws_subscription_key(symbol, token);
        let push_key = plugin
            .create_ws_subscription_key(&plugin.exchange_symbol(&p), &plugin.interval_token(i));
        assert_eq!(subscribed_key, push_key, "{}", exchange_type.as_str());

        // Unrecognized messages yield an empty list.
        assert!(
            plugin
                .parse_ws_subscription(&serde_json::json!({ "hello": "world" }))
                .is_empty()
        );
    }
}

#[test]
fn symbol_normalization_round_trips() {
    let cases = [
        (ExchangeType::Mock, "BTC-USDT"),
        (ExchangeType::BinanceSpot, "BTC-USDT"),
        (ExchangeType::OkxSpot, "BTC-USDT"),
        (ExchangeType::BybitSpot, "ETH-USDT"),
        (ExchangeType::KrakenSpot, "BTC-USDT"),
        (ExchangeType::CoinbaseAdvancedTrade, "BTC-USD"),
        (ExchangeType::KucoinSpot, "BTC-USDT"),
        (ExchangeType::GateIoSpot, "BTC-USDT"),
        (ExchangeType::MexcSpot, "BTC-USDT"),
        (ExchangeType::Hyperliquid, "BTC-USD"),
        (ExchangeType::AscendexSpot, "BTC-USDT"),
    ];
    for (exchange_type, pair_token) in cases {
        let p = pair(pair_token);
        let plugin = get_plugin(exchange_type).expect("plugin exists");
        let normalized = plugin
            .normalize_trading_pair(&plugin.exchange_symbol(&p))
            .expect("normalizes");
        assert_eq!(normalized, p, "{}", exchange_type.as_str());
    }
}

// ---------------------------------------------------------------------------
// Golden shape checks (field order, encodings, timestamp units)
// ---------------------------------------------------------------------------

#[test]
fn binance_klines_match_the_documented_shape() {
    let p = pair("BTC-USDT");
    let i = interval("1m");
    let candles = sample_candles(&p, i);
    let plugin = get_plugin(ExchangeType::BinanceSpot).unwrap();
    let wire = plugin.format_rest_candles(&candles, &p, i);

    let rows = wire.as_array().expect("top level is an array");
    assert_eq!(rows.len(), candles.len());
    let row = rows[0].as_array().expect("rows are arrays");
    assert_eq!(row.len(), 12);

    // Open time: milliseconds, as a number.
    assert_eq!(row[0], Value::from(candles[0].timestamp * 1000));
    // Prices and volumes: strings.
    assert_eq!(row[1], Value::from(candles[0].open.to_string()));
    assert_eq!(row[4], Value::from(candles[0].close.to_string()));
    // Close time: openTime + interval − 1ms, as a number.
    assert_eq!(row[6], Value::from((candles[0].timestamp + 60) * 1000 - 1));
    // Trade count: a number. Trailing ignore field: the string "0".
    assert!(row[8].is_u64());
    assert_eq!(row[11], Value::from("0"));
}

#[test]
fn okx_candles_match_the_documented_envelope() {
    let p = pair("BTC-USDT");
    let i = interval("1m");
    let candles = sample_candles(&p, i);
    let plugin = get_plugin(ExchangeType::OkxSpot).unwrap();
    let wire = plugin.format_rest_candles(&candles, &p, i);

    assert_eq!(wire["code"], "0");
    assert_eq!(wire["msg"], "");
    let rows = wire["data"].as_array().expect("data is an array");
    // Newest first.
    let first_ts: i64 = rows[0][0].as_str().unwrap().parse().unwrap();
    let last_ts: i64 = rows[rows.len() - 1][0].as_str().unwrap().parse().unwrap();
    assert!(first_ts > last_ts);
    // Millisecond timestamps as strings.
    assert_eq!(
        rows[rows.len() - 1][0],
        Value::from((candles[0].timestamp * 1000).to_string())
    );
}

#[test]
fn bybit_klines_match_the_documented_envelope() {
    let p = pair("ETH-USDT");
    let i = interval("5m");
    let candles = sample_candles(&p, i);
    let plugin = get_plugin(ExchangeType::BybitSpot).unwrap();
    let wire = plugin.format_rest_candles(&candles, &p, i);

    assert_eq!(wire["retCode"], 0);
    assert_eq!(wire["retMsg"], "OK");
    assert_eq!(wire["result"]["category"], "spot");
    assert_eq!(wire["result"]["symbol"], "ETHUSDT");
    let rows = wire["result"]["list"].as_array().expect("list is an array");
    // Newest first, millisecond string timestamps, 7 fields.
    assert_eq!(rows[0].as_array().unwrap().len(), 7);
    let first_ts: i64 = rows[0][0].as_str().unwrap().parse().unwrap();
    assert_eq!(first_ts, candles[candles.len() - 1].timestamp * 1000);
}

#[test]
fn kraken_ohlc_matches_the_documented_envelope() {
    let p = pair("BTC-USDT");
    let i = interval("1m");
    let candles = sample_candles(&p, i);
    let plugin = get_plugin(ExchangeType::KrakenSpot).unwrap();
    let wire = plugin.format_rest_candles(&candles, &p, i);

    assert_eq!(wire["error"], serde_json::json!([]));
    let result = wire["result"].as_object().expect("result is an object");
    let rows = result.get("XBTUSDT").expect("keyed by Kraken pair name");
    assert_eq!(
        result.get("last"),
        Some(&Value::from(candles[candles.len() - 1].timestamp))
    );
    let row = rows[0].as_array().expect("rows are arrays");
    // Second timestamps as numbers, prices as strings, count as a number.
    assert!(row[0].is_i64() || row[0].is_u64());
    assert!(row[1].is_string());
    assert!(row[7].is_u64());
}

#[test]
fn coinbase_candles_match_the_documented_shape() {
    let p = pair("BTC-USD");
    let i = interval("5m");
    let candles = sample_candles(&p, i);
    let plugin = get_plugin(ExchangeType::CoinbaseAdvancedTrade).unwrap();
    let wire = plugin.format_rest_candles(&candles, &p, i);

    let rows = wire["candles"].as_array().expect("candles is an array");
    // Newest first; second timestamps as strings.
    assert_eq!(
        rows[rows.len() - 1]["start"],
        Value::from(candles[0].timestamp.to_string())
    );
    let newest = rows[0].as_object().unwrap();
    for key in ["start", "low", "high", "open", "close", "volume"] {
        assert!(newest[key].is_string(), "coinbase {key} is a string");
    }
}

#[test]
fn kucoin_candles_use_open_close_high_low_order() {
    let p = pair("BTC-USDT");
    let i = interval("15m");
    let candles = sample_candles(&p, i);
    let plugin = get_plugin(ExchangeType::KucoinSpot).unwrap();
    let wire = plugin.format_rest_candles(&candles, &p, i);

    assert_eq!(wire["code"], "200000");
    let rows = wire["data"].as_array().expect("data is an array");
    let oldest = rows[rows.len() - 1].as_array().unwrap();
    assert_eq!(oldest[0], Value::from(candles[0].timestamp.to_string()));
    assert_eq!(oldest[1], Value::from(candles[0].open.to_string()));
    assert_eq!(oldest[2], Value::from(candles[0].close.to_string()));
    assert_eq!(oldest[3], Value::from(candles[0].high.to_string()));
    assert_eq!(oldest[4], Value::from(candles[0].low.to_string()));
}

#[test]
fn gateio_candlesticks_match_the_documented_shape() {
    let p = pair("BTC-USDT");
    let i = interval("5m");
    let candles = sample_candles(&p, i);
    let plugin = get_plugin(ExchangeType::GateIoSpot).unwrap();
    let wire = plugin.format_rest_candles(&candles, &p, i);

    let rows = wire.as_array().expect("top level is a bare array");
    // Ascending; second timestamps as strings; quote volume second and
    // the open after the high and low.
    let row = rows[0].as_array().expect("rows are arrays");
    assert_eq!(row.len(), 8);
    assert_eq!(row[0], Value::from(candles[0].timestamp.to_string()));
    assert_eq!(row[1], Value::from(candles[0].quote_asset_volume.to_string()));
    assert_eq!(row[2], Value::from(candles[0].close.to_string()));
    assert_eq!(row[5], Value::from(candles[0].open.to_string()));
    assert_eq!(row[7], Value::from("true"));
}

#[test]
fn mexc_klines_match_the_documented_shape() {
    let p = pair("BTC-USDT");
    let i = interval("1h");
    let candles = sample_candles(&p, i);
    let plugin = get_plugin(ExchangeType::MexcSpot).unwrap();
    let wire = plugin.format_rest_candles(&candles, &p, i);

    let rows = wire.as_array().expect("top level is an array");
    let row = rows[0].as_array().expect("rows are arrays");
    // Eight fields: no trade count or taker volumes, unlike Binance.
    assert_eq!(row.len(), 8);
    assert_eq!(row[0], Value::from(candles[0].timestamp * 1000));
    assert!(row[1].is_string());
    assert_eq!(row[6], Value::from((candles[0].timestamp + 3600) * 1000 - 1));
    assert_eq!(row[7], Value::from(candles[0].quote_asset_volume.to_string()));

    // The hour bar is written `60m` over REST and `Min60` on the stream.
    assert!(plugin.interval_to_seconds("60m").unwrap() == 3600);
    assert!(plugin.interval_to_seconds("Min60").unwrap() == 3600);
}

#[test]
fn hyperliquid_snapshots_match_the_documented_shape() {
    let p = pair("BTC-USD");
    let i = interval("1m");
    let candles = sample_candles(&p, i);
    let plugin = get_plugin(ExchangeType::Hyperliquid).unwrap();
    let wire = plugin.format_rest_candles(&candles, &p, i);

    let rows = wire.as_array().expect("top level is an array");
    let obj = rows[0].as_object().expect("rows are objects");
    // Millisecond open time as a number, bare coin symbol, string prices,
    // numeric trade count.
    assert_eq!(obj["t"], Value::from(candles[0].timestamp * 1000));
    assert_eq!(obj["s"], Value::from("BTC"));
    assert_eq!(obj["i"], Value::from("1m"));
    assert!(obj["o"].is_string());
    assert!(obj["n"].is_u64());
}

#[test]
fn ascendex_barhist_matches_the_documented_envelope() {
    let p = pair("BTC-USDT");
    let i = interval("1h");
    let candles = sample_candles(&p, i);
    let plugin = get_plugin(ExchangeType::AscendexSpot).unwrap();
    let wire = plugin.format_rest_candles(&candles, &p, i);

    assert_eq!(wire["code"], 0);
    let rows = wire["data"].as_array().expect("data is an array");
    let record = rows[0].as_object().expect("entries are records");
    assert_eq!(record["m"], Value::from("bar"));
    assert_eq!(record["s"], Value::from("BTC/USDT"));
    let bar = record["data"].as_object().expect("bar payload");
    // Minute-count interval token, millisecond timestamp, string prices.
    assert_eq!(bar["i"], Value::from("60"));
    assert_eq!(bar["ts"], Value::from(candles[0].timestamp * 1000));
    assert!(bar["o"].is_string());
}

#[test]
fn candle_factory_is_deterministic_and_continuous() {
    let p = pair("BTC-USDT");
    let i = interval("1m");
    let factory = CandleDataFactory::new(99);

    let a = factory.candle_at(&p, i, 1_700_000_040, 50_000.into());
    let b = factory.candle_at(&p, i, 1_700_000_040, 50_000.into());
    assert_eq!(a.open, b.open);
    assert_eq!(a.close, b.close);
    assert_eq!(a.volume, b.volume);
    assert!(a.is_valid());

    // Different seeds change the series.
    let c = CandleDataFactory::new(100).candle_at(&p, i, 1_700_000_040, 50_000.into());
    assert!(a.close != c.close || a.volume != c.volume);

    // The walk is continuous: open of bucket n is close of bucket n−1.
    let prev = factory.candle_at(&p, i, 1_700_000_040 - 60, 50_000.into());
    assert_eq!(a.open, prev.close);
}
