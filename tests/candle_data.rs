//! Tests for candle construction: timestamp normalization, OHLCV
//! invariants, identity semantics, and the canonical JSON form.

use candles_feed::error::FeedError;
use candles_feed::types::{CandleData, Interval, RawTimestamp, TradingPair};
use rust_decimal::Decimal;

fn flat_candle(ts: impl Into<RawTimestamp>, price: i64) -> CandleData {
    let p = Decimal::from(price);
    CandleData::new(ts, p, p, p, p, Decimal::ONE).expect("flat candle is valid")
}

#[test]
fn integer_seconds_pass_through() {
    assert_eq!(flat_candle(1_700_000_000_i64, 100).timestamp, 1_700_000_000);
    assert_eq!(flat_candle(0_i64, 100).timestamp, 0);
}

#[test]
fn integer_milliseconds_are_scaled_down() {
    assert_eq!(
        flat_candle(1_700_000_000_000_i64, 100).timestamp,
        1_700_000_000
    );
    // One below the threshold stays in seconds.
    assert_eq!(
        flat_candle(999_999_999_999_i64, 100).timestamp,
        999_999_999_999
    );
}

#[test]
fn float_seconds_are_floored() {
    assert_eq!(flat_candle(1_700_000_000.9_f64, 100).timestamp, 1_700_000_000);
    assert_eq!(flat_candle(42.1_f64, 100).timestamp, 42);
}

#[test]
fn float_milliseconds_are_floored_then_scaled() {
    assert_eq!(
        flat_candle(1_700_000_000_500.7_f64, 100).timestamp,
        1_700_000_000
    );
}

#[test]
fn iso_8601_strings_parse_as_utc() {
    assert_eq!(
        flat_candle("2023-01-01T00:00:00Z", 100).timestamp,
        1_672_531_200
    );
    assert_eq!(
        flat_candle("2023-01-01T00:00:00+00:00", 100).timestamp,
        1_672_531_200
    );
    // Zone-less datetimes are taken as UTC.
    assert_eq!(
        flat_candle("2023-01-01T00:00:00", 100).timestamp,
        1_672_531_200
    );
}

#[test]
fn unparseable_timestamp_string_is_rejected() {
    let p = Decimal::from(100);
    let result = CandleData::new("not a date", p, p, p, p, Decimal::ONE);
    assert!(matches!(result, Err(FeedError::InvalidArgument(_))));
}

#[test]
fn timestamp_ms_is_derived() {
    assert_eq!(flat_candle(1_700_000_000_i64, 100).timestamp_ms(), 1_700_000_000_000);
}

#[test]
fn price_ordering_invariants_are_enforced() {
    let d = Decimal::from;
    // low above open
    assert!(matches!(
        CandleData::new(60_i64, d(100), d(110), d(105), d(108), Decimal::ONE),
        Err(FeedError::InvalidCandle(_))
    ));
    // high below close
    assert!(matches!(
        CandleData::new(60_i64, d(100), d(101), d(99), d(105), Decimal::ONE),
        Err(FeedError::InvalidCandle(_))
    ));
    // well-formed candle passes
    let candle = CandleData::new(60_i64, d(100), d(110), d(95), d(105), Decimal::ONE)
        .expect("ordered candle is valid");
    assert!(candle.is_valid());
}

#[test]
fn negative_prices_and_volumes_are_rejected() {
    let d = Decimal::from;
    assert!(matches!(
        CandleData::new(60_i64, d(-1), d(1), d(-2), d(0), Decimal::ONE),
        Err(FeedError::InvalidCandle(_))
    ));
    assert!(matches!(
        CandleData::new(60_i64, d(1), d(1), d(1), d(1), d(-5)),
        Err(FeedError::InvalidCandle(_))
    ));
}

#[test]
fn equality_and_hash_key_on_timestamp_only() {
    use std::collections::HashSet;

    let a = flat_candle(60_i64, 100);
    let b = flat_candle(60_i64, 999);
    let c = flat_candle(120_i64, 100);
    assert_eq!(a, b);
    assert_ne!(a, c);

    let mut set = HashSet::new();
    set.insert(a);
    set.insert(b);
    set.insert(c);
    assert_eq!(set.len(), 2);
}

#[test]
fn builder_sets_extended_fields() {
    let d = Decimal::from;
    let candle = CandleData::builder(60_i64, d(100), d(110), d(95), d(105), d(3))
        .quote_asset_volume(d(300))
        .n_trades(42)
        .taker_buy_base_volume(d(1))
        .taker_buy_quote_volume(d(100))
        .build()
        .expect("builder candle is valid");
    assert_eq!(candle.quote_asset_volume, d(300));
    assert_eq!(candle.n_trades, 42);
    assert_eq!(candle.taker_buy_base_volume, d(1));
    assert_eq!(candle.taker_buy_quote_volume, d(100));
}

#[test]
fn canonical_json_uses_decimal_strings_and_second_timestamps() {
    let candle = CandleData::new(
        1_700_000_000_i64,
        "50000.10".parse().unwrap(),
        "50001".parse().unwrap(),
        "49999.5".parse().unwrap(),
        "50000.75".parse().unwrap(),
        "12.3400".parse().unwrap(),
    )
    .expect("candle is valid");

    let json = serde_json::to_value(&candle).expect("candle serializes");
    assert_eq!(json["timestamp"], serde_json::json!(1_700_000_000));
    assert_eq!(json["open"], serde_json::json!("50000.10"));
    assert_eq!(json["low"], serde_json::json!("49999.5"));
    // Textual precision survives the round trip.
    assert_eq!(json["volume"], serde_json::json!("12.3400"));

    let back: CandleData = serde_json::from_value(json).expect("candle deserializes");
    assert_eq!(back.timestamp, candle.timestamp);
    assert_eq!(back.open, candle.open);
    assert_eq!(back.volume, candle.volume);
}

#[test]
fn interval_tokens_round_trip_through_the_suffix_table() {
    let expectations = [
        ("1s", 1),
        ("1m", 60),
        ("3m", 180),
        ("5m", 300),
        ("15m", 900),
        ("30m", 1800),
        ("1h", 3600),
        ("2h", 7200),
        ("4h", 14_400),
        ("6h", 21_600),
        ("8h", 28_800),
        ("12h", 43_200),
        ("1d", 86_400),
        ("3d", 259_200),
        ("1w", 604_800),
        ("1M", 2_592_000),
    ];
    for (token, seconds) in expectations {
        let interval: Interval = token.parse().expect("canonical token parses");
        assert_eq!(interval.seconds(), seconds, "width of {token}");
        assert_eq!(interval.as_str(), token);
        assert_eq!(Interval::from_seconds(seconds), Some(interval));
    }
    assert!("2w".parse::<Interval>().is_err());
    assert!("1min".parse::<Interval>().is_err());
}

#[test]
fn interval_alignment_floors_to_bucket_start() {
    let m1: Interval = "1m".parse().unwrap();
    assert_eq!(m1.align(1_700_000_020), 1_700_000_040 - 60);
    assert_eq!(m1.align(1_700_000_040), 1_700_000_040);
}

#[test]
fn trading_pairs_parse_and_render_canonically() {
    let pair: TradingPair = "BTC-USDT".parse().expect("well-formed pair parses");
    assert_eq!(pair.base(), "BTC");
    assert_eq!(pair.quote(), "USDT");
    assert_eq!(pair.to_string(), "BTC-USDT");

    assert!("BTCUSDT".parse::<TradingPair>().is_err());
    assert!("btc-usdt".parse::<TradingPair>().is_err());
    assert!("BTC-".parse::<TradingPair>().is_err());
}
