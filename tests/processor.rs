//! Tests for the data processor and the bounded feed store: ordering,
//! de-duplication, merge idempotence, eviction, and gap detection.

use candles_feed::feed::store::CandleStore;
use candles_feed::processor;
use candles_feed::types::CandleData;
use rust_decimal::Decimal;

fn candle(ts: i64, close: i64) -> CandleData {
    let c = Decimal::from(close);
    CandleData::new(ts, c, c, c, c, Decimal::ONE).expect("test candle is valid")
}

fn timestamps(candles: &[CandleData]) -> Vec<i64> {
    candles.iter().map(|c| c.timestamp).collect()
}

#[test]
fn merge_sorts_and_deduplicates_with_incoming_winning() {
    // Out-of-order batch with a duplicate timestamp: the later 60 wins.
    let incoming = vec![candle(120, 1), candle(60, 2), candle(180, 3), candle(60, 4)];
    let merged = processor::merge(Vec::new(), incoming);

    assert_eq!(timestamps(&merged), vec![60, 120, 180]);
    assert_eq!(merged[0].close, Decimal::from(4));
}

#[test]
fn merge_prefers_incoming_over_existing() {
    let existing = vec![candle(60, 1), candle(120, 2)];
    let incoming = vec![candle(120, 9), candle(180, 3)];
    let merged = processor::merge(existing, incoming);

    assert_eq!(timestamps(&merged), vec![60, 120, 180]);
    assert_eq!(merged[1].close, Decimal::from(9));
}

#[test]
fn merge_is_idempotent() {
    let existing = vec![candle(60, 1), candle(120, 2)];
    let incoming = vec![candle(120, 9), candle(180, 3)];

    let once = processor::merge(existing.clone(), incoming.clone());
    let twice = processor::merge(once.clone(), incoming);
    assert_eq!(timestamps(&once), timestamps(&twice));
    for (a, b) in once.iter().zip(&twice) {
        assert_eq!(a.close, b.close);
    }
}

#[test]
fn sanitize_drops_invariant_violations() {
    let good = candle(60, 100);
    let mut bad = candle(120, 100);
    bad.low = Decimal::from(200); // low above everything else

    let clean = processor::sanitize(vec![good, bad]);
    assert_eq!(timestamps(&clean), vec![60]);
}

#[test]
fn detect_gaps_returns_exactly_the_oversized_deltas() {
    let series = vec![
        candle(60, 1),
        candle(120, 2),
        // 180 missing
        candle(240, 3),
        candle(300, 4),
        // 360, 420 missing
        candle(480, 5),
    ];
    let gaps = processor::detect_gaps(&series, 60);
    assert_eq!(gaps, vec![(120, 240), (300, 480)]);
}

#[test]
fn detect_gaps_is_empty_for_contiguous_series() {
    let series: Vec<CandleData> = (0..10).map(|i| candle(60 + i * 60, i)).collect();
    assert!(processor::detect_gaps(&series, 60).is_empty());
}

#[test]
fn store_is_ascending_unique_and_bounded() {
    let mut store = CandleStore::new(3);
    store.merge(vec![
        candle(60, 1),
        candle(120, 2),
        candle(180, 3),
        candle(240, 4),
        candle(300, 5),
    ]);

    let snapshot = store.snapshot();
    assert_eq!(timestamps(&snapshot), vec![180, 240, 300]);
    assert_eq!(store.len(), 3);
    assert!(store.ready());
    assert_eq!(store.first_timestamp(), Some(180));
    assert_eq!(store.last_timestamp(), Some(300));
}

#[test]
fn store_eviction_drops_oldest_across_interleaved_merges() {
    let mut store = CandleStore::new(3);
    store.merge(vec![candle(300, 1), candle(60, 2)]);
    store.merge(vec![candle(180, 3)]);
    store.merge(vec![candle(240, 4), candle(120, 5)]);

    // Every interleaving keeps the newest three, ascending, no duplicates.
    assert_eq!(timestamps(&store.snapshot()), vec![180, 240, 300]);
}

#[test]
fn store_overwrites_same_timestamp_without_growing() {
    let mut store = CandleStore::new(5);
    store.merge(vec![candle(60, 1)]);
    store.merge(vec![candle(60, 9)]);

    assert_eq!(store.len(), 1);
    assert_eq!(store.snapshot()[0].close, Decimal::from(9));
    assert!(!store.ready());
}
