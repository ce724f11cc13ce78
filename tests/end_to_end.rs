//! End-to-end scenarios: feeds running against mock exchange servers over
//! real local HTTP and WebSocket connections.

use std::sync::Arc;
use std::time::Duration;

use candles_feed::adapters::{self, ExchangeAdapter};
use candles_feed::error::FeedError;
use candles_feed::feed::strategy::StrategyKind;
use candles_feed::feed::{CandlesFeed, FeedState, NetworkStatus};
use candles_feed::mock_server::plugins::MockPlugin;
use candles_feed::mock_server::{
    CandlesParams, ExchangePlugin, ExchangeType, FakeClock, FaultConfig, LatencyConfig,
    MockedExchangeServer, RateLimitConfig, RestRequest, RestRoute, ServerOptions,
    create_mock_server, create_mock_server_with, patch_adapter_urls,
};
use candles_feed::network::NetworkClient;
use candles_feed::types::{CandleData, CandlesRequest, Interval, TradingPair};
use rust_decimal::Decimal;

fn pair(s: &str) -> TradingPair {
    s.parse().expect("test pair parses")
}

fn interval(s: &str) -> Interval {
    s.parse().expect("test interval parses")
}

/// `count` flat minute bars starting at `start_ts`, closes ascending from
/// `base_price`.
fn minute_bars(start_ts: i64, base_price: i64, count: i64) -> Vec<CandleData> {
    (0..count)
        .map(|i| {
            let p = Decimal::from(base_price + i);
            CandleData::new(start_ts + i * 60, p, p, p, p, Decimal::ONE)
                .expect("seed candle is valid")
        })
        .collect()
}

async fn mock_server_with_btc() -> MockedExchangeServer {
    create_mock_server(
        ExchangeType::Mock,
        "127.0.0.1",
        0,
        &[("BTC", "USDT", Decimal::from(50_000))],
    )
    .await
    .expect("mock server starts")
}

/// Poll `condition` every 25ms until it holds or `deadline` elapses.
async fn wait_for<F, Fut>(deadline: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let end = tokio::time::Instant::now() + deadline;
    while tokio::time::Instant::now() < end {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    false
}

// ---------------------------------------------------------------------------
// S1 — REST polling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rest_polling_fills_the_store_with_the_newest_candles() {
    let server = mock_server_with_btc().await;
    server
        .seed_candles(&pair("BTC-USDT"), interval("1m"), minute_bars(1_700_000_000, 50_000, 10))
        .await;

    let feed = CandlesFeed::new("mock", "BTC-USDT", "1m", 5, None).expect("feed");
    let _patch = patch_adapter_urls(feed.adapter(), &server);

    feed.start(StrategyKind::Rest).await.expect("start");
    assert!(
        wait_for(Duration::from_secs(5), || feed.ready()).await,
        "feed never filled"
    );

    let candles = feed.get_candles().await;
    let timestamps: Vec<i64> = candles.iter().map(|c| c.timestamp).collect();
    assert_eq!(
        timestamps,
        vec![1_700_000_300, 1_700_000_360, 1_700_000_420, 1_700_000_480, 1_700_000_540]
    );
    assert_eq!(feed.last_timestamp().await, Some(1_700_000_540));
    assert_eq!(feed.first_timestamp().await, Some(1_700_000_300));
    assert!(feed.ready().await);
    // Closes carry the seeded values for the surviving window.
    assert_eq!(candles[0].close, Decimal::from(50_005));
    assert_eq!(candles[4].close, Decimal::from(50_009));

    feed.stop().await;
    server.stop().await;
}

// ---------------------------------------------------------------------------
// S2 — WebSocket streaming
// ---------------------------------------------------------------------------

#[tokio::test]
async fn websocket_strategy_seeds_then_streams_pushed_candles() {
    let server = mock_server_with_btc().await;
    let p = pair("BTC-USDT");
    let i = interval("1m");
    server
        .seed_candles(&p, i, minute_bars(1_700_000_000, 50_000, 10))
        .await;

    let feed = CandlesFeed::new("mock", "BTC-USDT", "1m", 5, None).expect("feed");
    let _patch = patch_adapter_urls(feed.adapter(), &server);

    feed.start(StrategyKind::WebSocket).await.expect("start");
    assert!(
        wait_for(Duration::from_secs(5), || feed.ready()).await,
        "WS seed never completed"
    );

    let push = Decimal::from(50_010);
    let candle = CandleData::new(1_700_000_600_i64, push, push, push, push, Decimal::ONE)
        .expect("pushed candle is valid");
    // Re-push until the subscription is live and the candle lands.
    assert!(
        wait_for(Duration::from_secs(5), || async {
            server.push_ws_candle(&p, i, candle.clone(), false).await;
            feed.last_timestamp().await == Some(1_700_000_600)
        })
        .await,
        "pushed candle never arrived"
    );

    let timestamps: Vec<i64> = feed.get_candles().await.iter().map(|c| c.timestamp).collect();
    assert_eq!(
        timestamps,
        vec![1_700_000_360, 1_700_000_420, 1_700_000_480, 1_700_000_540, 1_700_000_600]
    );

    feed.stop().await;
    server.stop().await;
}

// ---------------------------------------------------------------------------
// S3 — out-of-order, duplicated REST batches through a hybrid adapter
// ---------------------------------------------------------------------------

/// Wraps the mock plugin but serves candle batches out of order with a
/// stale duplicate of the oldest bucket first and the genuine one last.
struct OutOfOrderPlugin {
    inner: MockPlugin,
}

impl ExchangePlugin for OutOfOrderPlugin {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn rest_routes(&self) -> Vec<RestRoute> {
        self.inner.rest_routes()
    }

    fn exchange_symbol(&self, pair: &TradingPair) -> String {
        self.inner.exchange_symbol(pair)
    }

    fn normalize_trading_pair(&self, exchange_form: &str) -> candles_feed::error::Result<TradingPair> {
        self.inner.normalize_trading_pair(exchange_form)
    }

    fn interval_token(&self, interval: Interval) -> String {
        self.inner.interval_token(interval)
    }

    fn format_rest_candles(
        &self,
        candles: &[CandleData],
        pair: &TradingPair,
        interval: Interval,
    ) -> serde_json::Value {
        let batch = if candles.len() >= 3 {
            let stale_price = Decimal::from(99_999);
            let stale = CandleData::new(
                candles[0].timestamp,
                stale_price,
                stale_price,
                stale_price,
                stale_price,
                Decimal::ONE,
            )
            .expect("stale duplicate is a valid candle");
            // [ts=120, ts=60 (stale), ts=180, ts=60 (genuine, last)]
            vec![
                candles[1].clone(),
                stale,
                candles[2].clone(),
                candles[0].clone(),
            ]
        } else {
            candles.to_vec()
        };
        self.inner.format_rest_candles(&batch, pair, interval)
    }

    fn format_ws_candle_message(
        &self,
        candle: &CandleData,
        pair: &TradingPair,
        interval: Interval,
        is_final: bool,
    ) -> serde_json::Value {
        self.inner
            .format_ws_candle_message(candle, pair, interval, is_final)
    }

    fn parse_rest_candles_params(
        &self,
        request: &RestRequest,
    ) -> candles_feed::error::Result<CandlesParams> {
        self.inner.parse_rest_candles_params(request)
    }

    fn parse_ws_subscription(&self, message: &serde_json::Value) -> Vec<(String, String)> {
        self.inner.parse_ws_subscription(message)
    }

    fn ws_subscription_ack(
        &self,
        message: &serde_json::Value,
        subs: &[(String, String)],
    ) -> Option<serde_json::Value> {
        self.inner.ws_subscription_ack(message, subs)
    }
}

#[tokio::test]
async fn out_of_order_duplicate_batches_merge_sorted_with_latest_winning() {
    // The server answers every poll with [ts=120, ts=60, ts=180, ts=60]
    // where the second ts=60 is the genuine candle.
    let server = MockedExchangeServer::start(
        Arc::new(OutOfOrderPlugin { inner: MockPlugin::new() }),
        "127.0.0.1",
        0,
        ServerOptions::default(),
    )
    .await
    .expect("server starts");
    server.add_trading_pair(pair("BTC-USDT"), Decimal::from(50_000));

    let p = pair("BTC-USDT");
    let i = interval("1m");
    let seeded = vec![
        minute_bars(60, 50_000, 1).remove(0),
        minute_bars(120, 50_001, 1).remove(0),
        minute_bars(180, 50_002, 1).remove(0),
    ];
    server.seed_candles(&p, i, seeded).await;

    // The mock adapter's I/O surface is hybrid; the feed drives its async
    // path over real HTTP.
    let feed = CandlesFeed::new("mock", "BTC-USDT", "1m", 5, None).expect("feed");
    assert_eq!(
        feed.adapter().io_capability(),
        candles_feed::adapters::IoCapability::Hybrid
    );
    let _patch = patch_adapter_urls(feed.adapter(), &server);

    feed.start(StrategyKind::Rest).await.expect("start");
    assert!(
        wait_for(Duration::from_secs(5), || async { feed.len().await == 3 }).await,
        "batch never merged"
    );

    let candles = feed.get_candles().await;
    let timestamps: Vec<i64> = candles.iter().map(|c| c.timestamp).collect();
    assert_eq!(timestamps, vec![60, 120, 180]);
    // The later ts=60 occurrence won over the stale one.
    assert_eq!(candles[0].close, Decimal::from(50_000));
    assert_eq!(candles[1].close, Decimal::from(50_001));
    assert_eq!(candles[2].close, Decimal::from(50_002));

    feed.stop().await;
    server.stop().await;
}

// ---------------------------------------------------------------------------
// S5 — WS drop, reconnect, re-seed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn websocket_reconnects_and_reseeds_after_a_server_side_drop() {
    let server = mock_server_with_btc().await;
    let p = pair("BTC-USDT");
    let i = interval("1m");
    server
        .seed_candles(&p, i, minute_bars(1_700_000_000, 50_000, 10))
        .await;

    let feed = CandlesFeed::new("mock", "BTC-USDT", "1m", 5, None).expect("feed");
    let _patch = patch_adapter_urls(feed.adapter(), &server);
    feed.start(StrategyKind::WebSocket).await.expect("start");
    assert!(wait_for(Duration::from_secs(5), || feed.ready()).await);

    // First streamed candle, then the connection is cut from the server
    // side.
    let c1 = Decimal::from(50_010);
    let candle = CandleData::new(1_700_000_600_i64, c1, c1, c1, c1, Decimal::ONE).unwrap();
    assert!(
        wait_for(Duration::from_secs(5), || async {
            server.push_ws_candle(&p, i, candle.clone(), true).await;
            feed.last_timestamp().await == Some(1_700_000_600)
        })
        .await
    );
    server.drop_ws_connections();

    // Within the reconnect budget the strategy resubscribes and resumes.
    // Keep pushing until the reconnected stream delivers.
    let c2 = Decimal::from(50_011);
    let next = CandleData::new(1_700_000_660_i64, c2, c2, c2, c2, Decimal::ONE).unwrap();
    assert!(
        wait_for(Duration::from_secs(5), || async {
            server.push_ws_candle(&p, i, next.clone(), false).await;
            feed.last_timestamp().await == Some(1_700_000_660)
        })
        .await,
        "stream never resumed after the drop"
    );

    // Nothing previously observed was lost.
    let timestamps: Vec<i64> = feed.get_candles().await.iter().map(|c| c.timestamp).collect();
    assert_eq!(
        timestamps,
        vec![1_700_000_420, 1_700_000_480, 1_700_000_540, 1_700_000_600, 1_700_000_660]
    );

    feed.stop().await;
    server.stop().await;
}

// ---------------------------------------------------------------------------
// Gap detection and backfill
// ---------------------------------------------------------------------------

#[tokio::test]
async fn detected_gaps_are_backfilled_with_targeted_reads() {
    use candles_feed::feed::FeedEvent;

    let server = mock_server_with_btc().await;
    let p = pair("BTC-USDT");
    let i = interval("1m");

    // Nine aligned minute bars with a hole where the sixth should be.
    let base = 1_699_999_980; // minute-aligned
    let mut bars = minute_bars(base, 50_000, 10);
    bars.remove(5);
    server.seed_candles(&p, i, bars).await;

    let feed = CandlesFeed::new("mock", "BTC-USDT", "1m", 10, None).expect("feed");
    let _patch = patch_adapter_urls(feed.adapter(), &server);
    let mut events = feed.subscribe_updates();

    feed.start(StrategyKind::Rest).await.expect("start");
    assert!(
        wait_for(Duration::from_secs(5), || async {
            feed.len().await == 10
        })
        .await,
        "the gap was never backfilled"
    );

    // The store is contiguous again: the missing bucket was synthesized by
    // the server and merged through a targeted window read.
    let timestamps: Vec<i64> = feed.get_candles().await.iter().map(|c| c.timestamp).collect();
    let expected: Vec<i64> = (0..10).map(|n| base + n * 60).collect();
    assert_eq!(timestamps, expected);

    // The gap was observable as a feed event.
    let mut saw_gap = false;
    while let Ok(event) = events.try_recv() {
        if let FeedEvent::GapDetected { prev, next } = event {
            assert_eq!(prev, base + 240);
            assert_eq!(next, base + 360);
            saw_gap = true;
        }
    }
    assert!(saw_gap, "no GapDetected event was broadcast");

    feed.stop().await;
    server.stop().await;
}

// ---------------------------------------------------------------------------
// Feed lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn start_and_stop_are_idempotent_and_the_store_survives_a_restart() {
    let server = mock_server_with_btc().await;
    server
        .seed_candles(&pair("BTC-USDT"), interval("1m"), minute_bars(1_700_000_000, 50_000, 10))
        .await;

    let feed = CandlesFeed::new("mock", "BTC-USDT", "1m", 5, None).expect("feed");
    let _patch = patch_adapter_urls(feed.adapter(), &server);

    feed.start(StrategyKind::Rest).await.expect("start");
    feed.start(StrategyKind::Rest).await.expect("second start is a no-op");
    assert_eq!(feed.state(), FeedState::Running);
    assert!(wait_for(Duration::from_secs(5), || feed.ready()).await);

    feed.stop().await;
    feed.stop().await;
    assert_eq!(feed.state(), FeedState::Stopped);
    assert_eq!(feed.len().await, 5, "the store is preserved across stop");

    feed.start(StrategyKind::Rest).await.expect("restart");
    assert_eq!(feed.state(), FeedState::Running);
    feed.stop().await;
    server.stop().await;
}

#[tokio::test]
async fn check_network_reflects_server_reachability() {
    let server = mock_server_with_btc().await;
    let feed = CandlesFeed::new("mock", "BTC-USDT", "1m", 5, None).expect("feed");
    let _patch = patch_adapter_urls(feed.adapter(), &server);

    assert_eq!(feed.check_network().await, NetworkStatus::Connected);
    server.stop().await;
    assert_eq!(feed.check_network().await, NetworkStatus::NotConnected);
}

#[tokio::test]
async fn forcing_websocket_on_an_incompatible_feed_fails() {
    // Kraken's adapter is sync-only, so WebSocket streaming is refused.
    let feed = CandlesFeed::new("kraken_spot", "BTC-USDT", "1m", 5, None).expect("feed");
    let err = feed.start(StrategyKind::WebSocket).await.unwrap_err();
    assert!(matches!(err, FeedError::InvalidArgument(_)));
    assert_eq!(feed.state(), FeedState::Stopped);
}

// ---------------------------------------------------------------------------
// Sync/async parity (hybrid adapter)
// ---------------------------------------------------------------------------

#[tokio::test]
async fn hybrid_adapter_sync_and_async_fetches_agree() {
    let server = mock_server_with_btc().await;
    let p = pair("BTC-USDT");
    let i = interval("1m");
    server
        .seed_candles(&p, i, minute_bars(1_700_000_000, 50_000, 10))
        .await;

    let adapter = adapters::get_adapter_instance("mock", None).expect("adapter");
    let _patch = patch_adapter_urls(adapter.clone(), &server);
    let client = NetworkClient::new().expect("client");

    let req = CandlesRequest::latest(p, i, 5);
    let from_async = adapter
        .fetch_rest_candles(&req, &client)
        .await
        .expect("async fetch");

    let blocking_adapter = adapter.clone();
    let blocking_req = req.clone();
    let from_sync = tokio::task::spawn_blocking(move || {
        blocking_adapter.fetch_rest_candles_blocking(&blocking_req)
    })
    .await
    .expect("blocking task")
    .expect("blocking fetch");

    assert_eq!(from_async.len(), from_sync.len());
    for (a, b) in from_async.iter().zip(&from_sync) {
        assert_eq!(a.timestamp, b.timestamp);
        assert_eq!(a.close, b.close);
        assert_eq!(a.volume, b.volume);
    }

    server.stop().await;
}

// ---------------------------------------------------------------------------
// A real-exchange wire format end-to-end
// ---------------------------------------------------------------------------

#[tokio::test]
async fn binance_feed_runs_against_the_binance_mock_server() {
    let server = create_mock_server(
        ExchangeType::BinanceSpot,
        "127.0.0.1",
        0,
        &[("BTC", "USDT", Decimal::from(50_000))],
    )
    .await
    .expect("binance mock server");

    let feed = CandlesFeed::new("binance_spot", "BTC-USDT", "1m", 3, None).expect("feed");
    let _patch = patch_adapter_urls(feed.adapter(), &server);

    feed.start(StrategyKind::Rest).await.expect("start");
    assert!(
        wait_for(Duration::from_secs(5), || feed.ready()).await,
        "binance feed never filled"
    );

    let candles = feed.get_candles().await;
    assert_eq!(candles.len(), 3);
    for window in candles.windows(2) {
        assert_eq!(window[1].timestamp - window[0].timestamp, 60);
    }

    feed.stop().await;
    server.stop().await;
}

#[tokio::test]
async fn hyperliquid_feed_queries_candles_over_post() {
    let server = create_mock_server(
        ExchangeType::Hyperliquid,
        "127.0.0.1",
        0,
        &[("BTC", "USD", Decimal::from(50_000))],
    )
    .await
    .expect("hyperliquid mock server");

    let feed = CandlesFeed::new("hyperliquid", "BTC-USD", "1m", 3, None).expect("feed");
    let _patch = patch_adapter_urls(feed.adapter(), &server);

    feed.start(StrategyKind::Rest).await.expect("start");
    assert!(
        wait_for(Duration::from_secs(5), || feed.ready()).await,
        "hyperliquid feed never filled"
    );

    let candles = feed.get_candles().await;
    assert_eq!(candles.len(), 3);
    for window in candles.windows(2) {
        assert_eq!(window[1].timestamp - window[0].timestamp, 60);
    }

    feed.stop().await;
    server.stop().await;
}

// ---------------------------------------------------------------------------
// Server behaviors: determinism, rate limits, faults, latency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn synthesized_windows_are_deterministic_under_a_fake_clock() {
    let clock = Arc::new(FakeClock::new(1_700_003_600));
    let server = create_mock_server_with(
        ExchangeType::Mock,
        "127.0.0.1",
        0,
        &[("BTC", "USDT", Decimal::from(50_000))],
        ServerOptions {
            seed: 5,
            clock: clock.clone(),
            ..ServerOptions::default()
        },
    )
    .await
    .expect("server");

    let adapter = adapters::get_adapter_instance("mock", None).expect("adapter");
    let _patch = patch_adapter_urls(adapter.clone(), &server);
    let client = NetworkClient::new().expect("client");
    let req = CandlesRequest::latest(pair("BTC-USDT"), interval("1m"), 5);

    let first = adapter.fetch_rest_candles(&req, &client).await.expect("fetch");
    let second = adapter.fetch_rest_candles(&req, &client).await.expect("fetch");

    assert_eq!(first.len(), 5);
    // Newest bucket ends at the fake clock's aligned now.
    assert_eq!(first.last().unwrap().timestamp, 1_700_003_580);
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.timestamp, b.timestamp);
        assert_eq!(a.close, b.close);
        assert_eq!(a.volume, b.volume);
    }

    server.stop().await;
}

#[tokio::test]
async fn over_limit_clients_get_429_with_the_exchange_error_body() {
    let server = create_mock_server_with(
        ExchangeType::BinanceSpot,
        "127.0.0.1",
        0,
        &[("BTC", "USDT", Decimal::from(50_000))],
        ServerOptions {
            rest_limits: RateLimitConfig {
                per_second: 0.000_001,
                burst: 2,
            },
            ..ServerOptions::default()
        },
    )
    .await
    .expect("server");

    let client = NetworkClient::new().expect("client");
    let url = format!("{}/api/v3/klines", server.rest_url());
    let params = vec![
        ("symbol".to_owned(), "BTCUSDT".to_owned()),
        ("interval".to_owned(), "1m".to_owned()),
        ("limit".to_owned(), "2".to_owned()),
    ];

    client.get_rest_data(&url, &params).await.expect("first request passes");
    client.get_rest_data(&url, &params).await.expect("second request passes");
    let err = client.get_rest_data(&url, &params).await.unwrap_err();
    match err {
        FeedError::HttpStatus { status, body } => {
            assert_eq!(status.as_u16(), 429);
            assert!(body.contains("-1003"), "Binance-shaped error body: {body}");
        }
        other => panic!("expected HTTP 429, got {other}"),
    }
    assert!(
        client.get_rest_data(&url, &params).await.unwrap_err().is_transient()
    );

    server.stop().await;
}

#[tokio::test]
async fn injected_faults_surface_as_transport_and_json_errors() {
    let server = mock_server_with_btc().await;
    server
        .seed_candles(&pair("BTC-USDT"), interval("1m"), minute_bars(1_700_000_000, 50_000, 3))
        .await;
    let client = NetworkClient::new().expect("client");
    let url = format!("{}/api/candles", server.rest_url());
    let params = vec![
        ("symbol".to_owned(), "BTC-USDT".to_owned()),
        ("interval".to_owned(), "1m".to_owned()),
    ];

    server.set_faults(FaultConfig {
        error_probability: 1.0,
        ..FaultConfig::default()
    });
    let err = client.get_rest_data(&url, &params).await.unwrap_err();
    assert!(matches!(err, FeedError::HttpStatus { status, .. } if status.as_u16() == 500));

    server.set_faults(FaultConfig {
        malformed_probability: 1.0,
        ..FaultConfig::default()
    });
    let err = client.get_rest_data(&url, &params).await.unwrap_err();
    assert!(matches!(err, FeedError::Json(_)));

    // Faults off again: requests succeed.
    server.set_faults(FaultConfig::default());
    assert!(client.get_rest_data(&url, &params).await.is_ok());

    server.stop().await;
}

#[tokio::test]
async fn latency_window_delays_responses() {
    let server = mock_server_with_btc().await;
    server
        .seed_candles(&pair("BTC-USDT"), interval("1m"), minute_bars(1_700_000_000, 50_000, 3))
        .await;
    server.set_latency(LatencyConfig {
        latency_ms: 120,
        jitter_ms: 20,
    });

    let client = NetworkClient::new().expect("client");
    let url = format!("{}/api/candles", server.rest_url());
    let params = vec![
        ("symbol".to_owned(), "BTC-USDT".to_owned()),
        ("interval".to_owned(), "1m".to_owned()),
    ];

    let started = tokio::time::Instant::now();
    client.get_rest_data(&url, &params).await.expect("request succeeds");
    assert!(
        started.elapsed() >= Duration::from_millis(100),
        "latency window was not applied"
    );

    server.stop().await;
}

#[tokio::test]
async fn unknown_symbols_get_the_exchange_shaped_bad_request() {
    let server = mock_server_with_btc().await;
    let client = NetworkClient::new().expect("client");
    let url = format!("{}/api/candles", server.rest_url());
    let params = vec![
        ("symbol".to_owned(), "DOGE-USDT".to_owned()),
        ("interval".to_owned(), "1m".to_owned()),
    ];

    let err = client.get_rest_data(&url, &params).await.unwrap_err();
    assert!(matches!(err, FeedError::HttpStatus { status, .. } if status.as_u16() == 400));

    server.stop().await;
}
