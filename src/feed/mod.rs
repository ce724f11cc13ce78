//! The live candle feed: a bounded, gap-free, always-current in-memory
//! series for one (exchange, pair, interval) triple.
//!
//! ## Organization
//!
//! - [`store`] — The bounded ordered candle store
//! - [`strategy`] — REST polling and WebSocket streaming collection
//!   strategies under one contract
//!
//! A [`CandlesFeed`] resolves its adapter through the exchange registry,
//! launches a collection strategy as a supervised task, and exposes
//! snapshot access to the store. Strategy crashes are logged and the
//! strategy is restarted with backoff; a persistent failure leaves the
//! feed RUNNING with a stale store, observable through
//! [`CandlesFeed::check_network`].

use std::sync::{Arc, Mutex};

use tokio::sync::{RwLock, broadcast, watch};
use tokio::task::JoinHandle;

use crate::adapters::{self, ExchangeAdapter};
use crate::constants::{BACKOFF_INITIAL, BACKOFF_MAX, DEFAULT_MAX_RECORDS, SHUTDOWN_DEADLINE};
use crate::error::{FeedError, Result};
use crate::network::{EndpointKind, NetworkClient, NetworkConfig};
use crate::types::{CandleData, Interval, TradingPair};

pub mod store;
pub mod strategy;

use store::CandleStore;
use strategy::{
    CollectionStrategy, RestPollingStrategy, StrategyContext, StrategyKind, WebSocketStrategy,
    select_strategy,
};

// ---------------------------------------------------------------------------
// Feed state & events
// ---------------------------------------------------------------------------

/// Lifecycle state of a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    /// No strategy is running. The store is preserved and the feed can be
    /// started again.
    Stopped,
    /// A collection strategy is live (possibly mid-reconnect).
    Running,
}

/// Result of a [`CandlesFeed::check_network`] probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    /// The exchange answered a lightweight REST call.
    Connected,
    /// The probe failed at the transport level.
    NotConnected,
}

/// Observable feed activity, broadcast to [`CandlesFeed::subscribe_updates`]
/// receivers.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// A batch of candles was merged into the store.
    CandlesMerged {
        /// Candles inserted or replaced.
        count: usize,
    },
    /// Consecutive stored candles were more than one interval apart; a
    /// backfill was scheduled.
    GapDetected {
        /// Timestamp before the gap.
        prev: i64,
        /// Timestamp after the gap.
        next: i64,
    },
    /// The supervisor restarted a crashed strategy.
    StrategyRestarted,
}

struct FeedRuntime {
    state: FeedState,
    shutdown_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

// ---------------------------------------------------------------------------
// CandlesFeed
// ---------------------------------------------------------------------------

/// A live, bounded, ordered candle series for one (exchange, pair,
/// interval).
///
/// # Example
///
/// ```no_run
/// use candles_feed::feed::CandlesFeed;
/// use candles_feed::feed::strategy::StrategyKind;
///
/// # #[tokio::main]
/// # async fn main() -> candles_feed::error::Result<()> {
/// let feed = CandlesFeed::new("binance_spot", "BTC-USDT", "1m", 150, None)?;
/// feed.start(StrategyKind::Auto).await?;
/// let candles = feed.get_candles().await;
/// println!("{} candles, ready: {}", candles.len(), feed.ready().await);
/// feed.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct CandlesFeed {
    exchange: String,
    pair: TradingPair,
    interval: Interval,
    max_records: usize,
    adapter: Arc<dyn ExchangeAdapter>,
    client: NetworkClient,
    store: Arc<RwLock<CandleStore>>,
    events: broadcast::Sender<FeedEvent>,
    runtime: Mutex<FeedRuntime>,
}

impl CandlesFeed {
    /// Create a feed, resolving the adapter through the exchange registry.
    ///
    /// `pair` and `interval` are canonical tokens (`"BTC-USDT"`, `"1m"`).
    /// Fails with [`FeedError::UnknownExchange`] for unregistered names and
    /// [`FeedError::UnsupportedInterval`] when the adapter can't serve the
    /// interval.
    pub fn new(
        exchange: &str,
        pair: &str,
        interval: &str,
        max_records: usize,
        network_config: Option<NetworkConfig>,
    ) -> Result<Self> {
        let pair: TradingPair = pair.parse()?;
        let interval: Interval = interval.parse()?;
        let adapter = adapters::get_adapter_instance(exchange, network_config)?;
        adapter.check_interval(interval)?;
        let client = NetworkClient::new()?;
        let (events, _) = broadcast::channel(256);
        let max_records = if max_records == 0 {
            DEFAULT_MAX_RECORDS
        } else {
            max_records
        };

        Ok(Self {
            exchange: exchange.to_owned(),
            pair,
            interval,
            max_records,
            adapter,
            client,
            store: Arc::new(RwLock::new(CandleStore::new(max_records))),
            events,
            runtime: Mutex::new(FeedRuntime {
                state: FeedState::Stopped,
                shutdown_tx: None,
                task: None,
            }),
        })
    }

    /// The canonical exchange name.
    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// The feed's trading pair.
    pub fn pair(&self) -> &TradingPair {
        &self.pair
    }

    /// The feed's candle interval.
    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// The store's capacity bound.
    pub fn max_records(&self) -> usize {
        self.max_records
    }

    /// The feed's adapter (tests use this to patch URLs onto a mock
    /// server).
    pub fn adapter(&self) -> Arc<dyn ExchangeAdapter> {
        self.adapter.clone()
    }

    /// Subscribe to feed activity events.
    pub fn subscribe_updates(&self) -> broadcast::Receiver<FeedEvent> {
        self.events.subscribe()
    }

    /// Launch the collection strategy. Idempotent: starting a RUNNING feed
    /// is a no-op.
    pub async fn start(&self, kind: StrategyKind) -> Result<()> {
        let ctx = StrategyContext {
            adapter: self.adapter.clone(),
            client: self.client.clone(),
            pair: self.pair.clone(),
            interval: self.interval,
            max_records: self.max_records,
            store: self.store.clone(),
            events: self.events.clone(),
        };

        let mut rt = self.runtime.lock().expect("feed runtime lock poisoned");
        if rt.state == FeedState::Running {
            return Ok(());
        }

        let selected = select_strategy(kind, &*self.adapter, self.interval)?;
        let strategy: Arc<dyn CollectionStrategy> = match selected {
            StrategyKind::WebSocket => Arc::new(WebSocketStrategy::new(ctx)),
            _ => Arc::new(RestPollingStrategy::new(ctx)),
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let events = self.events.clone();
        let label = strategy.label();
        let task = tokio::spawn(supervise(strategy, shutdown_rx, events));

        rt.shutdown_tx = Some(shutdown_tx);
        rt.task = Some(task);
        rt.state = FeedState::Running;

        tracing::info!(
            exchange = %self.exchange,
            pair = %self.pair,
            interval = %self.interval,
            strategy = label,
            "feed started"
        );
        Ok(())
    }

    /// Stop the collection strategy, draining pending merges up to the
    /// shutdown deadline. Idempotent; the store is preserved and the feed
    /// can be started again.
    pub async fn stop(&self) {
        let (shutdown_tx, task) = {
            let mut rt = self.runtime.lock().expect("feed runtime lock poisoned");
            if rt.state == FeedState::Stopped {
                return;
            }
            rt.state = FeedState::Stopped;
            (rt.shutdown_tx.take(), rt.task.take())
        };

        if let Some(tx) = shutdown_tx {
            let _ = tx.send(true);
        }
        if let Some(mut task) = task {
            if tokio::time::timeout(SHUTDOWN_DEADLINE, &mut task)
                .await
                .is_err()
            {
                tracing::warn!(
                    exchange = %self.exchange,
                    pair = %self.pair,
                    "strategy missed the shutdown deadline, abandoning"
                );
                task.abort();
            }
        }
        tracing::info!(exchange = %self.exchange, pair = %self.pair, "feed stopped");
    }

    /// The feed's lifecycle state.
    pub fn state(&self) -> FeedState {
        self.runtime.lock().expect("feed runtime lock poisoned").state
    }

    /// A snapshot copy of the store, ascending in timestamp.
    pub async fn get_candles(&self) -> Vec<CandleData> {
        self.store.read().await.snapshot()
    }

    /// The oldest stored timestamp.
    pub async fn first_timestamp(&self) -> Option<i64> {
        self.store.read().await.first_timestamp()
    }

    /// The newest stored timestamp.
    pub async fn last_timestamp(&self) -> Option<i64> {
        self.store.read().await.last_timestamp()
    }

    /// True once the store has filled to `max_records`.
    pub async fn ready(&self) -> bool {
        self.store.read().await.ready()
    }

    /// Number of stored candles.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    /// Probe the exchange with a lightweight REST call. Never raises.
    pub async fn check_network(&self) -> NetworkStatus {
        let url = match self.adapter.rest_url(EndpointKind::Ticker) {
            Ok(url) => url,
            Err(_) => return NetworkStatus::NotConnected,
        };
        match self.client.get_rest_data(&url, &[]).await {
            Ok(_) => NetworkStatus::Connected,
            // A 2xx with a non-JSON body still proves the exchange is
            // reachable.
            Err(FeedError::Json(_)) => NetworkStatus::Connected,
            Err(e) => {
                tracing::debug!(exchange = %self.exchange, error = %e, "network probe failed");
                NetworkStatus::NotConnected
            }
        }
    }
}

impl Drop for CandlesFeed {
    fn drop(&mut self) {
        let mut rt = self.runtime.lock().expect("feed runtime lock poisoned");
        if let Some(tx) = rt.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(task) = rt.task.take() {
            task.abort();
        }
    }
}

/// Supervisor loop: run the strategy, and if it exits without a shutdown
/// signal, restart it with the reconnect backoff policy.
async fn supervise(
    strategy: Arc<dyn CollectionStrategy>,
    shutdown_rx: watch::Receiver<bool>,
    events: broadcast::Sender<FeedEvent>,
) {
    let mut backoff = BACKOFF_INITIAL;
    loop {
        let inner = {
            let strategy = strategy.clone();
            let rx = shutdown_rx.clone();
            tokio::spawn(async move { strategy.run(rx).await })
        };
        match inner.await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!(strategy = strategy.label(), error = %e, "strategy crashed");
            }
        }
        if *shutdown_rx.borrow() {
            break;
        }

        tracing::warn!(
            strategy = strategy.label(),
            backoff_secs = backoff.as_secs(),
            "strategy exited unexpectedly, restarting"
        );
        let _ = events.send(FeedEvent::StrategyRestarted);

        let mut rx = shutdown_rx.clone();
        tokio::select! {
            _ = tokio::time::sleep(backoff) => {}
            res = rx.changed() => {
                if res.is_err() || *rx.borrow() {
                    break;
                }
            }
        }
        backoff = (backoff * 2).min(BACKOFF_MAX);
    }
}
