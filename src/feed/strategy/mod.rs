//! Collection strategies: how candles get from an exchange into a feed
//! store.
//!
//! Two variants exist under the common [`CollectionStrategy`] contract:
//! [`rest::RestPollingStrategy`] and [`websocket::WebSocketStrategy`]. The
//! feed owns one instance per active feed and runs it in a supervised task;
//! strategies recover transient failures internally and never kill the
//! feed.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast, watch};

use crate::adapters::ExchangeAdapter;
use crate::constants::GAP_BACKFILL_RETRIES;
use crate::error::{FeedError, Result};
use crate::feed::FeedEvent;
use crate::feed::store::CandleStore;
use crate::network::NetworkClient;
use crate::processor;
use crate::types::{CandleData, CandlesRequest, Interval, TradingPair};

pub mod rest;
pub mod websocket;

pub(crate) use rest::RestPollingStrategy;
pub(crate) use websocket::WebSocketStrategy;

// ---------------------------------------------------------------------------
// Strategy selection
// ---------------------------------------------------------------------------

/// Which collection strategy to launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    /// Prefer WebSocket when the adapter can stream the interval; fall
    /// back to REST polling otherwise.
    #[default]
    Auto,
    /// Force REST polling.
    Rest,
    /// Force WebSocket streaming; fails if the adapter can't stream the
    /// interval.
    WebSocket,
}

impl FromStr for StrategyKind {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(StrategyKind::Auto),
            "rest" => Ok(StrategyKind::Rest),
            "websocket" => Ok(StrategyKind::WebSocket),
            other => Err(FeedError::InvalidArgument(format!(
                "unknown strategy {other:?} (expected auto, rest, or websocket)"
            ))),
        }
    }
}

/// Resolve a [`StrategyKind`] against an adapter's capabilities.
///
/// Auto prefers WebSocket when the adapter's async surface is genuine and
/// the interval is streamable; an explicit WebSocket request on an
/// incompatible adapter fails instead of falling back.
pub fn select_strategy(
    kind: StrategyKind,
    adapter: &dyn ExchangeAdapter,
    interval: Interval,
) -> Result<StrategyKind> {
    let ws_capable =
        adapter.io_capability().is_native_async() && adapter.supports_ws_interval(interval);
    match kind {
        StrategyKind::Rest => Ok(StrategyKind::Rest),
        StrategyKind::WebSocket if ws_capable => Ok(StrategyKind::WebSocket),
        StrategyKind::WebSocket => Err(FeedError::InvalidArgument(format!(
            "{} cannot stream {} over WebSocket",
            adapter.name(),
            interval
        ))),
        StrategyKind::Auto if ws_capable => Ok(StrategyKind::WebSocket),
        StrategyKind::Auto => Ok(StrategyKind::Rest),
    }
}

// ---------------------------------------------------------------------------
// The strategy contract
// ---------------------------------------------------------------------------

/// The common strategy contract.
///
/// `run` is the supervised loop; it returns only when the shutdown signal
/// flips (or after an unrecoverable internal exit, which the feed's
/// supervisor answers with a restart). `poll_once` is a direct one-shot
/// REST read usable regardless of the running strategy.
#[async_trait]
pub trait CollectionStrategy: Send + Sync {
    /// Short human label for logs (`"rest"` / `"websocket"`).
    fn label(&self) -> &'static str;

    /// Fetch the latest candles once, without touching the store.
    async fn poll_once(&self) -> Result<Vec<CandleData>>;

    /// Collect until `shutdown` flips true.
    async fn run(&self, shutdown: watch::Receiver<bool>);
}

// ---------------------------------------------------------------------------
// Shared strategy state
// ---------------------------------------------------------------------------

/// Everything a strategy needs: the adapter, the network client, the feed
/// identity, and the store it writes through.
#[derive(Clone)]
pub(crate) struct StrategyContext {
    pub adapter: Arc<dyn ExchangeAdapter>,
    pub client: NetworkClient,
    pub pair: TradingPair,
    pub interval: Interval,
    pub max_records: usize,
    pub store: Arc<RwLock<CandleStore>>,
    pub events: broadcast::Sender<FeedEvent>,
}

impl StrategyContext {
    /// Fetch the most recent `max_records` candles.
    pub async fn fetch_latest(&self) -> Result<Vec<CandleData>> {
        let req = CandlesRequest::latest(self.pair.clone(), self.interval, self.max_records);
        self.adapter.fetch_rest_candles(&req, &self.client).await
    }

    /// Sanitize and merge a batch into the store. Returns the number of
    /// candles that survived sanitization.
    pub async fn merge_into_store(&self, candles: Vec<CandleData>) -> usize {
        let clean = processor::sanitize(candles);
        if clean.is_empty() {
            return 0;
        }
        let count = {
            let mut store = self.store.write().await;
            store.merge(clean)
        };
        let _ = self.events.send(FeedEvent::CandlesMerged { count });
        count
    }

    /// Detect gaps in the store and backfill each with a targeted REST
    /// read (sequential, bounded retry budget).
    pub async fn backfill_gaps(&self) {
        let snapshot = self.store.read().await.snapshot();
        let gaps = processor::detect_gaps(&snapshot, self.interval.seconds());
        for (prev, next) in gaps {
            tracing::warn!(
                pair = %self.pair,
                interval = %self.interval,
                prev,
                next,
                "gap detected, scheduling backfill"
            );
            let _ = self.events.send(FeedEvent::GapDetected { prev, next });
            self.backfill_window(prev, next).await;
        }
    }

    async fn backfill_window(&self, start: i64, end: i64) {
        let req = match CandlesRequest::window(
            self.pair.clone(),
            self.interval,
            Some(start),
            Some(end),
            None,
        ) {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(error = %e, "invalid backfill window");
                return;
            }
        };
        for attempt in 1..=GAP_BACKFILL_RETRIES {
            match self.adapter.fetch_rest_candles(&req, &self.client).await {
                Ok(candles) => {
                    self.merge_into_store(candles).await;
                    return;
                }
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        error = %e,
                        start,
                        end,
                        "gap backfill attempt failed"
                    );
                }
            }
        }
        tracing::error!(start, end, "gap backfill exhausted its retry budget");
    }
}
