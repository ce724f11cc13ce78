//! REST polling collection strategy.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::constants::{BACKOFF_INITIAL, BACKOFF_MAX, MAX_POLL_INTERVAL, MIN_POLL_INTERVAL};
use crate::error::Result;
use crate::feed::strategy::{CollectionStrategy, StrategyContext};
use crate::types::CandleData;

/// Polls the adapter's REST candle endpoint on a cadence equal to the
/// candle interval, clamped to `[1s, 60s]` to bound tail latency on long
/// intervals.
///
/// Each poll is sanitized and merged into the feed store, then detected
/// gaps are backfilled with targeted window reads. Transient transport
/// errors back off exponentially (1s doubling to 60s, reset on success)
/// and never kill the feed.
pub(crate) struct RestPollingStrategy {
    ctx: StrategyContext,
}

impl RestPollingStrategy {
    pub fn new(ctx: StrategyContext) -> Self {
        Self { ctx }
    }

    fn poll_cadence(&self) -> Duration {
        self.ctx
            .interval
            .duration()
            .clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL)
    }

    /// Sleep for `delay`, returning `true` if shutdown flipped meanwhile.
    async fn sleep_or_shutdown(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(delay) => false,
            res = shutdown.changed() => res.is_err() || *shutdown.borrow(),
        }
    }
}

#[async_trait]
impl CollectionStrategy for RestPollingStrategy {
    fn label(&self) -> &'static str {
        "rest"
    }

    async fn poll_once(&self) -> Result<Vec<CandleData>> {
        self.ctx.fetch_latest().await
    }

    async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let cadence = self.poll_cadence();
        let mut backoff = BACKOFF_INITIAL;
        tracing::info!(
            pair = %self.ctx.pair,
            interval = %self.ctx.interval,
            cadence_secs = cadence.as_secs(),
            "REST polling started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            match self.poll_once().await {
                Ok(candles) => {
                    self.ctx.merge_into_store(candles).await;
                    self.ctx.backfill_gaps().await;
                    backoff = BACKOFF_INITIAL;
                    if Self::sleep_or_shutdown(cadence, &mut shutdown).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        pair = %self.ctx.pair,
                        error = %e,
                        backoff_secs = backoff.as_secs(),
                        "poll failed, backing off"
                    );
                    if Self::sleep_or_shutdown(backoff, &mut shutdown).await {
                        break;
                    }
                    backoff = (backoff * 2).min(BACKOFF_MAX);
                }
            }
        }

        tracing::info!(pair = %self.ctx.pair, "REST polling stopped");
    }
}
