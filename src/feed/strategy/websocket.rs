//! WebSocket streaming collection strategy.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::constants::{
    BACKOFF_INITIAL, BACKOFF_JITTER, BACKOFF_MAX, BACKOFF_RESET_AFTER, WS_LIVENESS_FLOOR,
};
use crate::error::Result;
use crate::feed::strategy::{CollectionStrategy, StrategyContext};
use crate::types::CandleData;

/// How one streaming session ended.
enum SessionEnd {
    /// The shutdown signal flipped.
    Shutdown,
    /// The connection failed, closed, or went silent; reconnect.
    Dropped,
}

/// Streams candles over the adapter's WebSocket.
///
/// Per session: connect, send the subscription payload, seed the store
/// with a one-shot REST read of `max_records`, then merge every parsed
/// push. A still-forming bucket may arrive repeatedly and overwrites its
/// earlier snapshots. Sessions that drop reconnect with exponential
/// backoff (1s doubling to 60s, ±20% jitter), reset after a clean
/// streaming interval; the REST seed repeats on every reconnect. A
/// connection silent for `max(3 × interval, 30s)` is treated as dead and
/// force-cycled.
pub(crate) struct WebSocketStrategy {
    ctx: StrategyContext,
}

impl WebSocketStrategy {
    pub fn new(ctx: StrategyContext) -> Self {
        Self { ctx }
    }

    fn liveness_timeout(&self) -> Duration {
        let three_intervals = Duration::from_secs(3 * self.ctx.interval.seconds());
        three_intervals.max(WS_LIVENESS_FLOOR)
    }

    fn jittered(delay: Duration) -> Duration {
        let factor =
            rand::rng().random_range((1.0 - BACKOFF_JITTER)..=(1.0 + BACKOFF_JITTER));
        delay.mul_f64(factor)
    }

    async fn sleep_or_shutdown(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(delay) => false,
            res = shutdown.changed() => res.is_err() || *shutdown.borrow(),
        }
    }

    /// One connect → subscribe → seed → stream cycle.
    async fn stream_session(&self, shutdown: &mut watch::Receiver<bool>) -> SessionEnd {
        let ctx = &self.ctx;
        let url = ctx.adapter.ws_url();

        tracing::debug!(pair = %ctx.pair, %url, "WS connecting");
        let mut ws = match ctx.client.establish_ws_connection(&url).await {
            Ok(ws) => ws,
            Err(e) => {
                tracing::warn!(pair = %ctx.pair, error = %e, "WS connect failed");
                return SessionEnd::Dropped;
            }
        };

        let payload = match ctx.adapter.ws_subscription_payload(&ctx.pair, ctx.interval) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(pair = %ctx.pair, error = %e, "building subscription failed");
                return SessionEnd::Dropped;
            }
        };
        if let Err(e) = ws.send(&payload).await {
            tracing::warn!(pair = %ctx.pair, error = %e, "WS subscribe failed");
            return SessionEnd::Dropped;
        }

        // Seed the store before incremental updates so consumers see a
        // full series immediately; repeated on every reconnect.
        match ctx.fetch_latest().await {
            Ok(candles) => {
                ctx.merge_into_store(candles).await;
            }
            Err(e) => {
                tracing::warn!(pair = %ctx.pair, error = %e, "REST seed failed");
            }
        }
        ctx.backfill_gaps().await;

        let liveness = self.liveness_timeout();
        tracing::info!(pair = %ctx.pair, interval = %ctx.interval, "WS streaming");

        loop {
            tokio::select! {
                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() {
                        let _ = ws.disconnect().await;
                        return SessionEnd::Shutdown;
                    }
                }
                msg = tokio::time::timeout(liveness, ws.next_message()) => match msg {
                    Err(_) => {
                        tracing::warn!(
                            pair = %ctx.pair,
                            silent_secs = liveness.as_secs(),
                            "WS liveness timeout, cycling connection"
                        );
                        let _ = ws.disconnect().await;
                        return SessionEnd::Dropped;
                    }
                    Ok(None) => {
                        tracing::info!(pair = %ctx.pair, "WS closed by server");
                        return SessionEnd::Dropped;
                    }
                    Ok(Some(Err(e))) => {
                        tracing::warn!(pair = %ctx.pair, error = %e, "WS read error");
                        return SessionEnd::Dropped;
                    }
                    Ok(Some(Ok(value))) => match ctx.adapter.parse_ws_message(&value) {
                        Ok(candles) => {
                            if !candles.is_empty() {
                                ctx.merge_into_store(candles).await;
                                ctx.backfill_gaps().await;
                            }
                        }
                        Err(e) => {
                            // Shape mismatch: log with the payload, drop the
                            // message, keep the stream alive.
                            tracing::warn!(pair = %ctx.pair, error = %e, "dropping WS message");
                        }
                    },
                },
            }
        }
    }
}

#[async_trait]
impl CollectionStrategy for WebSocketStrategy {
    fn label(&self) -> &'static str {
        "websocket"
    }

    async fn poll_once(&self) -> Result<Vec<CandleData>> {
        self.ctx.fetch_latest().await
    }

    async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut backoff = BACKOFF_INITIAL;
        loop {
            if *shutdown.borrow() {
                break;
            }
            let session_start = Instant::now();
            match self.stream_session(&mut shutdown).await {
                SessionEnd::Shutdown => break,
                SessionEnd::Dropped => {
                    if session_start.elapsed() >= BACKOFF_RESET_AFTER {
                        backoff = BACKOFF_INITIAL;
                    }
                    let delay = Self::jittered(backoff);
                    tracing::info!(
                        pair = %self.ctx.pair,
                        delay_ms = delay.as_millis() as u64,
                        "WS reconnecting"
                    );
                    if Self::sleep_or_shutdown(delay, &mut shutdown).await {
                        break;
                    }
                    backoff = (backoff * 2).min(BACKOFF_MAX);
                }
            }
        }
        tracing::info!(pair = %self.ctx.pair, "WS streaming stopped");
    }
}
