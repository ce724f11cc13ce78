//! The in-process mock exchange server.
//!
//! An HTTP + WebSocket server parameterized by an [`ExchangePlugin`]. The
//! server owns the canonical candle store and all I/O; the plugin shapes
//! wire payloads. Route handlers simulate latency, enforce per-client-IP
//! rate limits, and sample the fault config before delegating to the
//! plugin.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex as StdMutex, RwLock as StdRwLock};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodFilter, any, on};
use axum::{Json, Router};
use rust_decimal::Decimal;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;

use crate::constants::SHUTDOWN_DEADLINE;
use crate::error::{FeedError, Result};
use crate::mock_server::clock::Clock;
use crate::mock_server::factory::CandleDataFactory;
use crate::mock_server::faults::{FaultConfig, FaultKind, LatencyConfig};
use crate::mock_server::plugin::{ExchangePlugin, RestRequest};
use crate::mock_server::rate_limit::{RateLimitConfig, RateLimiter};
use crate::types::{CandleData, Interval, TradingPair};

/// Default number of candles served when a request names no limit.
const DEFAULT_RESPONSE_LIMIT: usize = 500;

/// Hard cap on candles per response.
const MAX_RESPONSE_LIMIT: usize = 1500;

/// How long a "dropped" response stalls before giving up.
const DROP_STALL: Duration = Duration::from_secs(600);

// ---------------------------------------------------------------------------
// Options & shared state
// ---------------------------------------------------------------------------

/// Construction-time knobs for a mock server.
pub struct ServerOptions {
    /// Seed for deterministic candle synthesis.
    pub seed: u64,
    /// Time source for candle generation and rate limiting.
    pub clock: Arc<dyn Clock>,
    /// Simulated response latency window.
    pub latency: LatencyConfig,
    /// REST rate limits (per client IP).
    pub rest_limits: RateLimitConfig,
    /// WebSocket message rate limits (per client IP).
    pub ws_limits: RateLimitConfig,
    /// Fault-injection probabilities.
    pub faults: FaultConfig,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            seed: 42,
            clock: Arc::new(crate::mock_server::clock::SystemClock),
            latency: LatencyConfig::default(),
            rest_limits: RateLimitConfig::unlimited(),
            ws_limits: RateLimitConfig::unlimited(),
            faults: FaultConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
struct WsPush {
    key: String,
    text: String,
}

struct ServerState {
    plugin: Arc<dyn ExchangePlugin>,
    clock: Arc<dyn Clock>,
    factory: CandleDataFactory,
    /// Registered pairs and their seed prices.
    pairs: StdRwLock<HashMap<TradingPair, Decimal>>,
    /// The canonical candle store: pair → interval → ordered candles.
    candles: Mutex<HashMap<(TradingPair, Interval), BTreeMap<i64, CandleData>>>,
    rest_limiter: StdMutex<RateLimiter>,
    ws_limiter: StdMutex<RateLimiter>,
    latency: StdMutex<LatencyConfig>,
    faults: StdMutex<FaultConfig>,
    /// Broadcasts to WS subscribers, multiplexed by subscription key.
    ws_tx: broadcast::Sender<WsPush>,
    /// Control channel that force-closes every live WS connection.
    ws_close_tx: broadcast::Sender<()>,
}

// ---------------------------------------------------------------------------
// MockedExchangeServer
// ---------------------------------------------------------------------------

/// A started mock exchange server bound to a local address.
pub struct MockedExchangeServer {
    state: Arc<ServerState>,
    addr: SocketAddr,
    ws_path: &'static str,
    shutdown_tx: watch::Sender<bool>,
    task: StdMutex<Option<JoinHandle<()>>>,
}

impl MockedExchangeServer {
    /// Bind and start a server for the given plugin. Use port 0 for an
    /// ephemeral port.
    pub async fn start(
        plugin: Arc<dyn ExchangePlugin>,
        host: &str,
        port: u16,
        options: ServerOptions,
    ) -> Result<Self> {
        let (ws_tx, _) = broadcast::channel(1024);
        let (ws_close_tx, _) = broadcast::channel(8);
        let state = Arc::new(ServerState {
            factory: CandleDataFactory::new(options.seed),
            clock: options.clock,
            pairs: StdRwLock::new(HashMap::new()),
            candles: Mutex::new(HashMap::new()),
            rest_limiter: StdMutex::new(RateLimiter::new(options.rest_limits)),
            ws_limiter: StdMutex::new(RateLimiter::new(options.ws_limits)),
            latency: StdMutex::new(options.latency),
            faults: StdMutex::new(options.faults),
            ws_tx,
            ws_close_tx,
            plugin,
        });

        let mut router: Router<Arc<ServerState>> = Router::new();
        for route in state.plugin.rest_routes() {
            let handler_name = route.handler;
            router = router.route(
                route.path,
                on(
                    method_filter(&route.method),
                    move |State(state): State<Arc<ServerState>>,
                          ConnectInfo(addr): ConnectInfo<SocketAddr>,
                          Path(path_params): Path<HashMap<String, String>>,
                          Query(query): Query<HashMap<String, String>>,
                          uri: Uri,
                          body: Bytes| async move {
                        let request = RestRequest {
                            path: uri.path().to_owned(),
                            query,
                            path_params,
                            body: serde_json::from_slice(&body).ok(),
                        };
                        dispatch_rest(state, handler_name, request, addr).await
                    },
                ),
            );
        }
        let ws_path = state
            .plugin
            .ws_routes()
            .first()
            .map(|r| r.path)
            .unwrap_or("/ws");
        for route in state.plugin.ws_routes() {
            router = router.route(
                route.path,
                any(
                    |State(state): State<Arc<ServerState>>,
                     ConnectInfo(addr): ConnectInfo<SocketAddr>,
                     ws: WebSocketUpgrade| async move {
                        ws.on_upgrade(move |socket| handle_ws(state, socket, addr))
                    },
                ),
            );
        }

        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|e| FeedError::Fatal(format!("mock server bind failed: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| FeedError::Fatal(format!("mock server local_addr failed: {e}")))?;

        let app = router
            .with_state(state.clone())
            .into_make_service_with_connect_info::<SocketAddr>();
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        });
        let task = tokio::spawn(async move {
            if let Err(e) = server.await {
                tracing::error!(error = %e, "mock server exited with error");
            }
        });

        tracing::info!(plugin = state.plugin.name(), %addr, "mock exchange server started");
        Ok(Self {
            state,
            addr,
            ws_path,
            shutdown_tx,
            task: StdMutex::new(Some(task)),
        })
    }

    /// The bound socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL for REST requests.
    pub fn rest_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Full WebSocket URL.
    pub fn ws_url(&self) -> String {
        format!("ws://{}{}", self.addr, self.ws_path)
    }

    /// Register a trading pair with its synthesis seed price.
    pub fn add_trading_pair(&self, pair: TradingPair, seed_price: Decimal) {
        self.state
            .pairs
            .write()
            .expect("pairs lock poisoned")
            .insert(pair, seed_price);
    }

    /// Insert candles into the server's canonical store.
    pub async fn seed_candles(
        &self,
        pair: &TradingPair,
        interval: Interval,
        candles: Vec<CandleData>,
    ) {
        let mut store = self.state.candles.lock().await;
        let entry = store.entry((pair.clone(), interval)).or_default();
        for candle in candles {
            entry.insert(candle.timestamp, candle);
        }
    }

    /// A snapshot of the server's stored candles for one series.
    pub async fn stored_candles(&self, pair: &TradingPair, interval: Interval) -> Vec<CandleData> {
        self.state
            .candles
            .lock()
            .await
            .get(&(pair.clone(), interval))
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Store a candle and broadcast it to WS subscribers of its
    /// subscription key.
    pub async fn push_ws_candle(
        &self,
        pair: &TradingPair,
        interval: Interval,
        candle: CandleData,
        is_final: bool,
    ) {
        {
            let mut store = self.state.candles.lock().await;
            store
                .entry((pair.clone(), interval))
                .or_default()
                .insert(candle.timestamp, candle.clone());
        }
        let plugin = &self.state.plugin;
        let symbol = plugin.exchange_symbol(pair);
        let token = plugin.interval_token(interval);
        let key = plugin.create_ws_subscription_key(&symbol, &token);
        let text = plugin
            .format_ws_candle_message(&candle, pair, interval, is_final)
            .to_string();
        let receivers = self.state.ws_tx.send(WsPush { key, text }).unwrap_or(0);
        tracing::debug!(pair = %pair, receivers, "WS candle pushed");
    }

    /// Force-close every live WS connection (clients see a server-side
    /// drop and reconnect).
    pub fn drop_ws_connections(&self) {
        let _ = self.state.ws_close_tx.send(());
    }

    /// Replace the fault-injection config.
    pub fn set_faults(&self, faults: FaultConfig) {
        *self.state.faults.lock().expect("faults lock poisoned") = faults;
    }

    /// Replace the simulated latency window.
    pub fn set_latency(&self, latency: LatencyConfig) {
        *self.state.latency.lock().expect("latency lock poisoned") = latency;
    }

    /// Replace the REST rate limits, resetting all buckets.
    pub fn set_rest_limits(&self, limits: RateLimitConfig) {
        self.state
            .rest_limiter
            .lock()
            .expect("rest limiter lock poisoned")
            .reconfigure(limits);
    }

    /// Replace the WS rate limits, resetting all buckets.
    pub fn set_ws_limits(&self, limits: RateLimitConfig) {
        self.state
            .ws_limiter
            .lock()
            .expect("ws limiter lock poisoned")
            .reconfigure(limits);
    }

    /// Stop listening, close WS connections, and await per-connection
    /// tasks up to the shutdown deadline.
    pub async fn stop(&self) {
        let _ = self.state.ws_close_tx.send(());
        let _ = self.shutdown_tx.send(true);
        let task = self.task.lock().expect("server task lock poisoned").take();
        if let Some(mut task) = task {
            if tokio::time::timeout(SHUTDOWN_DEADLINE, &mut task)
                .await
                .is_err()
            {
                tracing::warn!("mock server missed the shutdown deadline, aborting");
                task.abort();
            }
        }
    }
}

impl Drop for MockedExchangeServer {
    fn drop(&mut self) {
        let _ = self.state.ws_close_tx.send(());
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.lock().expect("server task lock poisoned").take() {
            task.abort();
        }
    }
}

fn method_filter(method: &Method) -> MethodFilter {
    match *method {
        Method::POST => MethodFilter::POST,
        Method::PUT => MethodFilter::PUT,
        Method::DELETE => MethodFilter::DELETE,
        _ => MethodFilter::GET,
    }
}

// ---------------------------------------------------------------------------
// REST dispatch
// ---------------------------------------------------------------------------

fn json_response(status: StatusCode, body: serde_json::Value) -> Response {
    (status, Json(body)).into_response()
}

fn error_response(state: &ServerState, status: StatusCode, reason: &str) -> Response {
    json_response(status, state.plugin.rest_error_body(status, reason))
}

async fn dispatch_rest(
    state: Arc<ServerState>,
    handler: &'static str,
    request: RestRequest,
    addr: SocketAddr,
) -> Response {
    let delay_ms = state
        .latency
        .lock()
        .expect("latency lock poisoned")
        .sample_ms();
    if delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    let allowed = state
        .rest_limiter
        .lock()
        .expect("rest limiter lock poisoned")
        .try_acquire(addr.ip(), state.clock.now_millis());
    if !allowed {
        tracing::debug!(ip = %addr.ip(), "REST rate limit exceeded");
        return error_response(&state, StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded");
    }

    let fault = state.faults.lock().expect("faults lock poisoned").sample();
    match fault {
        Some(FaultKind::Drop) => {
            tracing::debug!(path = %request.path, "dropping response");
            tokio::time::sleep(DROP_STALL).await;
            return StatusCode::GATEWAY_TIMEOUT.into_response();
        }
        Some(FaultKind::MalformedJson) => {
            tracing::debug!(path = %request.path, "corrupting response");
            return (StatusCode::OK, "{\"candles\":[tr").into_response();
        }
        Some(FaultKind::ServerError) => {
            tracing::debug!(path = %request.path, "injecting transient 500");
            return error_response(
                &state,
                StatusCode::INTERNAL_SERVER_ERROR,
                "transient server error",
            );
        }
        None => {}
    }

    match handler {
        "candles" => handle_candles(&state, &request).await,
        "ping" => json_response(StatusCode::OK, state.plugin.ping_body()),
        other => match state.plugin.extra_rest(other, &request) {
            Some(body) => json_response(StatusCode::OK, body),
            None => error_response(&state, StatusCode::NOT_FOUND, "unknown route"),
        },
    }
}

async fn handle_candles(state: &Arc<ServerState>, request: &RestRequest) -> Response {
    let params = match state.plugin.parse_rest_candles_params(request) {
        Ok(params) => params,
        Err(e) => return error_response(state, StatusCode::BAD_REQUEST, &e.to_string()),
    };
    let pair = match state.plugin.normalize_trading_pair(&params.symbol) {
        Ok(pair) => pair,
        Err(e) => return error_response(state, StatusCode::BAD_REQUEST, &e.to_string()),
    };
    let interval = match state.plugin.interval_from_token(&params.interval) {
        Ok(interval) => interval,
        Err(e) => return error_response(state, StatusCode::BAD_REQUEST, &e.to_string()),
    };
    let seed_price = state
        .pairs
        .read()
        .expect("pairs lock poisoned")
        .get(&pair)
        .copied();
    let Some(seed_price) = seed_price else {
        return error_response(state, StatusCode::BAD_REQUEST, "unknown symbol");
    };

    let limit = params
        .limit
        .unwrap_or(DEFAULT_RESPONSE_LIMIT)
        .clamp(1, MAX_RESPONSE_LIMIT);
    let width = interval.seconds() as i64;

    let mut store = state.candles.lock().await;
    let entry = store.entry((pair.clone(), interval)).or_default();

    let result: Vec<CandleData> = match (params.start_time, params.end_time) {
        // No window: the most recent `limit` candles. Synthesis only kicks
        // in when nothing has been seeded, so seeded tests stay exact.
        (None, None) => {
            if entry.is_empty() {
                let end = interval.align(state.clock.now_secs());
                let start = end - (limit as i64 - 1) * width;
                for candle in
                    state
                        .factory
                        .candles_between(&pair, interval, start, end, seed_price)
                {
                    entry.insert(candle.timestamp, candle);
                }
            }
            let skip = entry.len().saturating_sub(limit);
            entry.values().skip(skip).cloned().collect()
        }
        // Explicit window: synthesize any missing buckets so any
        // historical range is served consistently.
        (start_opt, end_opt) => {
            let end = end_opt.unwrap_or_else(|| interval.align(state.clock.now_secs()));
            let start = start_opt.unwrap_or(end - (limit as i64 - 1) * width);
            if start > end {
                return error_response(state, StatusCode::BAD_REQUEST, "start after end");
            }
            let mut ts = interval.align(start);
            if ts < start {
                ts += width;
            }
            while ts <= end {
                entry
                    .entry(ts)
                    .or_insert_with(|| state.factory.candle_at(&pair, interval, ts, seed_price));
                ts += width;
            }
            let window: Vec<CandleData> = entry
                .range(start..=end)
                .map(|(_, c)| c.clone())
                .collect();
            if start_opt.is_some() {
                window.into_iter().take(limit).collect()
            } else {
                let skip = window.len().saturating_sub(limit);
                window.into_iter().skip(skip).collect()
            }
        }
    };
    drop(store);

    let body = state.plugin.format_rest_candles(&result, &pair, interval);
    json_response(StatusCode::OK, body)
}

// ---------------------------------------------------------------------------
// WebSocket handling
// ---------------------------------------------------------------------------

async fn handle_ws(state: Arc<ServerState>, mut socket: WebSocket, addr: SocketAddr) {
    let mut subscriptions: HashSet<String> = HashSet::new();
    let mut push_rx = state.ws_tx.subscribe();
    let mut close_rx = state.ws_close_tx.subscribe();
    tracing::debug!(ip = %addr.ip(), "WS client connected");

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(WsMessage::Text(text))) => {
                    handle_ws_text(&state, &mut socket, &mut subscriptions, addr, text.as_str())
                        .await;
                }
                Some(Ok(WsMessage::Ping(data))) => {
                    let _ = socket.send(WsMessage::Pong(data)).await;
                }
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(ip = %addr.ip(), error = %e, "WS read error");
                    break;
                }
            },
            push = push_rx.recv() => {
                if let Ok(push) = push {
                    if subscriptions.contains(&push.key)
                        && socket.send(WsMessage::Text(push.text.into())).await.is_err()
                    {
                        break;
                    }
                }
            }
            _ = close_rx.recv() => {
                let _ = socket.send(WsMessage::Close(None)).await;
                break;
            }
        }
    }
    tracing::debug!(ip = %addr.ip(), "WS client disconnected");
}

async fn handle_ws_text(
    state: &Arc<ServerState>,
    socket: &mut WebSocket,
    subscriptions: &mut HashSet<String>,
    addr: SocketAddr,
    text: &str,
) {
    let allowed = state
        .ws_limiter
        .lock()
        .expect("ws limiter lock poisoned")
        .try_acquire(addr.ip(), state.clock.now_millis());
    if !allowed {
        send_json(socket, &state.plugin.ws_error_reply("rate limit exceeded")).await;
        return;
    }

    let message: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => {
            send_json(socket, &state.plugin.ws_error_reply("invalid JSON")).await;
            return;
        }
    };

    let parsed = state.plugin.parse_ws_subscription(&message);
    if parsed.is_empty() {
        send_json(
            socket,
            &state.plugin.ws_error_reply("unrecognized subscription"),
        )
        .await;
        return;
    }

    for (symbol, token) in &parsed {
        let key = state.plugin.create_ws_subscription_key(symbol, token);
        tracing::debug!(ip = %addr.ip(), %key, "WS subscribed");
        subscriptions.insert(key);
    }
    if let Some(ack) = state.plugin.ws_subscription_ack(&message, &parsed) {
        send_json(socket, &ack).await;
    }
}

async fn send_json(socket: &mut WebSocket, value: &serde_json::Value) {
    let _ = socket.send(WsMessage::Text(value.to_string().into())).await;
}
