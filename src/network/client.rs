//! HTTP and WebSocket I/O facade.
//!
//! [`NetworkClient`] wraps [`reqwest::Client`] for JSON-over-HTTP and
//! [`tokio_tungstenite`] for WebSocket streams. All feed-engine suspension
//! points live inside these operations; adapters and strategies receive a
//! client explicitly — it is never a global — so tests can point them at a
//! mock server.
//!
//! [`BlockingNetworkClient`] is the synchronous twin used by sync-capable
//! adapters; it must only be used from a blocking context (a plain thread
//! or `tokio::task::spawn_blocking`).

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use reqwest::Method;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::constants::{HTTP_CONNECT_TIMEOUT, HTTP_MAX_REDIRECTS, HTTP_TOTAL_TIMEOUT};
use crate::error::{FeedError, Result};

// ---------------------------------------------------------------------------
// NetworkClient
// ---------------------------------------------------------------------------

/// Async HTTP + WebSocket client.
///
/// Cloning is cheap and clones share one connection pool, so every feed in
/// a process can hold the same client.
#[derive(Debug, Clone)]
pub struct NetworkClient {
    http: reqwest::Client,
}

impl NetworkClient {
    /// Create a client with the default timeouts (connect 10s, total 30s)
    /// and bounded redirect depth.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Start building a client with custom timeouts.
    pub fn builder() -> NetworkClientBuilder {
        NetworkClientBuilder {
            connect_timeout: HTTP_CONNECT_TIMEOUT,
            total_timeout: HTTP_TOTAL_TIMEOUT,
        }
    }

    /// Issue a GET request and decode the JSON response.
    ///
    /// Non-2xx responses raise [`FeedError::HttpStatus`] carrying the status
    /// and body.
    pub async fn get_rest_data(&self, url: &str, params: &[(String, String)]) -> Result<Value> {
        self.request(Method::GET, url, params, &[], None).await
    }

    /// [`NetworkClient::get_rest_data`] with extra request headers, for
    /// exchanges that demand API keys on public endpoints.
    pub async fn get_rest_data_with_headers(
        &self,
        url: &str,
        params: &[(String, String)],
        headers: &[(&str, &str)],
    ) -> Result<Value> {
        self.request(Method::GET, url, params, headers, None).await
    }

    /// Issue a POST request with a JSON body and decode the response.
    pub async fn post_rest_data(
        &self,
        url: &str,
        params: &[(String, String)],
        body: &Value,
    ) -> Result<Value> {
        self.request(Method::POST, url, params, &[], Some(body)).await
    }

    async fn request(
        &self,
        method: Method,
        url: &str,
        params: &[(String, String)],
        headers: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value> {
        tracing::debug!(%url, %method, "REST request");

        let mut req = self.http.request(method, url);
        if !params.is_empty() {
            req = req.query(params);
        }
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await.unwrap_or_default();

        if status.is_success() {
            serde_json::from_slice(&bytes).map_err(FeedError::Json)
        } else {
            Err(FeedError::HttpStatus {
                status,
                body: String::from_utf8_lossy(&bytes).into_owned(),
            })
        }
    }

    /// Open a WebSocket connection and return its [`WsAssistant`] handle.
    pub async fn establish_ws_connection(&self, url: &str) -> Result<WsAssistant> {
        tracing::debug!(%url, "WS connect");
        let (ws, _resp) = connect_async(url).await?;
        let (write, read) = ws.split();
        Ok(WsAssistant {
            write,
            read,
            closed: false,
        })
    }
}

/// Builder for [`NetworkClient`] timeouts.
#[derive(Debug, Clone)]
pub struct NetworkClientBuilder {
    connect_timeout: std::time::Duration,
    total_timeout: std::time::Duration,
}

impl NetworkClientBuilder {
    /// Set the HTTP connect timeout. Default: 10s.
    pub fn connect_timeout(mut self, d: std::time::Duration) -> Self {
        self.connect_timeout = d;
        self
    }

    /// Set the total HTTP request timeout. Default: 30s.
    pub fn total_timeout(mut self, d: std::time::Duration) -> Self {
        self.total_timeout = d;
        self
    }

    /// Build the [`NetworkClient`].
    pub fn build(self) -> Result<NetworkClient> {
        let http = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.total_timeout)
            .redirect(reqwest::redirect::Policy::limited(HTTP_MAX_REDIRECTS))
            .build()?;
        Ok(NetworkClient { http })
    }
}

// ---------------------------------------------------------------------------
// WsAssistant
// ---------------------------------------------------------------------------

type WsWrite = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsRead = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Handle to one live WebSocket connection.
///
/// Text frames decode as JSON values; pings are answered transparently;
/// a close frame (or transport EOF) ends the message sequence and flips
/// [`WsAssistant::is_closed`].
pub struct WsAssistant {
    write: WsWrite,
    read: WsRead,
    closed: bool,
}

impl WsAssistant {
    /// Send a JSON payload as a text frame.
    pub async fn send(&mut self, payload: &Value) -> Result<()> {
        let text = serde_json::to_string(payload)?;
        self.write.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Receive the next decoded JSON message.
    ///
    /// Returns `None` once the connection has closed. A malformed text
    /// frame yields `Some(Err(_))` and the stream continues.
    pub async fn next_message(&mut self) -> Option<Result<Value>> {
        loop {
            match self.read.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Some(serde_json::from_str(text.as_str()).map_err(FeedError::Json));
                }
                Some(Ok(Message::Ping(data))) => {
                    if self.write.send(Message::Pong(data)).await.is_err() {
                        self.closed = true;
                        return None;
                    }
                }
                Some(Ok(Message::Pong(_))) | Some(Ok(Message::Binary(_))) => continue,
                Some(Ok(Message::Close(_))) | None => {
                    self.closed = true;
                    return None;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    self.closed = true;
                    return Some(Err(e.into()));
                }
            }
        }
    }

    /// Send a close frame and mark the connection closed.
    pub async fn disconnect(&mut self) -> Result<()> {
        if !self.closed {
            let _ = self.write.send(Message::Close(None)).await;
            self.closed = true;
        }
        Ok(())
    }

    /// Whether the connection has closed (cleanly or not).
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

// ---------------------------------------------------------------------------
// BlockingNetworkClient
// ---------------------------------------------------------------------------

/// Synchronous HTTP client for sync-capable adapters.
///
/// Construction is lazy and cheap; the client must not be used from inside
/// an async task (wrap calls in `tokio::task::spawn_blocking` instead).
#[derive(Debug)]
pub struct BlockingNetworkClient {
    http: reqwest::blocking::Client,
}

impl BlockingNetworkClient {
    /// Create a blocking client with the default timeouts.
    pub fn new() -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(HTTP_TOTAL_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(HTTP_MAX_REDIRECTS))
            .build()?;
        Ok(Self { http })
    }

    /// Issue a GET request and decode the JSON response.
    pub fn get_rest_data(&self, url: &str, params: &[(String, String)]) -> Result<Value> {
        tracing::debug!(%url, "blocking REST request");
        let resp = self.http.get(url).query(params).send()?;
        let status = resp.status();
        let bytes = resp.bytes().unwrap_or_default();
        if status.is_success() {
            serde_json::from_slice(&bytes).map_err(FeedError::Json)
        } else {
            Err(FeedError::HttpStatus {
                status,
                body: String::from_utf8_lossy(&bytes).into_owned(),
            })
        }
    }
}
