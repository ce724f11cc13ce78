//! Error types for the `candles-feed` crate.
//!
//! All fallible operations in this crate return [`Result<T>`], which is an
//! alias for `std::result::Result<T, FeedError>`.
//!
//! [`FeedError`] covers:
//! - **HTTP status errors** — Unexpected status codes with response body
//! - **HTTP transport errors** — Network, TLS, timeout failures
//! - **JSON errors** — Deserialization failures
//! - **WebSocket errors** — Connection and protocol errors
//! - **URL errors** — Malformed URL construction
//! - **Protocol errors** — Exchange payloads whose shape doesn't match the
//!   documented format
//! - **Invalid arguments** — Client-side validation errors
//! - **Capability errors** — Synchronous calls on async-only adapters
//! - **Fatal errors** — Startup configuration failures

/// All possible errors produced by the `candles-feed` crate.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// The server returned an unexpected HTTP status code.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// The HTTP status code.
        status: reqwest::StatusCode,
        /// The response body text.
        body: String,
    },

    /// A network or transport-level error from `reqwest`.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to deserialize a JSON response body.
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A WebSocket-level error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// An error building or parsing a URL.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// An exchange payload did not match the documented wire format.
    ///
    /// Carries the raw payload so the offending message can be logged and
    /// dropped without killing the stream.
    #[error("protocol error ({context}): {payload}")]
    Protocol {
        /// What was being parsed when the mismatch was found.
        context: &'static str,
        /// The offending payload, truncated for logging.
        payload: String,
    },

    /// A candle failed its OHLCV invariants at construction.
    #[error("invalid candle: {0}")]
    InvalidCandle(String),

    /// The caller provided an invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No adapter is registered under the requested exchange name.
    #[error("unknown exchange: {0}")]
    UnknownExchange(String),

    /// The adapter does not support the requested interval.
    #[error("interval {interval} not supported by {exchange}")]
    UnsupportedInterval {
        /// The canonical interval token.
        interval: String,
        /// The adapter's exchange name.
        exchange: String,
    },

    /// A synchronous operation was invoked on an adapter whose I/O surface
    /// is async-only (or vice versa).
    #[error("capability error: {0}")]
    Capability(String),

    /// A configuration error detected at startup.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl FeedError {
    /// Build a [`FeedError::Protocol`] from a raw payload, truncating the
    /// payload text so hostile inputs can't bloat logs.
    pub fn protocol(context: &'static str, payload: &serde_json::Value) -> Self {
        let mut text = payload.to_string();
        if text.len() > 512 {
            let mut end = 512;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            text.truncate(end);
            text.push('…');
        }
        Self::Protocol {
            context,
            payload: text,
        }
    }

    /// Whether this error is transient at the transport level and worth
    /// retrying with backoff, as opposed to a caller mistake.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::WebSocket(_) => true,
            Self::HttpStatus { status, .. } => {
                status.is_server_error() || status.as_u16() == 429
            }
            _ => false,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FeedError>;
