//! Kraken spot adapter.
//!
//! REST shape: `GET /0/public/OHLC` with an `{error, result}` envelope; the
//! result maps the pair name to ascending rows of second timestamps and
//! decimal strings, plus a `last` pagination cursor. WS shape: the v1
//! protocol with array frames `[channelId, data, "ohlc-<minutes>", pair]`.
//! Kraken writes intervals in minutes, names Bitcoin `XBT`, and its OHLC
//! endpoint takes only a `since` bound — the end bound and limit are
//! applied client-side.
//!
//! This adapter's I/O surface is synchronous; async callers are served by
//! dispatching the blocking fetch on a worker thread.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::adapters::{
    AdapterCore, ExchangeAdapter, IoCapability, blocking_get, decimal_field, int_field,
};
use crate::constants::urls;
use crate::error::{FeedError, Result};
use crate::network::{BlockingNetworkClient, EndpointKind, NetworkClient, NetworkConfig};
use crate::types::{CandleData, CandlesRequest, Interval, TradingPair};

/// The intervals Kraken serves.
const INTERVALS: [Interval; 8] = [
    Interval::OneMinute,
    Interval::FiveMinutes,
    Interval::FifteenMinutes,
    Interval::ThirtyMinutes,
    Interval::OneHour,
    Interval::FourHours,
    Interval::OneDay,
    Interval::OneWeek,
];

/// Adapter for Kraken spot markets. Sync-only I/O.
pub struct KrakenSpotAdapter {
    core: AdapterCore,
}

/// Kraken's asset code for a canonical asset (`BTC` → `XBT`).
pub(crate) fn asset_code(asset: &str) -> &str {
    match asset {
        "BTC" => "XBT",
        other => other,
    }
}

/// The canonical asset for a Kraken asset code (`XBT` → `BTC`).
pub(crate) fn canonical_asset(code: &str) -> &str {
    match code {
        "XBT" => "BTC",
        other => other,
    }
}

impl KrakenSpotAdapter {
    /// Create the adapter.
    pub fn new(network_config: Option<NetworkConfig>) -> Self {
        Self {
            core: AdapterCore::new(network_config),
        }
    }

    /// The WebSocket pair name, e.g. `XBT/USDT`.
    pub fn ws_pair_format(pair: &TradingPair) -> String {
        format!(
            "{}/{}",
            asset_code(pair.base()),
            asset_code(pair.quote())
        )
    }

    /// Parse one OHLC row: `[ts, o, h, l, c, vwap, volume, count]`.
    fn parse_row(row: &Value) -> Result<CandleData> {
        let fields = row
            .as_array()
            .filter(|f| f.len() >= 8)
            .ok_or_else(|| FeedError::protocol("kraken ohlc row", row))?;
        CandleData::builder(
            int_field(&fields[0], "kraken ohlc ts")?,
            decimal_field(&fields[1], "kraken open")?,
            decimal_field(&fields[2], "kraken high")?,
            decimal_field(&fields[3], "kraken low")?,
            decimal_field(&fields[4], "kraken close")?,
            decimal_field(&fields[6], "kraken volume")?,
        )
        .n_trades(int_field(&fields[7], "kraken trade count")?.max(0) as u64)
        .build()
    }

    /// Apply the end bound and limit Kraken's endpoint cannot express.
    fn finalize(mut candles: Vec<CandleData>, req: &CandlesRequest) -> Vec<CandleData> {
        if let Some(end) = req.end_time {
            candles.retain(|c| c.timestamp <= end);
        }
        if let Some(limit) = req.limit {
            if candles.len() > limit {
                candles.drain(..candles.len() - limit);
            }
        }
        candles
    }
}

#[async_trait]
impl ExchangeAdapter for KrakenSpotAdapter {
    fn name(&self) -> &'static str {
        "kraken_spot"
    }

    fn core(&self) -> &AdapterCore {
        &self.core
    }

    fn io_capability(&self) -> IoCapability {
        IoCapability::SyncOnly
    }

    fn intervals(&self) -> &'static [Interval] {
        &INTERVALS
    }

    /// Kraken has no public OHLC WebSocket for every REST interval; the
    /// streamable subset matches the REST one here.
    fn ws_intervals(&self) -> &'static [Interval] {
        &INTERVALS
    }

    fn trading_pair_format(&self, pair: &TradingPair) -> String {
        format!(
            "{}{}",
            asset_code(pair.base()),
            asset_code(pair.quote())
        )
    }

    fn production_rest_base(&self) -> &'static str {
        urls::kraken::REST
    }

    fn production_ws_url(&self) -> &'static str {
        urls::kraken::WS
    }

    fn rest_path(&self, kind: EndpointKind) -> Result<&'static str> {
        match kind {
            EndpointKind::Candles => Ok("/0/public/OHLC"),
            EndpointKind::Ticker => Ok("/0/public/SystemStatus"),
            EndpointKind::Orders => Ok("/0/private/AddOrder"),
            EndpointKind::Account => Ok("/0/private/Balance"),
        }
    }

    fn rest_params(&self, req: &CandlesRequest) -> Result<Vec<(String, String)>> {
        let mut params = vec![
            ("pair".to_owned(), self.trading_pair_format(&req.pair)),
            (
                "interval".to_owned(),
                (req.interval.seconds() / 60).to_string(),
            ),
        ];
        if let Some(start) = req.start_time {
            // `since` is exclusive; step one interval back to include the
            // bucket at `start`.
            params.push((
                "since".to_owned(),
                (start - req.interval.seconds() as i64).to_string(),
            ));
        }
        Ok(params)
    }

    fn parse_rest_response(&self, raw: &Value) -> Result<Vec<CandleData>> {
        let errors = raw.get("error").and_then(Value::as_array);
        if errors.is_some_and(|e| !e.is_empty()) {
            return Err(FeedError::protocol("kraken error envelope", raw));
        }
        let result = raw
            .get("result")
            .and_then(Value::as_object)
            .ok_or_else(|| FeedError::protocol("kraken result", raw))?;
        let rows = result
            .iter()
            .find(|(k, _)| k.as_str() != "last")
            .and_then(|(_, v)| v.as_array())
            .ok_or_else(|| FeedError::protocol("kraken ohlc rows", raw))?;
        rows.iter().map(Self::parse_row).collect()
    }

    fn ws_subscription_payload(&self, pair: &TradingPair, interval: Interval) -> Result<Value> {
        Ok(json!({
            "event": "subscribe",
            "pair": [Self::ws_pair_format(pair)],
            "subscription": {
                "name": "ohlc",
                "interval": interval.seconds() / 60,
            },
        }))
    }

    fn parse_ws_message(&self, raw: &Value) -> Result<Vec<CandleData>> {
        // Event objects (subscriptionStatus, heartbeat) are not candles.
        let Some(frame) = raw.as_array() else {
            return Ok(Vec::new());
        };
        if frame.len() < 4 {
            return Ok(Vec::new());
        }
        let channel = frame[2].as_str().unwrap_or_default();
        let Some(minutes) = channel.strip_prefix("ohlc-") else {
            return Ok(Vec::new());
        };
        let width: i64 = minutes
            .parse::<i64>()
            .map_err(|_| FeedError::protocol("kraken ohlc channel", raw))?
            * 60;

        let fields = frame[1]
            .as_array()
            .filter(|f| f.len() >= 9)
            .ok_or_else(|| FeedError::protocol("kraken ws ohlc data", raw))?;
        // Field 0 is the last-trade time inside the bucket; align it down
        // to the bucket open.
        let ts_secs = int_field(&fields[0], "kraken ws time")?;
        let open_ts = ts_secs - ts_secs.rem_euclid(width);

        let candle = CandleData::builder(
            open_ts,
            decimal_field(&fields[2], "kraken ws open")?,
            decimal_field(&fields[3], "kraken ws high")?,
            decimal_field(&fields[4], "kraken ws low")?,
            decimal_field(&fields[5], "kraken ws close")?,
            decimal_field(&fields[7], "kraken ws volume")?,
        )
        .n_trades(int_field(&fields[8], "kraken ws count")?.max(0) as u64)
        .build()?;
        Ok(vec![candle])
    }

    async fn fetch_rest_candles(
        &self,
        req: &CandlesRequest,
        _client: &NetworkClient,
    ) -> Result<Vec<CandleData>> {
        self.check_interval(req.interval)?;
        let url = self.candles_url(&req.pair)?;
        let params = self.rest_params(req)?;
        let raw = blocking_get(url, params).await?;
        Ok(Self::finalize(self.parse_rest_response(&raw)?, req))
    }

    fn fetch_rest_candles_blocking(&self, req: &CandlesRequest) -> Result<Vec<CandleData>> {
        self.check_interval(req.interval)?;
        let url = self.candles_url(&req.pair)?;
        let params = self.rest_params(req)?;
        let raw = BlockingNetworkClient::new()?.get_rest_data(&url, &params)?;
        Ok(Self::finalize(self.parse_rest_response(&raw)?, req))
    }
}
