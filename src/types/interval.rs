//! Canonical candle interval tokens.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::FeedError;

/// The width of one candle bucket, drawn from the canonical token set.
///
/// Not every adapter supports every token; adapters declare their supported
/// subset via `ExchangeAdapter::intervals`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Interval {
    /// 1 second.
    OneSecond,
    /// 1 minute.
    OneMinute,
    /// 3 minutes.
    ThreeMinutes,
    /// 5 minutes.
    FiveMinutes,
    /// 15 minutes.
    FifteenMinutes,
    /// 30 minutes.
    ThirtyMinutes,
    /// 1 hour.
    OneHour,
    /// 2 hours.
    TwoHours,
    /// 4 hours.
    FourHours,
    /// 6 hours.
    SixHours,
    /// 8 hours.
    EightHours,
    /// 12 hours.
    TwelveHours,
    /// 1 day.
    OneDay,
    /// 3 days.
    ThreeDays,
    /// 1 week.
    OneWeek,
    /// 1 month (fixed at 30 days).
    OneMonth,
}

impl Interval {
    /// Every canonical interval, shortest first.
    pub const ALL: [Interval; 16] = [
        Interval::OneSecond,
        Interval::OneMinute,
        Interval::ThreeMinutes,
        Interval::FiveMinutes,
        Interval::FifteenMinutes,
        Interval::ThirtyMinutes,
        Interval::OneHour,
        Interval::TwoHours,
        Interval::FourHours,
        Interval::SixHours,
        Interval::EightHours,
        Interval::TwelveHours,
        Interval::OneDay,
        Interval::ThreeDays,
        Interval::OneWeek,
        Interval::OneMonth,
    ];

    /// The canonical token (e.g. `"1m"`, `"4h"`, `"1M"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::OneSecond => "1s",
            Interval::OneMinute => "1m",
            Interval::ThreeMinutes => "3m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::ThirtyMinutes => "30m",
            Interval::OneHour => "1h",
            Interval::TwoHours => "2h",
            Interval::FourHours => "4h",
            Interval::SixHours => "6h",
            Interval::EightHours => "8h",
            Interval::TwelveHours => "12h",
            Interval::OneDay => "1d",
            Interval::ThreeDays => "3d",
            Interval::OneWeek => "1w",
            Interval::OneMonth => "1M",
        }
    }

    /// The bucket width in seconds (suffix table: s=1, m=60, h=3600,
    /// d=86400, w=604800, M=2592000).
    pub fn seconds(&self) -> u64 {
        match self {
            Interval::OneSecond => 1,
            Interval::OneMinute => 60,
            Interval::ThreeMinutes => 180,
            Interval::FiveMinutes => 300,
            Interval::FifteenMinutes => 900,
            Interval::ThirtyMinutes => 1800,
            Interval::OneHour => 3600,
            Interval::TwoHours => 7200,
            Interval::FourHours => 14400,
            Interval::SixHours => 21600,
            Interval::EightHours => 28800,
            Interval::TwelveHours => 43200,
            Interval::OneDay => 86400,
            Interval::ThreeDays => 259200,
            Interval::OneWeek => 604800,
            Interval::OneMonth => 2592000,
        }
    }

    /// The bucket width as a [`Duration`].
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.seconds())
    }

    /// Align a timestamp down to the start of its interval bucket.
    pub fn align(&self, timestamp: i64) -> i64 {
        let width = self.seconds() as i64;
        timestamp - timestamp.rem_euclid(width)
    }

    /// Look up the canonical interval with the given bucket width.
    pub fn from_seconds(seconds: u64) -> Option<Interval> {
        Interval::ALL.iter().find(|i| i.seconds() == seconds).copied()
    }
}

impl FromStr for Interval {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interval::ALL
            .iter()
            .find(|i| i.as_str() == s)
            .copied()
            .ok_or_else(|| FeedError::InvalidArgument(format!("unknown interval token: {s:?}")))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
