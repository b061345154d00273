//! Time windows and magnitude filters accepted by the feed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One of the fixed time ranges the relay caches and serves.
///
/// The serialized names (`1day`, `7days`, `30days`) are the ones subscribers
/// send in `requestData` messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Window {
    /// Events of the last 24 hours.
    #[serde(rename = "1day")]
    OneDay,
    /// Events of the last 7 days.
    #[serde(rename = "7days")]
    SevenDays,
    /// Events of the last 30 days.
    #[serde(rename = "30days")]
    ThirtyDays,
}

/// Raised when a window name is not one of the supported ones.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown window '{0}' (expected 1day, 7days or 30days)")]
pub struct UnknownWindow(pub String);

impl Window {
    /// Every supported window, shortest first.
    pub const ALL: [Window; 3] = [Window::OneDay, Window::SevenDays, Window::ThirtyDays];

    /// The most time-sensitive window; polled for novelty and used as the request default.
    pub const fn shortest() -> Window {
        Window::OneDay
    }

    /// Wire name used by subscribers.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Window::OneDay => "1day",
            Window::SevenDays => "7days",
            Window::ThirtyDays => "30days",
        }
    }

    /// Name of the matching USGS summary feed (`all_<slug>.geojson`).
    pub const fn feed_slug(&self) -> &'static str {
        match self {
            Window::OneDay => "day",
            Window::SevenDays => "week",
            Window::ThirtyDays => "month",
        }
    }
}

impl Default for Window {
    fn default() -> Self {
        Window::shortest()
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Window {
    type Err = UnknownWindow;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Window::ALL
            .into_iter()
            .find(|w| w.as_str() == s)
            .ok_or_else(|| UnknownWindow(s.to_string()))
    }
}

/// Minimum-magnitude filter forwarded to the upstream provider.
///
/// Thresholds are kept as the raw text the subscriber sent. Filtering policy
/// belongs to the provider, so nothing is validated locally.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MagnitudeFilter {
    /// No filter.
    #[default]
    All,
    /// Forwarded verbatim as `minmagnitude`.
    Min(String),
}

impl MagnitudeFilter {
    /// The `minmagnitude` query value, if any.
    pub fn as_query(&self) -> Option<&str> {
        match self {
            MagnitudeFilter::All => None,
            MagnitudeFilter::Min(raw) => Some(raw.as_str()),
        }
    }
}

impl fmt::Display for MagnitudeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MagnitudeFilter::All => f.write_str("all"),
            MagnitudeFilter::Min(raw) => f.write_str(raw),
        }
    }
}

impl<'de> Deserialize<'de> for MagnitudeFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Null | Value::Bool(false) => MagnitudeFilter::All,
            Value::String(s) if s.is_empty() || s == "all" => MagnitudeFilter::All,
            Value::String(s) => MagnitudeFilter::Min(s),
            other => MagnitudeFilter::Min(other.to_string()),
        })
    }
}
