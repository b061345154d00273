//! # USGS API Client
//!
//! Fetches GeoJSON summary feeds from the USGS earthquake hazards program and
//! decodes them into a [`FeatureCollection`].
//!
//! ## Core Features:
//! - **Trait seam**: callers depend on [`QuakeSource`], not on the HTTP client,
//!   so the poll loop and request handler can run against in-memory sources.
//! - **Single attempt**: a fetch is one upstream round-trip. Retries are the
//!   caller's business; the underlying `ApiClient` is built with
//!   `max_retries = 0` unless configured otherwise.
//! - **Typed failures**: transport problems, non-2xx statuses and undecodable
//!   bodies come back as distinct [`FetchError`] variants.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use thiserror::Error;

use crate::retrieve::ky_http::{ApiClient, ApiClientOptions, ApiError};
use crate::seismic::record::FeatureCollection;
use crate::seismic::window::{MagnitudeFilter, Window};

/// Base URL of the public USGS summary feeds.
pub const DEFAULT_USGS_BASE_URL: &str = "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/";

/// Why a fetch produced no collection.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network, TLS or timeout failure.
    #[error("transport failure: {0}")]
    Transport(#[source] ApiError),

    /// The body was not a JSON object with a `features` array of `id`-carrying objects.
    #[error("malformed upstream body: {0}")]
    Decode(#[source] ApiError),

    /// Upstream answered with a non-2xx status.
    #[error("upstream responded with HTTP {status}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The response body, if it could be read.
        body: Option<String>,
    },
}

impl From<ApiError> for FetchError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Decode(_) => FetchError::Decode(err),
            _ => FetchError::Transport(err),
        }
    }
}

/// Anything able to produce an earthquake collection for a window.
#[async_trait]
pub trait QuakeSource: Send + Sync {
    /// Fetches `window`, asking upstream to drop events below `magnitude`.
    async fn fetch(&self, window: Window, magnitude: &MagnitudeFilter) -> Result<FeatureCollection, FetchError>;
}

/// Connection settings for [`ApiCallUsgs`].
#[derive(Debug, Clone)]
pub struct UsgsSettings {
    /// Feed root; `all_<slug>.geojson` is joined onto it.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Transient-failure retries performed by the HTTP middleware.
    pub max_retries: u32,
}

impl Default for UsgsSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_USGS_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 0,
        }
    }
}

/// # USGS API Call Client
///
/// A [`QuakeSource`] backed by the live USGS GeoJSON feeds.
pub struct ApiCallUsgs {
    client: ApiClient,
}

impl ApiCallUsgs {
    /// Builds the client. Fails only if the base URL is invalid or the TLS
    /// backend cannot be initialized.
    pub fn new(settings: &UsgsSettings) -> Result<Self, ApiError> {
        let options = ApiClientOptions {
            timeout: settings.timeout,
            max_retries: settings.max_retries,
            ..ApiClientOptions::default()
        };
        Ok(Self {
            client: ApiClient::with_options(&settings.base_url, options)?,
        })
    }

    /// Relative path of the feed document for `window`.
    pub fn feed_path(window: Window) -> String {
        format!("all_{}.geojson", window.feed_slug())
    }
}

#[async_trait]
impl QuakeSource for ApiCallUsgs {
    async fn fetch(&self, window: Window, magnitude: &MagnitudeFilter) -> Result<FeatureCollection, FetchError> {
        let path = Self::feed_path(window);
        let query: Vec<(&str, String)> = magnitude
            .as_query()
            .map(|m| vec![("minmagnitude", m.to_string())])
            .unwrap_or_default();

        log::info!("Fetching earthquake data: {}{} (magnitude {})", self.client.base_url(), path, magnitude);

        let response = self
            .client
            .request::<FeatureCollection>(Method::GET, &path, &query)
            .await?;

        match response.data {
            Some(collection) if response.success => {
                log::debug!("Fetched {} earthquakes for {}", collection.len(), window);
                Ok(collection)
            }
            _ => Err(FetchError::Status {
                status: response.status,
                body: response.error_body,
            }),
        }
    }
}
