//! # HTTP Retrieval Utilities
//!
//! This module provides an asynchronous API client wrapper around `reqwest`.
//! It supports optional exponential backoff retries through `reqwest-middleware`
//! and standardized JSON response handling.

use std::time::Duration;

use reqwest::{Method, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Failures raised while building or executing a request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The base URL or a joined path could not be parsed.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The underlying `reqwest::Client` could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    /// Connection, TLS, timeout or middleware failure.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest_middleware::Error),

    /// The response arrived but its body could not be read to completion.
    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),

    /// The body was read but is not the expected JSON document.
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A standardized container for API responses.
///
/// This struct wraps the deserialized data along with the status of the
/// HTTP transaction.
#[derive(Debug)]
pub struct ApiResponse<T> {
    /// The successfully deserialized response body, if any.
    pub data: Option<T>,
    /// The raw error body returned by the server if the request failed.
    pub error_body: Option<String>,
    /// The numeric HTTP status code.
    pub status: u16,
    /// Indicates if the status code was in the 2xx range.
    pub success: bool,
}

/// Tuning knobs for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ApiClientOptions {
    /// Per-request timeout covering connect, send and body read.
    pub timeout: Duration,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
    /// Number of transient-failure retries. `0` installs no retry middleware at all.
    pub max_retries: u32,
}

impl Default for ApiClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: "QuakeRelay/1.0".to_string(),
            max_retries: 0,
        }
    }
}

/// A flexible asynchronous HTTP client.
///
/// Built on top of `reqwest_middleware`, it handles base URLs and optional
/// automatic retries.
pub struct ApiClient {
    /// The underlying middleware-enabled client.
    inner: ClientWithMiddleware,
    /// The base URL to which all relative paths are joined.
    base_url: Url,
}

impl ApiClient {
    /// Creates a new `ApiClient` with explicit timeout, user agent and retry policy.
    ///
    /// # Arguments
    /// * `base_url` - The absolute base URL for the API. A trailing `/` is added when
    ///   missing so that relative paths are joined below it rather than replacing its
    ///   last segment.
    /// * `options` - Timeout, user agent and retry count.
    pub fn with_options(base_url: &str, options: ApiClientOptions) -> Result<Self, ApiError> {
        let mut normalized = base_url.to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let url = Url::parse(&normalized)?;

        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent.as_str())
            .build()
            .map_err(ApiError::Build)?;

        let mut builder = ClientBuilder::new(http);
        if options.max_retries > 0 {
            let retry_policy = ExponentialBackoff::builder().build_with_max_retries(options.max_retries);
            builder = builder.with(RetryTransientMiddleware::new_with_policy(retry_policy));
        }

        Ok(Self {
            inner: builder.build(),
            base_url: url,
        })
    }

    /// The normalized base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Performs an HTTP request and decodes a successful body as JSON.
    ///
    /// Non-2xx responses are not errors: they come back with `success == false`
    /// and the raw body in `error_body`.
    ///
    /// # Arguments
    /// * `method` - The HTTP verb.
    /// * `path` - The relative path to append to the base URL.
    /// * `query` - Query string pairs, appended in order.
    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
    {
        let full_url = self.base_url.join(path)?;
        let mut req = self.inner.request(method, full_url);

        if !query.is_empty() {
            req = req.query(query);
        }

        let response: reqwest::Response = req.send().await?;
        let status = response.status();
        let body = response.bytes().await.map_err(ApiError::Body)?;

        if status.is_success() {
            let data = serde_json::from_slice::<T>(&body)?;
            Ok(ApiResponse {
                data: Some(data),
                error_body: None,
                status: status.as_u16(),
                success: true,
            })
        } else {
            Ok(ApiResponse {
                data: None,
                error_body: Some(String::from_utf8_lossy(&body).into_owned()),
                status: status.as_u16(),
                success: false,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let client = ApiClient::with_options("https://example.com/feed/v1.0/summary", ApiClientOptions::default()).unwrap();
        assert_eq!(client.base_url().as_str(), "https://example.com/feed/v1.0/summary/");
        let joined = client.base_url().join("all_day.geojson").unwrap();
        assert_eq!(joined.as_str(), "https://example.com/feed/v1.0/summary/all_day.geojson");
    }

    #[test]
    fn relative_base_url_is_rejected() {
        assert!(matches!(ApiClient::with_options("not a url", ApiClientOptions::default()), Err(ApiError::Url(_))));
    }
}
