//! # Data Retrieval Module
//!
//! Generic HTTP retrieval clients shared by the upstream feed clients.
//!
//! ## Contained Modules:
//!
//! - **`ky_http`**: A generic HTTP `ApiClient` built on `reqwest` and
//!   `reqwest-middleware`, with an opt-in exponential backoff retry policy.
//!   The USGS feed client in `seismic` is layered on top of it.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Generic HTTP API client with optional retry middleware.
pub mod ky_http;

pub use ky_http::{ApiClient, ApiClientOptions, ApiError, ApiResponse};
