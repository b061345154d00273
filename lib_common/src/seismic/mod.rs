//! # Seismic Feed Module
//!
//! Everything needed to talk to the upstream earthquake provider: the
//! supported time windows, the GeoJSON data model, and the USGS client.
//!
//! ## Contained Modules:
//! - **`window`**: the `Window` lookup key and the pass-through `MagnitudeFilter`.
//! - **`record`**: `Earthquake` (id plus opaque payload) and `FeatureCollection`.
//! - **`apicallusgs`**: the `QuakeSource` trait and its HTTP implementation.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Supported windows and magnitude filters.
pub mod window;
/// Upstream data model.
pub mod record;
/// USGS HTTP client and the `QuakeSource` seam.
pub mod apicallusgs;

#[cfg(test)]
pub(crate) mod testing;

pub use apicallusgs::{ApiCallUsgs, FetchError, QuakeSource, UsgsSettings, DEFAULT_USGS_BASE_URL};
pub use record::{Earthquake, FeatureCollection};
pub use window::{MagnitudeFilter, UnknownWindow, Window};
