//! # Data Ingestors Module
//!
//! Clients that pull data into the relay on their own schedule.
//!
//! ## Contained Modules:
//! - **`usgs_polling`**: the fixed-interval poller that turns new USGS events
//!   into `newEarthquake` broadcasts.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// The fixed-interval poller for the shortest earthquake window.
pub mod usgs_polling;

pub use usgs_polling::{PollResult, UsgsPollingPlugin};
