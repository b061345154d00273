//! # Core Relay Module
//!
//! The stateful heart of the earthquake relay. Everything here is in-memory,
//! thread-safe and shared between the poll loop and the per-connection tasks
//! through a cloneable [`FeedState`].
//!
//! ## Core Components:
//!
//! - **`cache`**: the per-window snapshot cache with its freshness rule.
//! - **`novelty`**: the append-only set of seen earthquake ids and the
//!   known/novel partition built on it.
//! - **`dispatcher`**: the connection registry and zero-copy broadcaster.
//! - **`protocol`**: subscriber frames in both directions.
//! - **`state`**: the shared handle and the startup bootstrap.
//! - **`request_handler`**: the cache-or-fetch logic behind `requestData`.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Per-window snapshot cache.
pub mod cache;
/// Seen-id set and partitioning.
pub mod novelty;
/// Connection registry and broadcaster.
pub mod dispatcher;
/// Subscriber wire frames.
pub mod protocol;
/// Shared state handle and bootstrap.
pub mod state;
/// On-demand `requestData` handling.
pub mod request_handler;

pub use cache::{CacheEntry, WindowedCache};
pub use dispatcher::{ConnectionId, DispatchError, Dispatcher, Outbound};
pub use novelty::{NoveltyTracker, Partition};
pub use protocol::{ClientMessage, DataRequest, ServerMessage};
pub use request_handler::RequestHandler;
pub use state::{FeedSettings, FeedState};
