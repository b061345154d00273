//! # Windowed Cache
//!
//! Holds the last successfully fetched collection for each [`Window`] together
//! with the instant it was fetched.
//!
//! - **No eviction**: entries are only ever overwritten, so the footprint is
//!   bounded by the number of windows.
//! - **Last writer wins**: the poll loop and any number of request handlers may
//!   write the same window concurrently; nothing is merged.
//! - **Shared payloads**: collections are stored as `Arc<FeatureCollection>` so a
//!   cache hit hands out a pointer instead of cloning thousands of features.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::time::{Duration, Instant};

use crate::seismic::{FeatureCollection, Window};

/// A populated slot. A window that was never fetched has no entry at all.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// When the fetch that produced `data` completed.
    pub fetched_at: Instant,
    pub data: Arc<FeatureCollection>,
}

impl CacheEntry {
    /// Time elapsed between the fetch and `now`, zero if `now` is earlier.
    pub fn age_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.fetched_at)
    }

    /// Fresh iff strictly younger than `max_age`.
    pub fn is_fresh_at(&self, max_age: Duration, now: Instant) -> bool {
        self.age_at(now) < max_age
    }
}

#[derive(Debug, Default)]
pub struct WindowedCache {
    entries: RwLock<HashMap<Window, CacheEntry>>,
}

impl WindowedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, window: Window) -> Option<CacheEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&window)
            .cloned()
    }

    /// Stores `data` as fetched right now.
    pub fn put(&self, window: Window, data: Arc<FeatureCollection>) {
        self.put_at(window, data, Instant::now());
    }

    pub fn put_at(&self, window: Window, data: Arc<FeatureCollection>, fetched_at: Instant) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(window, CacheEntry { fetched_at, data });
    }

    pub fn is_fresh(&self, window: Window, max_age: Duration) -> bool {
        self.is_fresh_at(window, max_age, Instant::now())
    }

    pub fn is_fresh_at(&self, window: Window, max_age: Duration, now: Instant) -> bool {
        self.fresh_at(window, max_age, now).is_some()
    }

    /// The entry for `window` if it is still fresh, read under a single lock.
    pub fn fresh(&self, window: Window, max_age: Duration) -> Option<CacheEntry> {
        self.fresh_at(window, max_age, Instant::now())
    }

    pub fn fresh_at(&self, window: Window, max_age: Duration, now: Instant) -> Option<CacheEntry> {
        self.get(window).filter(|entry| entry.is_fresh_at(max_age, now))
    }
}
