//! # Feed State
//!
//! The single owner of the relay's shared state: the upstream source, the
//! windowed cache, the novelty tracker and the dispatcher. Every task gets a
//! cheap clone of [`FeedState`] instead of reaching for globals.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::try_join_all;

use crate::core::cache::WindowedCache;
use crate::core::dispatcher::Dispatcher;
use crate::core::novelty::NoveltyTracker;
use crate::seismic::{FetchError, MagnitudeFilter, QuakeSource, Window};

/// Timing policy shared by the poll loop and the request handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedSettings {
    /// Delay between poll iterations.
    pub poll_interval: Duration,
    /// A cached window younger than this is served without refetching.
    pub cache_max_age: Duration,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            cache_max_age: Duration::from_secs(5 * 60),
        }
    }
}

#[derive(Clone)]
pub struct FeedState {
    source: Arc<dyn QuakeSource>,
    cache: Arc<WindowedCache>,
    tracker: Arc<NoveltyTracker>,
    dispatcher: Arc<Dispatcher>,
    settings: FeedSettings,
}

impl FeedState {
    pub fn new(source: Arc<dyn QuakeSource>, settings: FeedSettings) -> Self {
        Self {
            source,
            cache: Arc::new(WindowedCache::new()),
            tracker: Arc::new(NoveltyTracker::new()),
            dispatcher: Arc::new(Dispatcher::new()),
            settings,
        }
    }

    pub fn source(&self) -> &dyn QuakeSource {
        self.source.as_ref()
    }

    pub fn cache(&self) -> &WindowedCache {
        &self.cache
    }

    pub fn tracker(&self) -> &NoveltyTracker {
        &self.tracker
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn settings(&self) -> FeedSettings {
        self.settings
    }

    /// # Bootstrap
    ///
    /// Fetches every window concurrently, unfiltered, and seeds both the cache
    /// and the known-id set before anything is served.
    ///
    /// Any failure aborts the whole bootstrap: starting with an empty id set
    /// would make the first poll announce the entire day as new.
    ///
    /// # Returns
    /// The size of the known-id set afterwards.
    pub async fn bootstrap(&self) -> Result<usize, FetchError> {
        let all = MagnitudeFilter::All;
        let fetched = try_join_all(Window::ALL.map(|window| {
            let all = &all;
            async move { self.source.fetch(window, all).await.map(|c| (window, c)) }
        }))
        .await?;

        for (window, collection) in fetched {
            let added = self.tracker.commit(&collection.features);
            log::info!("Loaded {} earthquakes for {} ({} new ids)", collection.len(), window, added);
            self.cache.put(window, Arc::new(collection));
        }

        let known = self.tracker.len();
        log::info!("Initialized with {} known earthquakes", known);
        Ok(known)
    }
}
