//! # USGS Polling Ingestor
//!
//! A fixed-interval poller for the shortest earthquake window. Each tick
//! fetches the window unfiltered, runs it through the novelty tracker,
//! refreshes the cache and broadcasts one `newEarthquake` frame per record
//! never seen before.
//!
//! ## Key Design Principles:
//! - **Fixed schedule**: ticks fire every `poll_interval` regardless of how
//!   long an iteration takes. The first tick fires one interval after start,
//!   since the startup bootstrap has just loaded the same data.
//! - **Overlapping iterations**: each tick spawns its own iteration, so a slow
//!   upstream can leave several in flight. The tracker's atomic observe step
//!   keeps any id from being announced twice.
//! - **Non-fatal failures**: a failed fetch is logged and the loop waits for
//!   the next tick. There is no retry in between.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::core::protocol::ServerMessage;
use crate::core::state::FeedState;
use crate::seismic::{FetchError, MagnitudeFilter, Window};

/// # Poll Result
///
/// What one successful iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollResult {
    /// Records in the fetched collection.
    pub fetched: usize,
    /// Records whose id had never been committed before.
    pub novel: usize,
    /// Clients that received the whole `newEarthquake` batch.
    pub recipients: usize,
}

/// # USGS Polling Plugin
///
/// Drives the poll loop over a shared [`FeedState`].
#[derive(Clone)]
pub struct UsgsPollingPlugin {
    state: FeedState,
}

impl UsgsPollingPlugin {
    /// Creates a poller over `state`.
    pub fn new(state: FeedState) -> Self {
        Self { state }
    }

    /// # Main Execution Loop
    ///
    /// Ticks every `poll_interval` until `shutdown` fires, spawning one
    /// iteration per tick.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        let period = self.state.settings().poll_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        log::info!("USGS polling started (every {}s)", period.as_secs());

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    log::info!("USGS polling received shutdown signal.");
                    break;
                }
                _ = ticker.tick() => {
                    let plugin = self.clone();
                    tokio::spawn(async move { plugin.poll_once().await });
                }
            }
        }
    }

    /// One iteration with failures logged and swallowed.
    pub async fn poll_once(&self) -> Option<PollResult> {
        match self.execute_poll().await {
            Ok(result) => Some(result),
            Err(e) => {
                log::error!("Error checking for new earthquakes: {}", e);
                None
            }
        }
    }

    /// # Execute Poll
    ///
    /// 1.  Fetch the shortest window with no magnitude filter.
    /// 2.  Partition against the known ids and commit the novel ones.
    /// 3.  Replace the cached window.
    /// 4.  Broadcast one frame per novel record, if there are any.
    pub async fn execute_poll(&self) -> Result<PollResult, FetchError> {
        let window = Window::shortest();
        let collection = self.state.source().fetch(window, &MagnitudeFilter::All).await?;

        let novel = self.state.tracker().observe(&collection.features);
        let fetched = collection.len();
        self.state.cache().put(window, Arc::new(collection));

        if novel.is_empty() {
            log::info!("No new earthquakes found");
            return Ok(PollResult { fetched, novel: 0, recipients: 0 });
        }

        log::info!("Found {} new earthquakes", novel.len());
        let count = novel.len();
        let frames = novel
            .into_iter()
            .map(|earthquake| ServerMessage::NewEarthquake { earthquake })
            .collect();
        let recipients = self.state.dispatcher().broadcast_all(frames);

        Ok(PollResult { fetched, novel: count, recipients })
    }
}
