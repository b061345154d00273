//! # Request Handler
//!
//! Answers `requestData` frames from a single subscriber.
//!
//! A fresh cached window is served as-is. Otherwise upstream is queried with
//! the caller's window and magnitude; a successful result replaces the cached
//! window and its ids are committed to the novelty tracker (without being
//! broadcast). A failed fetch gets an `error` reply and touches nothing.
//!
//! A cache hit ignores the requested magnitude and returns the unfiltered
//! collection. Likewise a filtered miss is stored under the plain window key.
//! Both behaviors are kept on purpose and covered by tests.

use std::sync::Arc;

use crate::core::dispatcher::ConnectionId;
use crate::core::protocol::{ClientMessage, DataRequest, ServerMessage};
use crate::core::state::FeedState;

#[derive(Clone)]
pub struct RequestHandler {
    state: FeedState,
}

impl RequestHandler {
    pub fn new(state: FeedState) -> Self {
        Self { state }
    }

    /// Decodes one inbound text frame and replies to `conn`. Undecodable or
    /// unknown frames are logged and dropped.
    pub async fn handle_text(&self, conn: ConnectionId, text: &str) {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => self.serve(conn, message.into()).await,
            Err(e) => log::warn!("Ignoring message from client {}: {}", conn, e),
        }
    }

    /// Computes the reply and hands it to the dispatcher. A connection that
    /// closed in the meantime is skipped silently.
    pub async fn serve(&self, conn: ConnectionId, request: DataRequest) {
        log::info!(
            "Client {} requested {} data with magnitude {}",
            conn,
            request.window,
            request.magnitude
        );
        let reply = self.respond(&request).await;
        if self.state.dispatcher().send_to(conn, reply).is_err() {
            log::debug!("Client {} went away before its reply was sent", conn);
        }
    }

    /// The reply for `request`, fetching from upstream on a cache miss.
    pub async fn respond(&self, request: &DataRequest) -> ServerMessage {
        let window = request.window;
        let max_age = self.state.settings().cache_max_age;

        if let Some(entry) = self.state.cache().fresh(window, max_age) {
            log::info!("Sending cached {} data", window);
            return ServerMessage::FullData { earthquake_data: entry.data };
        }

        log::info!("Fetching fresh {} data", window);
        match self.state.source().fetch(window, &request.magnitude).await {
            Ok(collection) => {
                let data = Arc::new(collection);
                self.state.cache().put(window, Arc::clone(&data));
                let novel = self.state.tracker().observe(&data.features);
                if !novel.is_empty() {
                    log::debug!("On-demand {} fetch surfaced {} unseen ids", window, novel.len());
                }
                ServerMessage::FullData { earthquake_data: data }
            }
            Err(e) => {
                log::error!("Error fetching earthquake data: {}", e);
                ServerMessage::fetch_failed()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dispatcher::Outbound;
    use crate::core::state::FeedSettings;
    use crate::seismic::testing::{collection, ScriptedSource};
    use crate::seismic::{MagnitudeFilter, Window};
    use tokio::sync::mpsc;
    use tokio::time::Duration;

    fn setup() -> (Arc<ScriptedSource>, FeedState, RequestHandler) {
        let source = Arc::new(ScriptedSource::new());
        let state = FeedState::new(source.clone(), FeedSettings::default());
        let handler = RequestHandler::new(state.clone());
        (source, state, handler)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Outbound>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            out.push((*frame).clone());
        }
        out
    }

    fn ids_of(msg: &ServerMessage) -> Vec<String> {
        match msg {
            ServerMessage::FullData { earthquake_data } => earthquake_data.ids().map(String::from).collect(),
            other => panic!("expected fullData, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_cache_is_served_without_fetching() {
        let (source, state, handler) = setup();
        state.cache().put(Window::SevenDays, Arc::new(collection(&["w1", "w2"])));
        tokio::time::advance(Duration::from_secs(120)).await;

        let (conn, mut rx) = state.dispatcher().register();
        handler.handle_text(conn, r#"{"type":"requestData","period":"7days"}"#).await;

        let replies = drain(&mut rx);
        assert_eq!(replies.len(), 1);
        assert_eq!(ids_of(&replies[0]), vec!["w1", "w2"]);
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn cache_hit_ignores_requested_magnitude() {
        let (source, state, handler) = setup();
        state.cache().put(Window::OneDay, Arc::new(collection(&["small", "big"])));

        let request = DataRequest { window: Window::OneDay, magnitude: MagnitudeFilter::Min("5".into()) };
        let reply = handler.respond(&request).await;

        assert_eq!(ids_of(&reply), vec!["small", "big"]);
        assert!(source.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_cache_fetches_with_caller_parameters() {
        let (source, state, handler) = setup();
        state.cache().put(Window::ThirtyDays, Arc::new(collection(&["old"])));
        tokio::time::advance(Duration::from_secs(600)).await;
        source.push_ok(Window::ThirtyDays, collection(&["old", "new"]));

        let request = DataRequest { window: Window::ThirtyDays, magnitude: MagnitudeFilter::Min("4.5".into()) };
        let reply = handler.respond(&request).await;

        assert_eq!(ids_of(&reply), vec!["old", "new"]);
        assert_eq!(source.calls(), vec![(Window::ThirtyDays, MagnitudeFilter::Min("4.5".into()))]);
        assert!(state.cache().is_fresh(Window::ThirtyDays, FeedSettings::default().cache_max_age));
        assert!(state.tracker().contains("old"));
        assert!(state.tracker().contains("new"));
    }

    #[tokio::test]
    async fn on_demand_novelty_is_not_broadcast() {
        let (source, state, handler) = setup();
        source.push_ok(Window::OneDay, collection(&["fresh"]));
        let (requester, mut requester_rx) = state.dispatcher().register();
        let (_, mut bystander_rx) = state.dispatcher().register();

        handler.handle_text(requester, r#"{"type":"requestData"}"#).await;

        assert_eq!(drain(&mut requester_rx).len(), 1);
        assert!(drain(&mut bystander_rx).is_empty());
        assert_eq!(source.calls(), vec![(Window::OneDay, MagnitudeFilter::All)]);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_failure_sends_one_error_and_mutates_nothing() {
        let (source, state, handler) = setup();
        let stale = collection(&["old", "older"]);
        state.tracker().commit(&stale.features);
        state.cache().put(Window::SevenDays, Arc::new(stale));
        let before = state.cache().get(Window::SevenDays).unwrap();
        tokio::time::advance(Duration::from_secs(600)).await;

        source.push_err(Window::SevenDays);
        let (conn, mut rx) = state.dispatcher().register();

        handler.handle_text(conn, r#"{"type":"requestData","period":"7days","magnitude":"all"}"#).await;

        assert_eq!(drain(&mut rx), vec![ServerMessage::fetch_failed()]);
        assert_eq!(source.calls().len(), 1);

        let after = state.cache().get(Window::SevenDays).unwrap();
        assert_eq!(after.fetched_at, before.fetched_at);
        assert!(Arc::ptr_eq(&after.data, &before.data));
        assert_eq!(state.tracker().len(), 2);
        assert!(state.cache().get(Window::OneDay).is_none());
    }

    #[tokio::test]
    async fn fetch_failure_on_empty_state_leaves_it_empty() {
        let (source, state, handler) = setup();
        source.push_err(Window::ThirtyDays);

        let reply = handler
            .respond(&DataRequest { window: Window::ThirtyDays, magnitude: MagnitudeFilter::All })
            .await;

        assert_eq!(reply, ServerMessage::fetch_failed());
        assert!(state.cache().get(Window::ThirtyDays).is_none());
        assert!(state.tracker().is_empty());
    }

    #[tokio::test]
    async fn malformed_frames_are_ignored() {
        let (source, state, handler) = setup();
        let (conn, mut rx) = state.dispatcher().register();

        handler.handle_text(conn, "{not json").await;
        handler.handle_text(conn, r#"{"type":"requestData","period":"1year"}"#).await;
        handler.handle_text(conn, r#"{"type":"ping"}"#).await;

        assert!(drain(&mut rx).is_empty());
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn reply_to_closed_connection_is_dropped() {
        let (source, state, handler) = setup();
        source.push_ok(Window::OneDay, collection(&["a"]));
        let (conn, rx) = state.dispatcher().register();
        drop(rx);

        handler.handle_text(conn, r#"{"type":"requestData"}"#).await;

        // The fetch still lands in the cache and the id set.
        assert!(state.tracker().contains("a"));
        assert_eq!(state.dispatcher().client_count(), 0);
    }
}
