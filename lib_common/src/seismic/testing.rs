//! In-memory [`QuakeSource`] for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Map};

use crate::retrieve::ky_http::ApiError;
use crate::seismic::apicallusgs::{FetchError, QuakeSource};
use crate::seismic::record::{Earthquake, FeatureCollection};
use crate::seismic::window::{MagnitudeFilter, Window};

/// Replays queued responses per window and records every call.
#[derive(Default)]
pub struct ScriptedSource {
    responses: Mutex<HashMap<Window, VecDeque<Result<FeatureCollection, FetchError>>>>,
    calls: Mutex<Vec<(Window, MagnitudeFilter)>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, window: Window, collection: FeatureCollection) {
        self.push(window, Ok(collection));
    }

    pub fn push_err(&self, window: Window) {
        self.push(window, Err(transport_error()));
    }

    fn push(&self, window: Window, response: Result<FeatureCollection, FetchError>) {
        self.responses.lock().unwrap().entry(window).or_default().push_back(response);
    }

    pub fn calls(&self) -> Vec<(Window, MagnitudeFilter)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl QuakeSource for ScriptedSource {
    async fn fetch(&self, window: Window, magnitude: &MagnitudeFilter) -> Result<FeatureCollection, FetchError> {
        self.calls.lock().unwrap().push((window, magnitude.clone()));
        self.responses
            .lock()
            .unwrap()
            .get_mut(&window)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(transport_error()))
    }
}

pub fn transport_error() -> FetchError {
    FetchError::Transport(ApiError::Url(url::ParseError::EmptyHost))
}

pub fn quake(id: &str) -> Earthquake {
    let mut payload = Map::new();
    payload.insert("type".into(), json!("Feature"));
    payload.insert("properties".into(), json!({ "mag": 1.5, "place": format!("near {id}") }));
    Earthquake::new(id, payload)
}

pub fn collection<S: AsRef<str>>(ids: &[S]) -> FeatureCollection {
    FeatureCollection::from_features(ids.iter().map(|id| quake(id.as_ref())).collect())
}

/// `count` ids of the form `<prefix>0`, `<prefix>1`, ...
pub fn ids(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}{i}")).collect()
}
