//! GeoJSON feature collection as returned by the USGS summary feeds.
//!
//! Only the `id` of each feature is interpreted; everything else is carried
//! through untouched so that replies to subscribers match what upstream sent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One reported seismic event.
///
/// Identity is the `id` alone. The remaining fields of the feature object
/// (`type`, `properties`, `geometry`, ...) live in `payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Earthquake {
    pub id: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Earthquake {
    pub fn new(id: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self { id: id.into(), payload }
    }
}

/// Decoded upstream document: the `features` array plus any other top-level
/// members (`type`, `metadata`, `bbox`), which are re-emitted as received.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureCollection {
    pub features: Vec<Earthquake>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FeatureCollection {
    pub fn from_features(features: Vec<Earthquake>) -> Self {
        Self { features, extra: Map::new() }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|f| f.id.as_str())
    }
}
