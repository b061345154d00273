//! Subscriber wire protocol: JSON text frames tagged by `type`.

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::seismic::{Earthquake, FeatureCollection, MagnitudeFilter, Window};

/// Greeting sent to every new subscriber.
pub const WELCOME_MESSAGE: &str = "Connected to Earthquake WebSocket Server";
/// Text of the `error` reply sent when an on-demand fetch fails.
pub const FETCH_ERROR_MESSAGE: &str = "Error fetching earthquake data";

/// Frames sent from the relay to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    Info {
        message: String,
    },
    FullData {
        #[serde(rename = "earthquakeData")]
        earthquake_data: Arc<FeatureCollection>,
    },
    Error {
        message: String,
    },
    NewEarthquake {
        earthquake: Earthquake,
    },
}

impl ServerMessage {
    pub fn welcome() -> Self {
        ServerMessage::Info { message: WELCOME_MESSAGE.to_string() }
    }

    pub fn fetch_failed() -> Self {
        ServerMessage::Error { message: FETCH_ERROR_MESSAGE.to_string() }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Frames accepted from subscribers. Anything else fails to decode and is ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    RequestData {
        #[serde(default, deserialize_with = "blank_period")]
        period: Option<Window>,
        #[serde(default)]
        magnitude: Option<MagnitudeFilter>,
    },
}

// `null`, `false` and `""` all mean "no period given".
fn blank_period<'de, D>(deserializer: D) -> Result<Option<Window>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null | Value::Bool(false) => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        other => Window::deserialize(other).map(Some).map_err(serde::de::Error::custom),
    }
}

/// A `requestData` with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataRequest {
    pub window: Window,
    pub magnitude: MagnitudeFilter,
}

impl From<ClientMessage> for DataRequest {
    fn from(msg: ClientMessage) -> Self {
        match msg {
            ClientMessage::RequestData { period, magnitude } => DataRequest {
                window: period.unwrap_or_default(),
                magnitude: magnitude.unwrap_or_default(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seismic::testing::{collection, quake};
    use serde_json::{json, Value};

    fn decode(raw: &str) -> Result<DataRequest, serde_json::Error> {
        serde_json::from_str::<ClientMessage>(raw).map(DataRequest::from)
    }

    #[test]
    fn request_defaults_to_shortest_window_unfiltered() {
        assert_eq!(decode(r#"{"type":"requestData"}"#).unwrap(), DataRequest::default());
        assert_eq!(
            decode(r#"{"type":"requestData","period":null,"magnitude":null}"#).unwrap(),
            DataRequest { window: Window::OneDay, magnitude: MagnitudeFilter::All }
        );
    }

    #[test]
    fn request_carries_window_and_magnitude() {
        assert_eq!(
            decode(r#"{"type":"requestData","period":"30days","magnitude":4.5}"#).unwrap(),
            DataRequest { window: Window::ThirtyDays, magnitude: MagnitudeFilter::Min("4.5".into()) }
        );
    }

    #[test]
    fn blank_fields_fall_back_to_defaults() {
        assert_eq!(
            decode(r#"{"type":"requestData","period":"","magnitude":""}"#).unwrap(),
            DataRequest::default()
        );
        assert_eq!(
            decode(r#"{"type":"requestData","period":false,"magnitude":false}"#).unwrap(),
            DataRequest::default()
        );
    }

    #[test]
    fn unknown_type_or_window_fails_to_decode() {
        assert!(decode(r#"{"type":"subscribe"}"#).is_err());
        assert!(decode(r#"{"type":"requestData","period":"2days"}"#).is_err());
        assert!(decode("not json").is_err());
    }

    #[test]
    fn server_frames_use_camel_case_tags() {
        let as_value = |msg: &ServerMessage| serde_json::from_str::<Value>(&msg.to_json().unwrap()).unwrap();

        assert_eq!(
            as_value(&ServerMessage::welcome()),
            json!({ "type": "info", "message": WELCOME_MESSAGE })
        );
        assert_eq!(
            as_value(&ServerMessage::fetch_failed()),
            json!({ "type": "error", "message": FETCH_ERROR_MESSAGE })
        );

        let full = as_value(&ServerMessage::FullData { earthquake_data: Arc::new(collection(&["a"])) });
        assert_eq!(full["type"], "fullData");
        assert_eq!(full["earthquakeData"]["features"][0]["id"], "a");

        let new = as_value(&ServerMessage::NewEarthquake { earthquake: quake("b") });
        assert_eq!(new["type"], "newEarthquake");
        assert_eq!(new["earthquake"]["id"], "b");
        assert_eq!(new["earthquake"]["properties"]["mag"], 1.5);
    }
}
