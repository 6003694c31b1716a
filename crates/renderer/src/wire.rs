//! JSON messages exchanged with the gesture recogniser.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::capture::EncodedStill;

/// Outbound still: `{"type":"frame","data":"data:image/jpeg;base64,...","timestamp":<ms>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl FrameMessage {
    pub fn from_still(still: &EncodedStill) -> Self {
        Self::with_timestamp(still, chrono::Utc::now().timestamp_millis())
    }

    pub fn with_timestamp(still: &EncodedStill, timestamp: i64) -> Self {
        Self {
            kind: "frame".to_string(),
            data: still.to_data_url(),
            timestamp,
        }
    }
}

/// Gesture report from the recogniser. `active_effects` is the recogniser's own suggestion and
/// is advisory only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GestureEvent {
    pub gestures: BTreeMap<String, bool>,
    #[serde(default)]
    pub active_effects: Vec<String>,
    #[serde(default)]
    pub timestamp: Option<f64>,
}

impl GestureEvent {
    /// Gesture labels currently reported as held.
    pub fn held(&self) -> impl Iterator<Item = &str> {
        self.gestures
            .iter()
            .filter(|(_, held)| **held)
            .map(|(label, _)| label.as_str())
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Inbound {
    GestureEvent(GestureEvent),
    #[serde(other)]
    Other,
}

/// Parses one inbound message. Messages of other types yield `None`.
pub fn parse_inbound(line: &str) -> Result<Option<GestureEvent>, serde_json::Error> {
    match serde_json::from_str(line)? {
        Inbound::GestureEvent(event) => Ok(Some(event)),
        Inbound::Other => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_message_uses_wire_field_names() {
        let still = EncodedStill {
            width: 1,
            height: 1,
            jpeg: vec![0xFF, 0xD8, 0xFF],
        };
        let json = serde_json::to_value(FrameMessage::with_timestamp(&still, 1234)).unwrap();
        assert_eq!(json["type"], "frame");
        assert_eq!(json["data"], "data:image/jpeg;base64,/9j/");
        assert_eq!(json["timestamp"], 1234);
    }

    #[test]
    fn parses_gesture_events() {
        let line = r#"{"type":"gesture_event","gestures":{"smile":true,"fist":false},"active_effects":["liquify"],"timestamp":1712.5}"#;
        let event = parse_inbound(line).unwrap().unwrap();
        assert_eq!(event.gestures.get("smile"), Some(&true));
        assert_eq!(event.active_effects, vec!["liquify".to_string()]);
        assert_eq!(event.timestamp, Some(1712.5));
        assert_eq!(event.held().collect::<Vec<_>>(), vec!["smile"]);
    }

    #[test]
    fn optional_fields_default() {
        let event = parse_inbound(r#"{"type":"gesture_event","gestures":{}}"#)
            .unwrap()
            .unwrap();
        assert!(event.active_effects.is_empty());
        assert_eq!(event.timestamp, None);
    }

    #[test]
    fn other_message_types_are_ignored() {
        assert_eq!(parse_inbound(r#"{"type":"status","ok":true}"#).unwrap(), None);
        assert!(parse_inbound("not json").is_err());
    }
}
