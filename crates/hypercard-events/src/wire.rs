//! The minimal wire envelope for lifecycle events.
//!
//! ```json
//! {"sem": true, "event": {"type": "hypercard.widget.v1", "id": "msg-1", "data": {...}}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

/// Frame id used when an event has an empty item id.
pub const DEFAULT_FRAME_ID: &str = "hypercard";

/// A wire frame carrying one lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SemFrame {
    /// Marks the frame as a semantic event frame; always `true`.
    pub sem: bool,
    /// The event.
    pub event: SemEvent,
}

/// The event inside a [`SemFrame`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SemEvent {
    /// Dotted event type name.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Item id of the occurrence.
    pub id: String,
    /// Kind-specific fields; only present fields are included.
    #[ts(type = "Record<string, unknown>")]
    pub data: Value,
}

impl SemFrame {
    /// Wrap an event, substituting [`DEFAULT_FRAME_ID`] for an empty id.
    pub fn new(event_type: impl Into<String>, id: &str, data: Value) -> Self {
        let id = if id.is_empty() { DEFAULT_FRAME_ID } else { id };
        Self {
            sem: true,
            event: SemEvent {
                event_type: event_type.into(),
                id: id.to_owned(),
                data,
            },
        }
    }

    /// The dotted event type name.
    pub fn event_type(&self) -> &str {
        &self.event.event_type
    }
}
