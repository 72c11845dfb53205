//! Error types for the event layer.

/// Errors that can occur while registering, encoding, or publishing events.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// No registration exists for the dotted event type.
    #[error("unknown event type: {0}")]
    UnknownType(String),

    /// An event type was registered twice.
    #[error("event type already registered: {0}")]
    DuplicateType(String),

    /// A wire frame could not be decoded into an event.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// The sink can no longer accept events.
    #[error("event sink unavailable: {0}")]
    SinkUnavailable(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
