//! Error types for the timeline projection.

use hypercard_events::EventError;

/// Errors that can occur while projecting frames into a timeline.
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    /// A write carried a sequence number below the conversation's version.
    #[error("sequence {seq} is behind conversation {conversation} at version {version}")]
    SequenceRegression {
        /// The conversation written to.
        conversation: String,
        /// The rejected sequence number.
        seq: u64,
        /// The conversation's current version.
        version: u64,
    },

    /// A projection handler was registered twice for the same event name.
    #[error("projection handler already registered: {0}")]
    DuplicateHandler(String),

    /// Entity props could not be built.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backing store failed.
    #[error("timeline store error: {0}")]
    Store(String),

    /// A frame could not be decoded into an event.
    #[error("event error: {0}")]
    Event(#[from] EventError),
}
