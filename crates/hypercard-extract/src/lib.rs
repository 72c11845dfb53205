//! Streaming extraction of Hypercard artifacts from generated text.
//!
//! The tag-boundary scanner (outside this crate) finds
//! `<hypercard:type:version>` occurrences in the model's output. For each
//! one it asks the [`ExtractorRegistry`] for a session and feeds it the
//! body chunk by chunk. The session decodes best-effort YAML snapshots and
//! emits lifecycle events as soon as there is something worth showing, then
//! validates the complete body once the tag closes.
//!
//! # Architecture
//!
//! ```text
//! scanner --chunk--> ExtractionSession --snapshot--> SnapshotDecoder
//!                          |
//!                          +--events--> EventSink --frames--> timeline projector
//!
//! final text --> CompletionPolicy --missing-tag errors--> EventSink
//! ```
//!
//! Every in-scope failure becomes an error event; nothing here returns an
//! error mid-stream.

pub mod config;
pub mod decoder;
pub mod error;
pub mod extractor;
pub mod kinds;
pub mod policy;
pub mod session;

pub use config::{DecoderConfig, ExtractionConfig, HypercardConfig, PolicyConfig};
pub use decoder::{SnapshotDecoder, YamlSnapshotDecoder};
pub use error::{ConfigError, DecodeError, ExtractError};
pub use extractor::{
    CardExtractor, ExtractorRegistry, SpecExtractor, SuggestionsExtractor, TagEdge,
    TagExtractor, TagIdentity, WidgetExtractor,
};
pub use kinds::{
    ArtifactSpec, CardSpec, MAX_SUGGESTIONS, SuggestionsSpec, Validation, WidgetSpec,
    normalize_suggestions,
};
pub use policy::{CompletionPolicy, MISSING_CARD_MESSAGE, MISSING_WIDGET_MESSAGE};
pub use session::{
    CardSession, ExtractionSession, GatedSession, IDLE_TIMEOUT_MESSAGE, SessionPhase,
    StreamOutcome, SuggestionsSession, WidgetSession,
};
