//! Shared type definitions for the Hypercard artifact streaming core.
//!
//! Every crate in the workspace speaks in these types: the extraction
//! sessions decode [`payload`] snapshots, the event layer tags them with an
//! [`ArtifactKind`] and [`EventPhase`], and the timeline projector stores
//! [`TimelineEntity`] values that flow to clients via `ts-rs` bindings.
//!
//! # Modules
//!
//! - [`ids`] -- Opaque string identifiers for occurrences, turns, and conversations
//! - [`kinds`] -- Artifact kinds and lifecycle phases
//! - [`payload`] -- Per-kind payload snapshots decoded from generated text
//! - [`timeline`] -- Client-visible timeline entities and snapshots

pub mod ids;
pub mod kinds;
pub mod payload;
pub mod timeline;

// Re-export all public types at crate root for convenience.
pub use ids::{ConversationId, ItemId, TurnId};
pub use kinds::{ArtifactKind, EventPhase};
pub use payload::{
    ArtifactRef, CardPayload, CardSource, SuggestionsPayload, WidgetPayload, lenient_string,
    null_as_default,
};
pub use timeline::{EntityKind, TimelineEntity, TimelineSnapshot, VersionedEntity};
