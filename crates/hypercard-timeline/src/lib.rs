//! Timeline projection for Hypercard lifecycle frames.
//!
//! Clients render a conversation as a list of entities. This crate folds the
//! stream of `hypercard.*` wire frames into those entities:
//!
//! - start, update and error frames for widgets and cards become a one-line
//!   status entity at `itemID:status`
//! - ready frames become a `hypercard_widget` or `hypercard_card` entity plus
//!   a generic `tool_result`
//! - every suggestions frame replaces the list on `suggestions:assistant`
//!
//! # Modules
//!
//! - [`projector`] -- Per-conversation sequencing and frame application
//! - [`handlers`] -- Event-name to entity-write handlers
//! - [`store`] -- Storage contract and the in-memory store
//! - [`error`] -- Error types

pub mod error;
pub mod handlers;
pub mod projector;
pub mod store;

pub use error::TimelineError;
pub use handlers::{
    EntityWrite, HandlerRegistry, ProjectionHandler, RESULT_SCHEMA_VERSION, SUGGESTIONS_ENTITY_ID,
    status_text,
};
pub use projector::{DEFAULT_MAX_CONVERSATIONS, DEFAULT_MAX_TERMINAL_ITEMS, TimelineProjector};
pub use store::{InMemoryTimelineStore, TimelineStore};
