//! Artifact lifecycle events for the Hypercard streaming core.
//!
//! Extraction sessions emit [`ArtifactEvent`] values. An explicit
//! [`EventRegistry`], built once at startup and passed by reference, names
//! every event type in the dotted taxonomy (`hypercard.widget.start`,
//! `hypercard.card.v2`, ...) and maps events to and from the minimal
//! [`SemFrame`] wire envelope. [`EventSink`] implementations carry events to
//! their subscribers.
//!
//! # Modules
//!
//! - [`event`] -- The typed lifecycle event
//! - [`registry`] -- Name-to-codec registry for the dotted taxonomy
//! - [`wire`] -- Wire frame envelope
//! - [`sink`] -- Publication targets (broadcast fan-out, in-memory recording)
//! - [`error`] -- Error types

pub mod error;
pub mod event;
pub mod registry;
pub mod sink;
pub mod wire;

pub use error::EventError;
pub use event::{ArtifactEvent, NAMESPACE, event_type_name};
pub use registry::{EventRegistration, EventRegistry, FrameEncoder};
pub use sink::{BroadcastSink, DEFAULT_BROADCAST_CAPACITY, EventSink, MemorySink, publish_events};
pub use wire::{DEFAULT_FRAME_ID, SemEvent, SemFrame};
