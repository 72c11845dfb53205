//! Client-visible timeline entities.
//!
//! The timeline is a per-conversation projection of lifecycle events. Each
//! entity is keyed by a string id that is unique within its conversation and
//! carries a schema-free `props` mapping the client renders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::ids::ConversationId;

/// Kind of a timeline entity, as rendered by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EntityKind {
    /// A ready widget.
    HypercardWidget,
    /// A ready runtime card.
    HypercardCard,
    /// A one-line progress or error status.
    Status,
    /// Generic tool result, kept for consumers that predate the dedicated kinds.
    ToolResult,
    /// The assistant's follow-up suggestions.
    Suggestions,
}

/// One entity in a conversation timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct TimelineEntity {
    /// Entity id, unique within the conversation (e.g. `msg-1:widget`).
    pub id: String,
    /// Entity kind.
    pub kind: EntityKind,
    /// Render props; always includes `itemId` and `phase` for artifact entities.
    #[ts(type = "Record<string, unknown>")]
    pub props: Value,
    /// When the entity was first created.
    pub created_at: DateTime<Utc>,
    /// When the entity was last upserted.
    pub updated_at: DateTime<Utc>,
}

impl TimelineEntity {
    /// Create an entity stamped with the given time for both timestamps.
    pub fn new(id: impl Into<String>, kind: EntityKind, props: Value, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            kind,
            props,
            created_at: now,
            updated_at: now,
        }
    }

    /// Read a string prop, if present.
    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(Value::as_str)
    }
}

/// An entity together with the sequence number of the frame that last
/// wrote it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct VersionedEntity {
    /// Sequence number of the last write.
    pub seq: u64,
    /// The entity.
    pub entity: TimelineEntity,
}

/// A page of a conversation timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct TimelineSnapshot {
    /// The conversation this snapshot belongs to.
    pub conversation_id: ConversationId,
    /// Entities written after the requested sequence, ordered by sequence.
    pub entities: Vec<VersionedEntity>,
    /// Highest sequence number applied to the conversation.
    pub version: u64,
}

impl TimelineSnapshot {
    /// Find an entity by id.
    pub fn entity(&self, id: &str) -> Option<&TimelineEntity> {
        self.entities
            .iter()
            .map(|versioned| &versioned.entity)
            .find(|entity| entity.id == id)
    }
}
