//! Timeline storage.
//!
//! The projector writes through the [`TimelineStore`] contract so a durable
//! backend can replace the in-memory one without touching projection logic.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;

use hypercard_types::{ConversationId, TimelineEntity, TimelineSnapshot, VersionedEntity};
use tokio::sync::RwLock;

use crate::error::TimelineError;

/// Storage for projected timeline entities.
pub trait TimelineStore: Send + Sync {
    /// Insert or replace an entity, tagging it with `seq`.
    ///
    /// Replacing keeps the original `created_at`. Several entities may share
    /// one sequence number when a single frame writes more than one.
    ///
    /// # Errors
    ///
    /// Returns [`TimelineError::SequenceRegression`] when `seq` is below the
    /// conversation's current version, or a store error.
    fn upsert(
        &self,
        conversation: &ConversationId,
        seq: u64,
        entity: TimelineEntity,
    ) -> impl Future<Output = Result<(), TimelineError>> + Send;

    /// Entities written after `since_seq`, ordered by sequence then id.
    /// A `limit` of zero means no limit.
    ///
    /// # Errors
    ///
    /// Returns a store error if the backend cannot be read.
    fn snapshot(
        &self,
        conversation: &ConversationId,
        since_seq: u64,
        limit: usize,
    ) -> impl Future<Output = Result<TimelineSnapshot, TimelineError>> + Send;

    /// Highest sequence number written for the conversation, zero if none.
    ///
    /// # Errors
    ///
    /// Returns a store error if the backend cannot be read.
    fn version(
        &self,
        conversation: &ConversationId,
    ) -> impl Future<Output = Result<u64, TimelineError>> + Send;
}

#[derive(Debug, Default)]
struct ConversationTimeline {
    entities: BTreeMap<String, VersionedEntity>,
    version: u64,
}

/// In-process [`TimelineStore`].
#[derive(Debug, Default)]
pub struct InMemoryTimelineStore {
    conversations: RwLock<HashMap<ConversationId, ConversationTimeline>>,
}

impl InMemoryTimelineStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of conversations with at least one entity.
    pub async fn conversation_count(&self) -> usize {
        self.conversations.read().await.len()
    }
}

impl TimelineStore for InMemoryTimelineStore {
    async fn upsert(
        &self,
        conversation: &ConversationId,
        seq: u64,
        mut entity: TimelineEntity,
    ) -> Result<(), TimelineError> {
        let mut conversations = self.conversations.write().await;
        let timeline = conversations.entry(conversation.clone()).or_default();
        if seq < timeline.version {
            return Err(TimelineError::SequenceRegression {
                conversation: conversation.to_string(),
                seq,
                version: timeline.version,
            });
        }
        if let Some(existing) = timeline.entities.get(&entity.id) {
            entity.created_at = existing.entity.created_at;
        }
        timeline.version = seq;
        timeline
            .entities
            .insert(entity.id.clone(), VersionedEntity { seq, entity });
        Ok(())
    }

    async fn snapshot(
        &self,
        conversation: &ConversationId,
        since_seq: u64,
        limit: usize,
    ) -> Result<TimelineSnapshot, TimelineError> {
        let conversations = self.conversations.read().await;
        let Some(timeline) = conversations.get(conversation) else {
            return Ok(TimelineSnapshot {
                conversation_id: conversation.clone(),
                entities: Vec::new(),
                version: 0,
            });
        };

        let mut entities: Vec<VersionedEntity> = timeline
            .entities
            .values()
            .filter(|versioned| versioned.seq > since_seq)
            .cloned()
            .collect();
        entities.sort_by(|a, b| a.seq.cmp(&b.seq).then_with(|| a.entity.id.cmp(&b.entity.id)));
        if limit > 0 {
            entities.truncate(limit);
        }

        Ok(TimelineSnapshot {
            conversation_id: conversation.clone(),
            entities,
            version: timeline.version,
        })
    }

    async fn version(&self, conversation: &ConversationId) -> Result<u64, TimelineError> {
        Ok(self
            .conversations
            .read()
            .await
            .get(conversation)
            .map_or(0, |timeline| timeline.version))
    }
}
