//! Frame projection with per-conversation sequencing.
//!
//! The projector decodes wire frames through the [`EventRegistry`], hands
//! them to the handler registered for their type, and writes the resulting
//! entities under the conversation's next sequence number. Each conversation
//! has its own cursor behind a [`tokio::sync::Mutex`], so frames for one
//! conversation are applied one at a time while distinct conversations
//! proceed concurrently.
//!
//! Cursors are a cache over the store. At most `max_conversations` are kept;
//! the least recently used idle one is dropped to make room and is re-seeded
//! from the store's version when its conversation comes back. Each cursor
//! remembers only the last `max_terminal_items` finished items.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use hypercard_events::{ArtifactEvent, EventRegistry, SemFrame};
use hypercard_types::{ConversationId, TimelineEntity, TimelineSnapshot};
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use crate::error::TimelineError;
use crate::handlers::HandlerRegistry;
use crate::store::TimelineStore;

/// Conversation cursors kept before the least recently used idle one is dropped.
pub const DEFAULT_MAX_CONVERSATIONS: usize = 1024;

/// Finished items remembered per conversation for duplicate suppression.
pub const DEFAULT_MAX_TERMINAL_ITEMS: usize = 256;

#[derive(Debug, Default)]
struct Cursor {
    seeded: bool,
    last_seq: u64,
    terminal_items: HashSet<String>,
    terminal_order: VecDeque<String>,
}

impl Cursor {
    fn is_terminal(&self, item: &str) -> bool {
        self.terminal_items.contains(item)
    }

    fn mark_terminal(&mut self, item: &str, cap: usize) {
        if !self.terminal_items.insert(item.to_owned()) {
            return;
        }
        self.terminal_order.push_back(item.to_owned());
        while self.terminal_order.len() > cap {
            if let Some(oldest) = self.terminal_order.pop_front() {
                self.terminal_items.remove(&oldest);
            }
        }
    }
}

#[derive(Debug)]
struct CursorSlot {
    cursor: Arc<Mutex<Cursor>>,
    last_used: u64,
}

#[derive(Debug, Default)]
struct CursorTable {
    slots: HashMap<ConversationId, CursorSlot>,
    clock: u64,
}

impl CursorTable {
    /// Drop the least recently used cursor nobody is holding.
    fn evict_idle(&mut self) -> Option<ConversationId> {
        let victim = self
            .slots
            .iter()
            .filter(|(_, slot)| Arc::strong_count(&slot.cursor) == 1)
            .min_by_key(|(_, slot)| slot.last_used)
            .map(|(conversation, _)| conversation.clone())?;
        self.slots.remove(&victim);
        Some(victim)
    }
}

/// Projects lifecycle frames into a [`TimelineStore`].
pub struct TimelineProjector<S> {
    registry: Arc<EventRegistry>,
    handlers: HandlerRegistry,
    store: Arc<S>,
    cursors: Mutex<CursorTable>,
    max_conversations: usize,
    max_terminal_items: usize,
}

impl<S> core::fmt::Debug for TimelineProjector<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TimelineProjector")
            .field("event_types", &self.registry.len())
            .field("handlers", &self.handlers.len())
            .field("max_conversations", &self.max_conversations)
            .field("max_terminal_items", &self.max_terminal_items)
            .finish_non_exhaustive()
    }
}

impl<S: TimelineStore> TimelineProjector<S> {
    /// Create a projector with the Hypercard handlers.
    pub fn new(registry: Arc<EventRegistry>, store: Arc<S>) -> Self {
        Self::with_handlers(registry, HandlerRegistry::hypercard(), store)
    }

    /// Create a projector with a custom handler table.
    pub fn with_handlers(
        registry: Arc<EventRegistry>,
        handlers: HandlerRegistry,
        store: Arc<S>,
    ) -> Self {
        Self {
            registry,
            handlers,
            store,
            cursors: Mutex::new(CursorTable::default()),
            max_conversations: DEFAULT_MAX_CONVERSATIONS,
            max_terminal_items: DEFAULT_MAX_TERMINAL_ITEMS,
        }
    }

    /// Bound the cursor cache. Both limits are at least one.
    #[must_use]
    pub fn with_limits(mut self, max_conversations: usize, max_terminal_items: usize) -> Self {
        self.max_conversations = max_conversations.max(1);
        self.max_terminal_items = max_terminal_items.max(1);
        self
    }

    /// The backing store.
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Number of conversations with a cached cursor.
    pub async fn cached_conversations(&self) -> usize {
        self.cursors.lock().await.slots.len()
    }

    /// Drop a conversation's cursor, e.g. when the conversation closes.
    ///
    /// The next frame for it re-seeds from the store. Returns whether a
    /// cursor was cached.
    pub async fn evict(&self, conversation: &ConversationId) -> bool {
        self.cursors.lock().await.slots.remove(conversation).is_some()
    }

    async fn cursor(&self, conversation: &ConversationId) -> Arc<Mutex<Cursor>> {
        let mut table = self.cursors.lock().await;
        table.clock = table.clock.saturating_add(1);
        let now = table.clock;
        if let Some(slot) = table.slots.get_mut(conversation) {
            slot.last_used = now;
            return Arc::clone(&slot.cursor);
        }

        let full = table.slots.len() >= self.max_conversations;
        if let Some(evicted) = full.then(|| table.evict_idle()).flatten() {
            debug!(conversation_id = %evicted, "evicted idle conversation cursor");
        }
        let cursor = Arc::new(Mutex::new(Cursor::default()));
        table.slots.insert(
            conversation.clone(),
            CursorSlot {
                cursor: Arc::clone(&cursor),
                last_used: now,
            },
        );
        cursor
    }

    /// Apply one wire frame to a conversation.
    ///
    /// Returns the sequence number assigned to the frame, or `None` when the
    /// frame was skipped: no handler for its type, the item already reached
    /// ready or error, or the handler produced no writes. Skipped frames do
    /// not consume a sequence number.
    ///
    /// An item only counts as finished once every write of its terminal
    /// frame landed, so a redelivered frame repairs a partial write. If some
    /// writes landed before a failure, their sequence number stays consumed.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame does not decode or the store fails.
    pub async fn apply(
        &self,
        conversation: &ConversationId,
        frame: &SemFrame,
    ) -> Result<Option<u64>, TimelineError> {
        let name = frame.event_type();
        let Some(handler) = self.handlers.get(name) else {
            debug!(conversation_id = %conversation, event_type = name, "no handler for frame, skipping");
            return Ok(None);
        };
        let event = self.registry.from_frame(frame)?;

        let slot = self.cursor(conversation).await;
        let mut cursor = slot.lock().await;
        if !cursor.seeded {
            cursor.last_seq = self.store.version(conversation).await?;
            cursor.seeded = true;
        }

        let item = event.item_id.as_str();
        if cursor.is_terminal(item) {
            debug!(
                conversation_id = %conversation,
                item_id = item,
                event_type = name,
                "item already terminal, skipping frame"
            );
            return Ok(None);
        }

        let writes = handler(name, &event)?;
        if writes.is_empty() {
            if event.is_terminal() {
                cursor.mark_terminal(item, self.max_terminal_items);
            }
            return Ok(None);
        }

        let seq = cursor.last_seq.saturating_add(1);
        let now = Utc::now();
        let mut landed = false;
        for write in writes {
            let entity = TimelineEntity::new(write.id, write.kind, write.props, now);
            if let Err(e) = self.store.upsert(conversation, seq, entity).await {
                if landed {
                    cursor.last_seq = seq;
                }
                warn!(
                    conversation_id = %conversation,
                    item_id = item,
                    event_type = name,
                    seq,
                    partial = landed,
                    error = %e,
                    "timeline write failed"
                );
                return Err(e);
            }
            landed = true;
        }
        cursor.last_seq = seq;

        if event.is_terminal() {
            cursor.mark_terminal(item, self.max_terminal_items);
            info!(conversation_id = %conversation, item_id = item, event_type = name, seq, "projected terminal frame");
        } else {
            debug!(conversation_id = %conversation, item_id = item, event_type = name, seq, "projected frame");
        }
        Ok(Some(seq))
    }

    /// Map an event through the registry and apply the resulting frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the event type is unregistered or the store fails.
    pub async fn apply_event(
        &self,
        conversation: &ConversationId,
        event: &ArtifactEvent,
    ) -> Result<Option<u64>, TimelineError> {
        let frame = self.registry.to_frame(event)?;
        self.apply(conversation, &frame).await
    }

    /// Apply frames from a broadcast subscription until the channel closes.
    ///
    /// Frames that fail to apply are logged and dropped. Returns the number
    /// of frames applied.
    pub async fn follow(
        &self,
        conversation: &ConversationId,
        mut frames: broadcast::Receiver<SemFrame>,
    ) -> usize {
        let mut applied: usize = 0;
        loop {
            match frames.recv().await {
                Ok(frame) => match self.apply(conversation, &frame).await {
                    Ok(Some(_)) => applied = applied.saturating_add(1),
                    Ok(None) => {}
                    Err(e) => {
                        warn!(
                            conversation_id = %conversation,
                            event_type = frame.event_type(),
                            error = %e,
                            "failed to project frame"
                        );
                    }
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(conversation_id = %conversation, skipped, "projector lagged, frames dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(conversation_id = %conversation, applied, "frame channel closed");
                    return applied;
                }
            }
        }
    }

    /// Read a page of the conversation's timeline.
    ///
    /// # Errors
    ///
    /// Returns a store error if the backend cannot be read.
    pub async fn snapshot(
        &self,
        conversation: &ConversationId,
        since_seq: u64,
        limit: usize,
    ) -> Result<TimelineSnapshot, TimelineError> {
        self.store.snapshot(conversation, since_seq, limit).await
    }
}
