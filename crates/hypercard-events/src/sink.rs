//! Event publication targets.
//!
//! Publication is fire-and-forget: a sink that fails is logged and the
//! caller moves on. Within one occurrence the caller publishes events in the
//! order the session returned them, which is what keeps start ahead of
//! update ahead of the terminal event.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::EventError;
use crate::event::ArtifactEvent;
use crate::registry::EventRegistry;
use crate::wire::SemFrame;

/// Default capacity of the frame broadcast channel.
///
/// A subscriber that falls more than this many frames behind receives
/// [`broadcast::error::RecvError::Lagged`] and skips ahead.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Something that accepts lifecycle events.
pub trait EventSink: Send + Sync {
    /// Publish one event.
    ///
    /// # Errors
    ///
    /// Returns an [`EventError`] if the event cannot be encoded or delivered.
    fn publish(&self, event: &ArtifactEvent) -> Result<(), EventError>;
}

/// Publish events in order, logging and skipping failures.
///
/// Returns the number of events that were accepted by the sink.
pub fn publish_events(sink: &dyn EventSink, events: &[ArtifactEvent]) -> usize {
    let mut published: usize = 0;
    for event in events {
        match sink.publish(event) {
            Ok(()) => published = published.saturating_add(1),
            Err(e) => {
                warn!(
                    error = %e,
                    item_id = %event.item_id,
                    event_type = %event.type_name(),
                    "failed to publish artifact event"
                );
            }
        }
    }
    published
}

/// Maps events to wire frames and fans them out to every subscriber.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    registry: Arc<EventRegistry>,
    tx: broadcast::Sender<SemFrame>,
}

impl BroadcastSink {
    /// Create a sink with [`DEFAULT_BROADCAST_CAPACITY`].
    pub fn new(registry: Arc<EventRegistry>) -> Self {
        Self::with_capacity(registry, DEFAULT_BROADCAST_CAPACITY)
    }

    /// Create a sink with an explicit channel capacity.
    pub fn with_capacity(registry: Arc<EventRegistry>, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { registry, tx }
    }

    /// Subscribe to the frame stream.
    pub fn subscribe(&self) -> broadcast::Receiver<SemFrame> {
        self.tx.subscribe()
    }

    /// The registry used to encode frames.
    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }
}

impl EventSink for BroadcastSink {
    fn publish(&self, event: &ArtifactEvent) -> Result<(), EventError> {
        let frame = self.registry.to_frame(event)?;
        // send returns Err only when there are zero receivers,
        // which is normal when no viewer is connected.
        let receivers = self.tx.send(frame).unwrap_or(0);
        debug!(
            item_id = %event.item_id,
            event_type = %event.type_name(),
            receivers,
            "artifact frame broadcast"
        );
        Ok(())
    }
}

/// Records every published event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<ArtifactEvent>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything published so far, in publication order.
    pub fn events(&self) -> Vec<ArtifactEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of events published so far.
    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    /// Whether nothing has been published.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for MemorySink {
    fn publish(&self, event: &ArtifactEvent) -> Result<(), EventError> {
        let mut events = self
            .events
            .lock()
            .map_err(|e| EventError::SinkUnavailable(format!("memory sink poisoned: {e}")))?;
        events.push(event.clone());
        Ok(())
    }
}
