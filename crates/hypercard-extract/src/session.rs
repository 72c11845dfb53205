//! The per-occurrence extraction state machine.
//!
//! One [`GatedSession`] handles every kind; the kind's [`ArtifactSpec`]
//! decides what counts as enough to start, what counts as complete, and how
//! events are shaped. The caller that slices occurrences out of the stream
//! drives a session one chunk at a time and closes it with exactly one
//! [`on_completed`](ExtractionSession::on_completed).
//!
//! ```text
//! NotStarted --(discriminator)--> Started --(chunk)--> Started (update)
//!      |                             |
//!      +-------(on_completed)--------+--> Ready | Failed
//! ```

use std::marker::PhantomData;
use std::time::{Duration, Instant};

use hypercard_events::ArtifactEvent;
use hypercard_types::{ArtifactKind, EventPhase, ItemId};
use tracing::{debug, info, warn};

use crate::decoder::{SnapshotDecoder, YamlSnapshotDecoder};
use crate::error::DecodeError;
use crate::kinds::{ArtifactSpec, CardSpec, SuggestionsSpec, Validation, WidgetSpec};

/// Error message used when an idle session is forced to terminate.
pub const IDLE_TIMEOUT_MESSAGE: &str = "artifact stream ended without completion";

/// How the generation feeding an occurrence ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The tag closed or the turn finished normally.
    Success,
    /// The generation pipeline failed; carries its message.
    Failure(String),
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No start event yet.
    NotStarted,
    /// Start emitted; updates may follow.
    Started,
    /// Ready emitted.
    Ready,
    /// Error emitted.
    Failed,
    /// Completed with nothing to show (empty optional payload).
    Empty,
}

impl SessionPhase {
    /// Whether the session ignores all further input.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed | Self::Empty)
    }
}

/// Object-safe view of a session, used by the extractor registry.
pub trait ExtractionSession: Send {
    /// The occurrence this session decodes.
    fn item_id(&self) -> &ItemId;

    /// The artifact kind.
    fn kind(&self) -> ArtifactKind;

    /// Current lifecycle phase.
    fn phase(&self) -> SessionPhase;

    /// Feed the next chunk of the tag body.
    fn on_raw_chunk(&mut self, chunk: &[u8]) -> Vec<ArtifactEvent>;

    /// Close the occurrence with its complete body.
    fn on_completed(&mut self, full: &[u8], outcome: StreamOutcome) -> Vec<ArtifactEvent>;

    /// Force an error terminal if no chunk arrived within the idle timeout.
    fn expire_if_idle(&mut self, now: Instant) -> Vec<ArtifactEvent>;
}

/// A session that gates events on the kind's discriminator and validates
/// once at completion.
#[derive(Debug)]
pub struct GatedSession<S, D> {
    item_id: ItemId,
    decoder: D,
    phase: SessionPhase,
    idle_timeout: Option<Duration>,
    last_activity: Instant,
    _spec: PhantomData<fn() -> S>,
}

/// Widget session using the YAML decoder.
pub type WidgetSession = GatedSession<WidgetSpec, YamlSnapshotDecoder<hypercard_types::WidgetPayload>>;

/// Runtime-card session using the YAML decoder.
pub type CardSession = GatedSession<CardSpec, YamlSnapshotDecoder<hypercard_types::CardPayload>>;

/// Suggestions session using the YAML decoder.
pub type SuggestionsSession =
    GatedSession<SuggestionsSpec, YamlSnapshotDecoder<hypercard_types::SuggestionsPayload>>;

impl<S, D> GatedSession<S, D>
where
    S: ArtifactSpec,
    D: SnapshotDecoder<Snapshot = S::Payload>,
{
    /// Create a session for one occurrence.
    pub fn new(item_id: ItemId, decoder: D, idle_timeout: Option<Duration>) -> Self {
        Self {
            item_id,
            decoder,
            phase: SessionPhase::NotStarted,
            idle_timeout,
            last_activity: Instant::now(),
            _spec: PhantomData,
        }
    }

    fn observe(&mut self, snapshot: &S::Payload) -> Vec<ArtifactEvent> {
        match self.phase {
            SessionPhase::NotStarted => {
                let Some(discriminator) = S::discriminator(snapshot) else {
                    return Vec::new();
                };
                self.phase = SessionPhase::Started;
                info!(
                    item_id = %self.item_id,
                    kind = %S::KIND,
                    discriminator = discriminator,
                    "artifact started"
                );
                vec![S::event(EventPhase::Start, &self.item_id, snapshot)]
            }
            SessionPhase::Started => vec![S::event(EventPhase::Update, &self.item_id, snapshot)],
            SessionPhase::Ready | SessionPhase::Failed | SessionPhase::Empty => Vec::new(),
        }
    }

    fn fail(&mut self, message: String) -> Vec<ArtifactEvent> {
        self.phase = SessionPhase::Failed;
        warn!(
            item_id = %self.item_id,
            kind = %S::KIND,
            error = message,
            "artifact failed"
        );
        vec![ArtifactEvent::failure(S::KIND, self.item_id.clone(), message)]
    }
}

impl<S, D> ExtractionSession for GatedSession<S, D>
where
    S: ArtifactSpec,
    D: SnapshotDecoder<Snapshot = S::Payload>,
{
    fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    fn kind(&self) -> ArtifactKind {
        S::KIND
    }

    fn phase(&self) -> SessionPhase {
        self.phase
    }

    fn on_raw_chunk(&mut self, chunk: &[u8]) -> Vec<ArtifactEvent> {
        if self.phase.is_terminal() {
            return Vec::new();
        }
        self.last_activity = Instant::now();

        match self.decoder.feed(chunk) {
            Ok(Some(snapshot)) => self.observe(&snapshot),
            Ok(None) => Vec::new(),
            Err(e @ DecodeError::TooLarge { .. }) => self.fail(e.to_string()),
            Err(e) => {
                debug!(
                    item_id = %self.item_id,
                    kind = %S::KIND,
                    error = %e,
                    buffered = self.decoder.buffered_len(),
                    "partial payload not decodable yet"
                );
                Vec::new()
            }
        }
    }

    fn on_completed(&mut self, full: &[u8], outcome: StreamOutcome) -> Vec<ArtifactEvent> {
        if self.phase.is_terminal() {
            debug!(item_id = %self.item_id, kind = %S::KIND, "completion after terminal ignored");
            return Vec::new();
        }
        if let StreamOutcome::Failure(message) = outcome {
            return self.fail(message);
        }

        let payload = match self.decoder.finalize(full) {
            Ok(payload) => payload,
            Err(e) => return self.fail(format!("{} payload could not be decoded: {e}", S::KIND)),
        };

        match S::validate(payload) {
            Validation::Rejected(message) => self.fail(message),
            Validation::Empty => {
                debug!(item_id = %self.item_id, kind = %S::KIND, "artifact completed empty");
                self.phase = SessionPhase::Empty;
                Vec::new()
            }
            Validation::Ready(payload) => {
                let mut events = Vec::with_capacity(2);
                if self.phase == SessionPhase::NotStarted {
                    events.push(S::event(EventPhase::Start, &self.item_id, &payload));
                }
                events.push(S::event(EventPhase::Ready, &self.item_id, &payload));
                self.phase = SessionPhase::Ready;
                info!(item_id = %self.item_id, kind = %S::KIND, "artifact ready");
                events
            }
        }
    }

    fn expire_if_idle(&mut self, now: Instant) -> Vec<ArtifactEvent> {
        if self.phase.is_terminal() {
            return Vec::new();
        }
        let Some(timeout) = self.idle_timeout else {
            return Vec::new();
        };
        let idle = now.saturating_duration_since(self.last_activity);
        if idle < timeout {
            return Vec::new();
        }
        self.fail(IDLE_TIMEOUT_MESSAGE.to_owned())
    }
}
