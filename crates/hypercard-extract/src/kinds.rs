//! Per-kind rules plugged into the generic session.
//!
//! A kind supplies three things: the discriminator that gates the start
//! event, the completeness rules applied once the body is final, and how a
//! payload snapshot is turned into an event.

use std::collections::HashSet;

use hypercard_events::ArtifactEvent;
use hypercard_types::{
    ArtifactKind, CardPayload, EventPhase, ItemId, SuggestionsPayload, WidgetPayload,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Maximum number of suggestions kept after normalisation.
pub const MAX_SUGGESTIONS: usize = 8;

/// Outcome of completeness validation on a final payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation<P> {
    /// Complete; carries the normalised payload.
    Ready(P),
    /// Incomplete; carries the error message.
    Rejected(String),
    /// Nothing was generated. Only optional kinds produce this.
    Empty,
}

/// Rules for one artifact kind.
pub trait ArtifactSpec: Send + Sync + 'static {
    /// The decoded payload snapshot.
    type Payload: DeserializeOwned + Default + Send + 'static;

    /// The kind this spec handles.
    const KIND: ArtifactKind;

    /// The human-readable discriminator, if the snapshot has one yet.
    fn discriminator(payload: &Self::Payload) -> Option<String>;

    /// Completeness check on the final payload.
    fn validate(payload: Self::Payload) -> Validation<Self::Payload>;

    /// Build the event for a phase from a snapshot.
    fn event(phase: EventPhase, item_id: &ItemId, payload: &Self::Payload) -> ArtifactEvent;
}

/// `<hypercard:widget:v1>` rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct WidgetSpec;

impl ArtifactSpec for WidgetSpec {
    type Payload = WidgetPayload;

    const KIND: ArtifactKind = ArtifactKind::Widget;

    fn discriminator(payload: &WidgetPayload) -> Option<String> {
        non_empty(&payload.title)
    }

    fn validate(payload: WidgetPayload) -> Validation<WidgetPayload> {
        if payload.title.trim().is_empty() {
            return Validation::Rejected("widget title is required".to_owned());
        }
        if payload.widget_type.trim().is_empty() {
            return Validation::Rejected("widget type is required".to_owned());
        }
        Validation::Ready(payload)
    }

    fn event(phase: EventPhase, item_id: &ItemId, payload: &WidgetPayload) -> ArtifactEvent {
        let event = ArtifactEvent::new(Self::KIND, phase, item_id.clone())
            .with_title(&payload.title)
            .with_widget_type(&payload.widget_type);
        attach_snapshot(event, phase, payload)
    }
}

/// `<hypercard:card:v2>` rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct CardSpec;

impl ArtifactSpec for CardSpec {
    type Payload = CardPayload;

    const KIND: ArtifactKind = ArtifactKind::Card;

    fn discriminator(payload: &CardPayload) -> Option<String> {
        non_empty(payload.display_name())
    }

    fn validate(mut payload: CardPayload) -> Validation<CardPayload> {
        if payload.display_name().is_empty() {
            return Validation::Rejected("runtime card name is required".to_owned());
        }
        let card_id = payload.card.id.trim();
        if card_id.is_empty() {
            return Validation::Rejected("runtime card.id is required".to_owned());
        }
        if !is_identifier(card_id) {
            return Validation::Rejected("runtime card.id must be an identifier".to_owned());
        }
        if payload.card.code.trim().is_empty() {
            return Validation::Rejected("runtime card.code is required".to_owned());
        }
        payload.card.id = card_id.to_owned();
        Validation::Ready(payload)
    }

    fn event(phase: EventPhase, item_id: &ItemId, payload: &CardPayload) -> ArtifactEvent {
        let event = ArtifactEvent::new(Self::KIND, phase, item_id.clone())
            .with_title(&payload.title)
            .with_name(payload.display_name())
            .with_template(&payload.card.id);
        attach_snapshot(event, phase, payload)
    }
}

/// `<hypercard:suggestions:v1>` rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuggestionsSpec;

impl ArtifactSpec for SuggestionsSpec {
    type Payload = SuggestionsPayload;

    const KIND: ArtifactKind = ArtifactKind::Suggestions;

    fn discriminator(payload: &SuggestionsPayload) -> Option<String> {
        normalize_suggestions(&payload.items).into_iter().next()
    }

    fn validate(payload: SuggestionsPayload) -> Validation<SuggestionsPayload> {
        let items = normalize_suggestions(&payload.items);
        if items.is_empty() {
            Validation::Empty
        } else {
            Validation::Ready(SuggestionsPayload { items })
        }
    }

    fn event(phase: EventPhase, item_id: &ItemId, payload: &SuggestionsPayload) -> ArtifactEvent {
        ArtifactEvent::new(Self::KIND, phase, item_id.clone())
            .with_suggestions(normalize_suggestions(&payload.items))
    }
}

/// Trim, drop empties, de-duplicate case-insensitively (first seen wins),
/// and cap at [`MAX_SUGGESTIONS`].
pub fn normalize_suggestions(items: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .filter(|item| seen.insert(item.to_lowercase()))
        .take(MAX_SUGGESTIONS)
        .map(str::to_owned)
        .collect()
}

/// `[A-Za-z_][A-Za-z0-9_-]*`
fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// Start events carry only the discriminator and secondary fields; update
/// and terminal events carry the full snapshot.
fn attach_snapshot<P: Serialize>(event: ArtifactEvent, phase: EventPhase, payload: &P) -> ArtifactEvent {
    if phase == EventPhase::Start {
        return event;
    }
    match serde_json::to_value(payload) {
        Ok(data) => event.with_data(data),
        Err(_) => event,
    }
}
