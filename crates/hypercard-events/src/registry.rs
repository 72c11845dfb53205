//! Explicit registry of event types.
//!
//! Each dotted event name maps to the (kind, phase) pair it constructs and
//! to the function that encodes its wire `data`. The registry is a plain
//! value built at startup; nothing is registered globally.

use std::collections::BTreeMap;

use hypercard_types::{ArtifactKind, EventPhase, ItemId};
use serde_json::{Map, Value};

use crate::error::EventError;
use crate::event::{ArtifactEvent, event_type_name};
use crate::wire::SemFrame;

/// Encodes the wire `data` object for an event.
pub type FrameEncoder = fn(&ArtifactEvent) -> Map<String, Value>;

/// One registered event type.
#[derive(Debug, Clone)]
pub struct EventRegistration {
    /// Dotted type name.
    pub name: String,
    /// The kind events of this type carry.
    pub kind: ArtifactKind,
    /// The phase events of this type carry.
    pub phase: EventPhase,
    /// Wire encoder for events of this type.
    pub encode: FrameEncoder,
}

/// Name-to-codec registry for lifecycle events.
#[derive(Debug, Clone, Default)]
pub struct EventRegistry {
    by_name: BTreeMap<String, EventRegistration>,
}

impl EventRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the full hypercard taxonomy: start, update,
    /// ready and error for widgets, cards and suggestions.
    pub fn hypercard() -> Self {
        let mut registry = Self::new();
        for kind in ArtifactKind::ALL {
            let encode: FrameEncoder = match kind {
                ArtifactKind::Widget => encode_widget,
                ArtifactKind::Card => encode_card,
                ArtifactKind::Suggestions => encode_suggestions,
            };
            for phase in EventPhase::ALL {
                registry
                    .by_name
                    .entry(event_type_name(kind, phase))
                    .or_insert_with_key(|name| EventRegistration {
                        name: name.clone(),
                        kind,
                        phase,
                        encode,
                    });
            }
        }
        registry
    }

    /// Register an event type.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DuplicateType`] if the name is already taken.
    pub fn register(
        &mut self,
        kind: ArtifactKind,
        phase: EventPhase,
        encode: FrameEncoder,
    ) -> Result<(), EventError> {
        let name = event_type_name(kind, phase);
        if self.by_name.contains_key(&name) {
            return Err(EventError::DuplicateType(name));
        }
        self.by_name.insert(
            name.clone(),
            EventRegistration {
                name,
                kind,
                phase,
                encode,
            },
        );
        Ok(())
    }

    /// Look up a registration by dotted name.
    pub fn get(&self, name: &str) -> Option<&EventRegistration> {
        self.by_name.get(name)
    }

    /// Whether a dotted name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Registered names in lexical order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    /// Number of registered event types.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Map an event to its wire frame.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::UnknownType`] if the event's type is not registered.
    pub fn to_frame(&self, event: &ArtifactEvent) -> Result<SemFrame, EventError> {
        let name = event.type_name();
        let registration = self
            .by_name
            .get(&name)
            .ok_or_else(|| EventError::UnknownType(name.clone()))?;
        let data = (registration.encode)(event);
        Ok(SemFrame::new(name, event.item_id.as_str(), Value::Object(data)))
    }

    /// Reconstruct a typed event from a wire frame.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::UnknownType`] for unregistered types and
    /// [`EventError::MalformedFrame`] when `data` is not an object or a
    /// field has the wrong shape.
    pub fn from_frame(&self, frame: &SemFrame) -> Result<ArtifactEvent, EventError> {
        let registration = self
            .by_name
            .get(frame.event_type())
            .ok_or_else(|| EventError::UnknownType(frame.event_type().to_owned()))?;

        let data = match &frame.event.data {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                return Err(EventError::MalformedFrame(format!(
                    "{}: data must be an object, got {other}",
                    registration.name
                )));
            }
        };

        let mut event = ArtifactEvent::new(
            registration.kind,
            registration.phase,
            ItemId::new(frame.event.id.clone()),
        );
        event.title = string_field(&data, "title", &registration.name)?;
        event.name = string_field(&data, "name", &registration.name)?;
        event.widget_type = string_field(&data, "widgetType", &registration.name)?;
        event.template = string_field(&data, "template", &registration.name)?;
        event.error = string_field(&data, "error", &registration.name)?;
        event.data = data.get("data").cloned();
        event.suggestions = data
            .get("suggestions")
            .map(|value| serde_json::from_value::<Vec<String>>(value.clone()))
            .transpose()
            .map_err(|e| {
                EventError::MalformedFrame(format!("{}: suggestions: {e}", registration.name))
            })?;
        Ok(event)
    }
}

fn string_field(
    data: &Map<String, Value>,
    key: &str,
    event_name: &str,
) -> Result<Option<String>, EventError> {
    match data.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(EventError::MalformedFrame(format!(
            "{event_name}: {key} must be a string, got {other}"
        ))),
    }
}

fn insert_opt_str(map: &mut Map<String, Value>, key: &str, value: Option<&String>) {
    if let Some(v) = value {
        map.insert(key.to_owned(), Value::String(v.clone()));
    }
}

fn encode_widget(event: &ArtifactEvent) -> Map<String, Value> {
    let mut map = Map::new();
    insert_opt_str(&mut map, "title", event.title.as_ref());
    insert_opt_str(&mut map, "widgetType", event.widget_type.as_ref());
    if let Some(data) = &event.data {
        map.insert("data".to_owned(), data.clone());
    }
    insert_opt_str(&mut map, "error", event.error.as_ref());
    map
}

fn encode_card(event: &ArtifactEvent) -> Map<String, Value> {
    let mut map = Map::new();
    insert_opt_str(&mut map, "title", event.title.as_ref());
    insert_opt_str(&mut map, "name", event.name.as_ref());
    insert_opt_str(&mut map, "template", event.template.as_ref());
    if let Some(data) = &event.data {
        map.insert("data".to_owned(), data.clone());
    }
    insert_opt_str(&mut map, "error", event.error.as_ref());
    map
}

fn encode_suggestions(event: &ArtifactEvent) -> Map<String, Value> {
    let mut map = Map::new();
    if let Some(items) = &event.suggestions {
        map.insert(
            "suggestions".to_owned(),
            Value::Array(items.iter().cloned().map(Value::String).collect()),
        );
    }
    insert_opt_str(&mut map, "error", event.error.as_ref());
    map
}
