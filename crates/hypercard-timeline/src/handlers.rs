//! Projection handlers, registered per dotted event name.
//!
//! A handler turns one decoded lifecycle event into the entity writes it
//! implies. Handlers are pure; sequencing and storage belong to the
//! projector.

use std::collections::BTreeMap;

use hypercard_events::{ArtifactEvent, event_type_name};
use hypercard_types::{ArtifactKind, EntityKind, EventPhase};
use serde_json::{Value, json};

use crate::error::TimelineError;

/// Entity id shared by every suggestions frame in a conversation.
pub const SUGGESTIONS_ENTITY_ID: &str = "suggestions:assistant";

/// Schema version stamped on widget and card result entities.
pub const RESULT_SCHEMA_VERSION: u32 = 1;

/// One entity write produced by a handler.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityWrite {
    /// Target entity id.
    pub id: String,
    /// Entity kind.
    pub kind: EntityKind,
    /// Full replacement props.
    pub props: Value,
}

impl EntityWrite {
    fn new(id: impl Into<String>, kind: EntityKind, props: Value) -> Self {
        Self {
            id: id.into(),
            kind,
            props,
        }
    }
}

/// Projection function: `(event type name, event) -> writes`.
pub type ProjectionHandler = fn(&str, &ArtifactEvent) -> Result<Vec<EntityWrite>, TimelineError>;

/// Dotted event name to projection handler.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    by_name: BTreeMap<String, ProjectionHandler>,
}

impl HandlerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handlers for every Hypercard event type.
    pub fn hypercard() -> Self {
        let mut registry = Self::new();
        for kind in ArtifactKind::ALL {
            for phase in EventPhase::ALL {
                let handler: ProjectionHandler = match (kind, phase) {
                    (ArtifactKind::Suggestions, _) => project_suggestions,
                    (ArtifactKind::Widget, EventPhase::Ready) => project_widget_result,
                    (ArtifactKind::Card, EventPhase::Ready) => project_card_result,
                    (ArtifactKind::Widget | ArtifactKind::Card, _) => project_status,
                };
                registry
                    .by_name
                    .insert(event_type_name(kind, phase), handler);
            }
        }
        registry
    }

    /// Register a handler under a dotted event name.
    ///
    /// # Errors
    ///
    /// Returns [`TimelineError::DuplicateHandler`] if the name is taken.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: ProjectionHandler,
    ) -> Result<(), TimelineError> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(TimelineError::DuplicateHandler(name));
        }
        self.by_name.insert(name, handler);
        Ok(())
    }

    /// Look up the handler for an event name.
    pub fn get(&self, name: &str) -> Option<ProjectionHandler> {
        self.by_name.get(name).copied()
    }

    /// Registered event names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Status line text for a start, update or error event.
pub fn status_text(event: &ArtifactEvent) -> String {
    let widget = event.kind == ArtifactKind::Widget;
    if event.phase == EventPhase::Error {
        return match event.error.as_deref() {
            Some(message) => message.to_owned(),
            None if widget => "Widget generation failed".to_owned(),
            None => "Card generation failed".to_owned(),
        };
    }
    if widget {
        return event.title.as_deref().map_or_else(
            || "Building widget...".to_owned(),
            |title| format!("Building widget: {title}"),
        );
    }
    event
        .name
        .as_deref()
        .or(event.title.as_deref())
        .map_or_else(
            || "Building card proposal...".to_owned(),
            |name| format!("Building card: {name}"),
        )
}

/// Status-class projection: upsert `itemID:status`.
///
/// # Errors
///
/// Infallible; returns `Result` to fit [`ProjectionHandler`].
pub fn project_status(_name: &str, event: &ArtifactEvent) -> Result<Vec<EntityWrite>, TimelineError> {
    let level = if event.phase == EventPhase::Error {
        "error"
    } else {
        "info"
    };
    let props = json!({
        "itemId": event.item_id,
        "phase": event.phase.as_str(),
        "text": status_text(event),
        "level": level,
    });
    Ok(vec![EntityWrite::new(
        event.item_id.scoped("status"),
        EntityKind::Status,
        props,
    )])
}

fn result_data(event: &ArtifactEvent) -> Value {
    event.data.clone().unwrap_or_else(|| json!({}))
}

fn tool_result(name: &str, event: &ArtifactEvent, data: Value) -> EntityWrite {
    EntityWrite::new(
        event.item_id.scoped("result"),
        EntityKind::ToolResult,
        json!({
            "itemId": event.item_id,
            "phase": "ready",
            "resultKind": name,
            "result": data,
        }),
    )
}

/// Widget ready: upsert `itemID:widget` and `itemID:result`.
///
/// # Errors
///
/// Infallible; returns `Result` to fit [`ProjectionHandler`].
pub fn project_widget_result(
    name: &str,
    event: &ArtifactEvent,
) -> Result<Vec<EntityWrite>, TimelineError> {
    let data = result_data(event);
    let widget = EntityWrite::new(
        event.item_id.scoped("widget"),
        EntityKind::HypercardWidget,
        json!({
            "schemaVersion": RESULT_SCHEMA_VERSION,
            "itemId": event.item_id,
            "title": event.title.as_deref().unwrap_or_default(),
            "widgetType": event.widget_type.as_deref().unwrap_or_default(),
            "phase": "ready",
            "error": "",
            "data": data,
        }),
    );
    Ok(vec![widget, tool_result(name, event, data)])
}

/// Card ready: upsert `itemID:card` and `itemID:result`.
///
/// # Errors
///
/// Infallible; returns `Result` to fit [`ProjectionHandler`].
pub fn project_card_result(
    name: &str,
    event: &ArtifactEvent,
) -> Result<Vec<EntityWrite>, TimelineError> {
    let data = result_data(event);
    let card = EntityWrite::new(
        event.item_id.scoped("card"),
        EntityKind::HypercardCard,
        json!({
            "schemaVersion": RESULT_SCHEMA_VERSION,
            "itemId": event.item_id,
            "title": event.title.as_deref().unwrap_or_default(),
            "name": event.name.as_deref().unwrap_or_default(),
            "template": event.template.as_deref().unwrap_or_default(),
            "phase": "ready",
            "error": "",
            "data": data,
        }),
    );
    Ok(vec![card, tool_result(name, event, data)])
}

/// Any suggestions phase: replace the list on [`SUGGESTIONS_ENTITY_ID`].
/// Error frames leave the list alone.
///
/// # Errors
///
/// Returns [`TimelineError::Serialization`] if the items cannot be encoded.
pub fn project_suggestions(
    _name: &str,
    event: &ArtifactEvent,
) -> Result<Vec<EntityWrite>, TimelineError> {
    if event.phase == EventPhase::Error {
        return Ok(Vec::new());
    }
    let items = serde_json::to_value(event.suggestions.as_deref().unwrap_or_default())?;
    Ok(vec![EntityWrite::new(
        SUGGESTIONS_ENTITY_ID,
        EntityKind::Suggestions,
        json!({
            "source": "assistant",
            "consumedAt": null,
            "items": items,
        }),
    )])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hypercard_types::ItemId;

    use super::*;

    fn event(kind: ArtifactKind, phase: EventPhase) -> ArtifactEvent {
        ArtifactEvent::new(kind, phase, ItemId::new("m1"))
    }

    fn project(event: &ArtifactEvent) -> Vec<EntityWrite> {
        let registry = HandlerRegistry::hypercard();
        let name = event.type_name();
        registry
            .get(&name)
            .map(|handler| handler(&name, event).unwrap())
            .unwrap()
    }

    #[test]
    fn every_hypercard_event_has_a_handler() {
        let registry = HandlerRegistry::hypercard();
        assert_eq!(registry.len(), 12);
        assert!(registry.get("hypercard.card.v2").is_some());
        assert!(registry.get("hypercard.card.v1").is_none());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = HandlerRegistry::hypercard();
        let result = registry.register("hypercard.widget.start", project_status);
        assert!(matches!(result, Err(TimelineError::DuplicateHandler(_))));
        assert!(registry.register("custom.thing.v1", project_status).is_ok());
    }

    #[test]
    fn status_text_uses_title_name_or_fallback() {
        let start = event(ArtifactKind::Widget, EventPhase::Start);
        assert_eq!(status_text(&start), "Building widget...");
        assert_eq!(
            status_text(&start.with_title("Stock Summary")),
            "Building widget: Stock Summary"
        );

        let card = event(ArtifactKind::Card, EventPhase::Update);
        assert_eq!(status_text(&card), "Building card proposal...");
        assert_eq!(
            status_text(&card.clone().with_title("Fallback title")),
            "Building card: Fallback title"
        );
        assert_eq!(
            status_text(&card.with_title("Fallback title").with_name("Low stock")),
            "Building card: Low stock"
        );
    }

    #[test]
    fn error_status_carries_message_or_generic_text() {
        let failed = event(ArtifactKind::Card, EventPhase::Error);
        assert_eq!(status_text(&failed), "Card generation failed");

        let writes = project(&failed.with_error("runtime card.id is required"));
        let status = writes.first();
        assert_eq!(status.map(|w| w.id.as_str()), Some("m1:status"));
        assert_eq!(
            status.and_then(|w| w.props.get("text")),
            Some(&json!("runtime card.id is required"))
        );
        assert_eq!(status.and_then(|w| w.props.get("level")), Some(&json!("error")));
    }

    #[test]
    fn widget_ready_writes_result_and_tool_result() {
        let ready = event(ArtifactKind::Widget, EventPhase::Ready)
            .with_title("Stock Summary")
            .with_widget_type("report");
        let writes = project(&ready);
        let ids: Vec<&str> = writes.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, ["m1:widget", "m1:result"]);

        let widget = writes.first().map(|w| &w.props);
        assert_eq!(widget.and_then(|p| p.get("schemaVersion")), Some(&json!(1)));
        assert_eq!(widget.and_then(|p| p.get("data")), Some(&json!({})));
        assert_eq!(widget.and_then(|p| p.get("error")), Some(&json!("")));

        let result = writes.get(1);
        assert_eq!(result.map(|w| w.kind), Some(EntityKind::ToolResult));
        assert_eq!(
            result.and_then(|w| w.props.get("resultKind")),
            Some(&json!("hypercard.widget.v1"))
        );
    }

    #[test]
    fn card_ready_carries_name_and_template() {
        let ready = event(ArtifactKind::Card, EventPhase::Ready)
            .with_name("Low stock")
            .with_template("lowStock")
            .with_data(json!({"card": {"id": "lowStock"}}));
        let writes = project(&ready);
        let card = writes.first();
        assert_eq!(card.map(|w| w.kind), Some(EntityKind::HypercardCard));
        assert_eq!(card.and_then(|w| w.props.get("template")), Some(&json!("lowStock")));
        assert_eq!(
            card.and_then(|w| w.props.pointer("/data/card/id")),
            Some(&json!("lowStock"))
        );
    }

    #[test]
    fn suggestion_errors_write_nothing() {
        let failed = event(ArtifactKind::Suggestions, EventPhase::Error).with_error("boom");
        assert!(project(&failed).is_empty());

        let start = event(ArtifactKind::Suggestions, EventPhase::Start)
            .with_suggestions(vec!["Show stock".to_owned()]);
        let writes = project(&start);
        assert_eq!(writes.first().map(|w| w.id.as_str()), Some(SUGGESTIONS_ENTITY_ID));
        assert_eq!(
            writes.first().and_then(|w| w.props.get("consumedAt")),
            Some(&Value::Null)
        );
    }
}
