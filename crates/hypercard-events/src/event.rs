//! The typed artifact lifecycle event.

use hypercard_types::{ArtifactKind, EventPhase, ItemId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Namespace shared by every artifact tag and event type.
pub const NAMESPACE: &str = "hypercard";

/// The dotted type name for a kind and phase.
///
/// Ready events are named after the tag version they were produced under,
/// so a ready widget is `hypercard.widget.v1` and a ready card is
/// `hypercard.card.v2`.
pub fn event_type_name(kind: ArtifactKind, phase: EventPhase) -> String {
    let suffix = match phase {
        EventPhase::Ready => kind.tag_version(),
        EventPhase::Start | EventPhase::Update | EventPhase::Error => phase.as_str(),
    };
    format!("{NAMESPACE}.{}.{suffix}", kind.tag_type())
}

/// One lifecycle event for one artifact occurrence.
///
/// Which optional fields are set depends on the kind: widgets carry `title`,
/// `widget_type` and `data`; cards carry `title`, `name`, `template` and
/// `data`; suggestion lists carry `suggestions`. Error events carry `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactEvent {
    /// Artifact kind.
    pub kind: ArtifactKind,
    /// Lifecycle phase.
    pub phase: EventPhase,
    /// The occurrence this event belongs to.
    pub item_id: ItemId,
    /// Human-readable title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Card display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Widget renderer type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget_type: Option<String>,
    /// Card template (the card id).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Full payload snapshot to date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Normalised suggestion list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
    /// Error message for error events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ArtifactEvent {
    /// Create an event with no optional fields set.
    pub const fn new(kind: ArtifactKind, phase: EventPhase, item_id: ItemId) -> Self {
        Self {
            kind,
            phase,
            item_id,
            title: None,
            name: None,
            widget_type: None,
            template: None,
            data: None,
            suggestions: None,
            error: None,
        }
    }

    /// Create an error event carrying `message` verbatim.
    pub fn failure(kind: ArtifactKind, item_id: ItemId, message: impl Into<String>) -> Self {
        Self::new(kind, EventPhase::Error, item_id).with_error(message)
    }

    /// The dotted type name of this event.
    pub fn type_name(&self) -> String {
        event_type_name(self.kind, self.phase)
    }

    /// Whether this event ends the occurrence's lifecycle.
    pub const fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Set the title; blank titles are left unset.
    #[must_use]
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = non_blank(title);
        self
    }

    /// Set the card name; blank names are left unset.
    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = non_blank(name);
        self
    }

    /// Set the widget type; blank types are left unset.
    #[must_use]
    pub fn with_widget_type(mut self, widget_type: &str) -> Self {
        self.widget_type = non_blank(widget_type);
        self
    }

    /// Set the card template; blank templates are left unset.
    #[must_use]
    pub fn with_template(mut self, template: &str) -> Self {
        self.template = non_blank(template);
        self
    }

    /// Attach the payload snapshot.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach a suggestion list.
    #[must_use]
    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = Some(suggestions);
        self
    }

    /// Attach an error message.
    #[must_use]
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ready_events_are_named_after_tag_version() {
        assert_eq!(
            event_type_name(ArtifactKind::Widget, EventPhase::Ready),
            "hypercard.widget.v1"
        );
        assert_eq!(
            event_type_name(ArtifactKind::Card, EventPhase::Ready),
            "hypercard.card.v2"
        );
        assert_eq!(
            event_type_name(ArtifactKind::Suggestions, EventPhase::Start),
            "hypercard.suggestions.start"
        );
    }

    #[test]
    fn blank_fields_stay_unset() {
        let event = ArtifactEvent::new(ArtifactKind::Widget, EventPhase::Start, ItemId::new("a"))
            .with_title("  ")
            .with_widget_type(" report ");
        assert_eq!(event.title, None);
        assert_eq!(event.widget_type.as_deref(), Some("report"));
    }

    #[test]
    fn failure_keeps_message_verbatim() {
        let event = ArtifactEvent::failure(ArtifactKind::Card, ItemId::new("a"), "  upstream: boom ");
        assert_eq!(event.phase, EventPhase::Error);
        assert_eq!(event.error.as_deref(), Some("  upstream: boom "));
        assert!(event.is_terminal());
    }
}
