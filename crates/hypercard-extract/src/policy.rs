//! Completion policy: a post-turn check that required artifact tags were
//! generated at all.
//!
//! Sessions only exist for tags that appeared. When the model never writes
//! a required tag nothing would ever report it, so once the final assistant
//! text is known this policy scans it for the literal opening tags and
//! publishes an error event for each one that is missing.

use hypercard_events::{ArtifactEvent, EventSink, publish_events};
use hypercard_types::{ArtifactKind, ItemId, TurnId};
use tracing::{debug, warn};

use crate::config::PolicyConfig;
use crate::extractor::TagIdentity;

/// Error message for a missing widget block.
pub const MISSING_WIDGET_MESSAGE: &str =
    "required <hypercard:widget:v1> block was not generated";

/// Error message for a missing runtime-card block.
pub const MISSING_CARD_MESSAGE: &str = "required <hypercard:card:v2> block was not generated";

/// Which tags a turn must contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionPolicy {
    require_widget: bool,
    require_card: bool,
}

impl CompletionPolicy {
    /// Create a policy. If neither tag is required, both are.
    pub const fn new(require_widget: bool, require_card: bool) -> Self {
        if !require_widget && !require_card {
            return Self {
                require_widget: true,
                require_card: true,
            };
        }
        Self {
            require_widget,
            require_card,
        }
    }

    /// Create a policy from configuration.
    pub const fn from_config(config: &PolicyConfig) -> Self {
        Self::new(config.require_widget, config.require_card)
    }

    /// Whether a widget block is required.
    pub const fn requires_widget(&self) -> bool {
        self.require_widget
    }

    /// Whether a runtime-card block is required.
    pub const fn requires_card(&self) -> bool {
        self.require_card
    }

    /// Error events for every required tag absent from `final_text`.
    pub fn missing_tag_events(&self, turn_id: &TurnId, final_text: &str) -> Vec<ArtifactEvent> {
        let checks = [
            (self.require_widget, ArtifactKind::Widget, MISSING_WIDGET_MESSAGE),
            (self.require_card, ArtifactKind::Card, MISSING_CARD_MESSAGE),
        ];
        checks
            .into_iter()
            .filter(|(required, _, _)| *required)
            .filter(|(_, kind, _)| !final_text.contains(&TagIdentity::for_kind(*kind).opening_tag()))
            .map(|(_, kind, message)| {
                let item_id = ItemId::new(turn_id.scoped(kind.tag_type()));
                warn!(turn_id = %turn_id, kind = %kind, "required artifact tag missing from turn");
                ArtifactEvent::failure(kind, item_id, message)
            })
            .collect()
    }

    /// Run the policy for a finished turn and publish its events.
    ///
    /// Without a sink the events are still returned but nothing is
    /// published.
    pub fn enforce(
        &self,
        turn_id: &TurnId,
        final_text: &str,
        sink: Option<&dyn EventSink>,
    ) -> Vec<ArtifactEvent> {
        let events = self.missing_tag_events(turn_id, final_text);
        match sink {
            Some(sink) => {
                publish_events(sink, &events);
            }
            None if !events.is_empty() => {
                debug!(turn_id = %turn_id, missing = events.len(), "no event sink, skipping publication");
            }
            None => {}
        }
        events
    }
}

impl Default for CompletionPolicy {
    fn default() -> Self {
        Self::new(false, false)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hypercard_events::MemorySink;
    use hypercard_types::EventPhase;

    use super::*;

    #[test]
    fn both_flags_false_means_both_required() {
        let policy = CompletionPolicy::from_config(&PolicyConfig::default());
        assert!(policy.requires_widget());
        assert!(policy.requires_card());

        let only_card = CompletionPolicy::new(false, true);
        assert!(!only_card.requires_widget());
        assert!(only_card.requires_card());
    }

    #[test]
    fn missing_tags_produce_errors_keyed_by_turn() {
        let policy = CompletionPolicy::default();
        let events = policy.missing_tag_events(&TurnId::new("turn-9"), "Here is your report.");
        let ids: Vec<&str> = events.iter().map(|e| e.item_id.as_str()).collect();
        assert_eq!(ids, ["turn-9:widget", "turn-9:card"]);
        assert!(events.iter().all(|e| e.phase == EventPhase::Error));
        assert_eq!(events.first().and_then(|e| e.error.as_deref()), Some(MISSING_WIDGET_MESSAGE));
    }

    #[test]
    fn present_tags_satisfy_the_policy_even_when_empty() {
        let policy = CompletionPolicy::default();
        let text = "<hypercard:widget:v1></hypercard:widget:v1>\n<hypercard:card:v2>\n</hypercard:card:v2>";
        assert!(policy.missing_tag_events(&TurnId::new("t"), text).is_empty());
    }

    #[test]
    fn only_required_tags_are_checked() {
        let policy = CompletionPolicy::new(true, false);
        let events = policy.missing_tag_events(&TurnId::new("t"), "<hypercard:card:v2>");
        assert_eq!(events.len(), 1);
        assert_eq!(events.first().map(|e| e.kind), Some(ArtifactKind::Widget));
    }

    #[test]
    fn enforce_publishes_to_sink() {
        let sink = MemorySink::new();
        let policy = CompletionPolicy::default();
        let events = policy.enforce(&TurnId::new("t"), "<hypercard:widget:v1>", Some(&sink));
        assert_eq!(events.len(), 1);
        assert_eq!(sink.events(), events);
    }

    #[test]
    fn enforce_without_sink_is_quiet() {
        let policy = CompletionPolicy::default();
        let events = policy.enforce(&TurnId::new("t"), "", None);
        assert_eq!(events.len(), 2);
    }
}
