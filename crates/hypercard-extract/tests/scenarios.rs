//! End-to-end extraction scenarios.
//!
//! Each test plays the part of the tag-boundary scanner: it opens a session
//! through the registry, drives it chunk by chunk, and publishes the
//! resulting events to a [`MemorySink`].

#![allow(clippy::unwrap_used)]

use hypercard_events::{ArtifactEvent, MemorySink, publish_events};
use hypercard_extract::{
    CompletionPolicy, ExtractionConfig, ExtractionSession, ExtractorRegistry, StreamOutcome,
    TagEdge, TagIdentity,
};
use hypercard_types::{ArtifactKind, EventPhase, ItemId, TurnId};

const STOCK_WIDGET: &str = "```yaml\n\
type: report\n\
title: Stock Summary\n\
artifact:\n  \
  id: inv-report\n  \
  data:\n    \
    rows: 3\n    \
    lowStock: [widgets, gears]\n\
```\n";

fn registry() -> ExtractorRegistry {
    ExtractorRegistry::from_config(&ExtractionConfig::default()).unwrap()
}

fn open(registry: &ExtractorRegistry, tag: &str, item: &str) -> Box<dyn ExtractionSession> {
    let (extractor, edge) = registry.match_tag(tag).unwrap();
    assert_eq!(edge, TagEdge::Open);
    extractor.open_session(ItemId::new(item))
}

/// Feed `body` split at every `step` bytes, then complete it.
fn stream(session: &mut dyn ExtractionSession, body: &str, step: usize) -> Vec<ArtifactEvent> {
    let mut events = Vec::new();
    for chunk in body.as_bytes().chunks(step) {
        events.extend(session.on_raw_chunk(chunk));
    }
    events.extend(session.on_completed(body.as_bytes(), StreamOutcome::Success));
    events
}

fn count(events: &[ArtifactEvent], phase: EventPhase) -> usize {
    events.iter().filter(|e| e.phase == phase).count()
}

#[test]
fn widget_streamed_in_two_chunks() {
    let registry = registry();
    let sink = MemorySink::new();
    let mut session = open(&registry, "<hypercard:widget:v1>", "turn-1:w0");

    let head = "<hypercard:widget:v1>\n```yaml\ntype: report\n";
    let events = session.on_raw_chunk(head.as_bytes());
    assert!(events.is_empty(), "no title yet, nothing to announce");

    let (_, rest) = STOCK_WIDGET.split_at("```yaml\ntype: report\n".len());
    let tail = format!("{rest}</hypercard:widget:v1>");
    let mut events = session.on_raw_chunk(tail.as_bytes());
    let full = format!("{head}{tail}");
    events.extend(session.on_completed(full.as_bytes(), StreamOutcome::Success));
    publish_events(&sink, &events);

    let published = sink.events();
    let phases: Vec<EventPhase> = published.iter().map(|e| e.phase).collect();
    assert_eq!(phases, [EventPhase::Start, EventPhase::Ready]);
    let (start, ready) = (published.first().unwrap(), published.get(1).unwrap());
    assert_eq!(start.title.as_deref(), Some("Stock Summary"));
    assert_eq!(ready.type_name(), "hypercard.widget.v1");
    assert_eq!(
        ready
            .data
            .as_ref()
            .and_then(|d| d.pointer("/artifact/data/rows")),
        Some(&serde_json::json!(3))
    );
    assert_eq!(count(&published, EventPhase::Error), 0);
}

#[test]
fn card_without_id_fails_once() {
    let registry = registry();
    let mut session = open(&registry, "<hypercard:card:v2>", "turn-2:c0");
    let body = "name: Reorder helper\ncard:\n  code: |\n    render(() => ui.text('hi'))\n";

    let events = stream(session.as_mut(), body, 7);

    assert_eq!(count(&events, EventPhase::Error), 1);
    assert_eq!(count(&events, EventPhase::Ready), 0);
    let error = events.iter().find(|e| e.phase == EventPhase::Error).unwrap();
    assert!(error.error.as_deref().unwrap().contains("card.id is required"));
    assert_eq!(error.type_name(), "hypercard.card.error");
}

#[test]
fn completion_policy_reports_missing_tags() {
    let policy = CompletionPolicy::new(true, true);
    let sink = MemorySink::new();
    let turn = TurnId::new("turn-3");

    policy.enforce(&turn, "I looked at your inventory, all good.", Some(&sink));
    let missing = sink.events();
    assert_eq!(missing.len(), 2);
    assert!(missing.iter().any(|e| e.kind == ArtifactKind::Widget && e.item_id.as_str() == "turn-3:widget"));
    assert!(missing.iter().any(|e| e.kind == ArtifactKind::Card && e.item_id.as_str() == "turn-3:card"));

    let text = format!(
        "{}{}\n{}{}",
        TagIdentity::for_kind(ArtifactKind::Widget).opening_tag(),
        TagIdentity::for_kind(ArtifactKind::Widget).closing_tag(),
        TagIdentity::for_kind(ArtifactKind::Card).opening_tag(),
        TagIdentity::for_kind(ArtifactKind::Card).closing_tag(),
    );
    let again = MemorySink::new();
    policy.enforce(&turn, &text, Some(&again));
    assert!(again.is_empty());
}

#[test]
fn start_precedes_everything_at_any_chunking() {
    let registry = registry();
    for step in [1, 2, 5, 13, STOCK_WIDGET.len()] {
        let mut session = open(&registry, "<hypercard:widget:v1>", "w");
        let events = stream(session.as_mut(), STOCK_WIDGET, step);

        assert_eq!(count(&events, EventPhase::Start), 1, "step {step}");
        assert_eq!(count(&events, EventPhase::Ready), 1, "step {step}");
        assert_eq!(events.first().map(|e| e.phase), Some(EventPhase::Start));
        assert_eq!(events.last().map(|e| e.phase), Some(EventPhase::Ready));
    }
}

#[test]
fn invalid_card_streams_start_then_single_error() {
    let registry = registry();
    let mut session = open(&registry, "<hypercard:card:v2>", "c");
    let body = "name: Low stock\ncard:\n  id: low stock\n  code: render()\n";

    let events = stream(session.as_mut(), body, 4);

    assert_eq!(events.first().map(|e| e.phase), Some(EventPhase::Start));
    assert_eq!(count(&events, EventPhase::Start), 1);
    assert_eq!(count(&events, EventPhase::Error), 1);
    assert_eq!(count(&events, EventPhase::Ready), 0);
    assert_eq!(events.last().map(|e| e.phase), Some(EventPhase::Error));
}

#[test]
fn suggestions_are_normalised_on_ready() {
    let registry = registry();
    let mut session = open(&registry, "<hypercard:suggestions:v1>", "s");
    let body = "suggestions:\n  - Show stock\n  - show STOCK\n  - ''\n  - '  Show stock  '\n  - Reorder gears\n";

    let events = stream(session.as_mut(), body, 9);

    let ready = events.iter().find(|e| e.phase == EventPhase::Ready).unwrap();
    assert_eq!(
        ready.suggestions.as_deref().unwrap(),
        ["Show stock", "Reorder gears"]
    );
    assert_eq!(ready.type_name(), "hypercard.suggestions.v1");
}

#[test]
fn empty_suggestions_produce_nothing() {
    let registry = registry();
    let mut session = open(&registry, "<hypercard:suggestions:v1>", "s");
    let events = stream(session.as_mut(), "- ''\n- '   '\n", 3);
    assert!(events.is_empty());
}

#[test]
fn upstream_failure_is_surfaced_verbatim() {
    let registry = registry();
    let mut session = open(&registry, "<hypercard:widget:v1>", "w");
    let _ = session.on_raw_chunk(b"type: report\ntitle: Half");
    let events = session.on_completed(b"", StreamOutcome::Failure("model stream reset".to_owned()));

    assert_eq!(events.len(), 1);
    assert_eq!(
        events.first().and_then(|e| e.error.as_deref()),
        Some("model stream reset")
    );
}
