//! Integration tests for timeline projection.
//!
//! Frames are built the way an extraction session would publish them and
//! applied through a [`TimelineProjector`] backed by the in-memory store.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use hypercard_events::{ArtifactEvent, EventRegistry, SemFrame};
use hypercard_timeline::{InMemoryTimelineStore, SUGGESTIONS_ENTITY_ID, TimelineProjector};
use hypercard_types::{ArtifactKind, ConversationId, EntityKind, EventPhase, ItemId};
use serde_json::json;

fn projector() -> TimelineProjector<InMemoryTimelineStore> {
    TimelineProjector::new(
        Arc::new(EventRegistry::hypercard()),
        Arc::new(InMemoryTimelineStore::new()),
    )
}

fn suggestions(phase: EventPhase, item: &str, items: &[&str]) -> ArtifactEvent {
    ArtifactEvent::new(ArtifactKind::Suggestions, phase, ItemId::new(item))
        .with_suggestions(items.iter().map(|s| (*s).to_owned()).collect())
}

fn widget_lifecycle(item: &str) -> Vec<ArtifactEvent> {
    let id = ItemId::new(item);
    vec![
        ArtifactEvent::new(ArtifactKind::Widget, EventPhase::Start, id.clone())
            .with_title("Stock Summary")
            .with_widget_type("report"),
        ArtifactEvent::new(ArtifactKind::Widget, EventPhase::Update, id.clone())
            .with_title("Stock Summary")
            .with_widget_type("report")
            .with_data(json!({"title": "Stock Summary"})),
        ArtifactEvent::new(ArtifactKind::Widget, EventPhase::Ready, id)
            .with_title("Stock Summary")
            .with_widget_type("report")
            .with_data(json!({"artifact": {"id": "inv-report", "data": {"rows": 3}}})),
    ]
}

#[tokio::test]
async fn suggestions_collapse_onto_one_entity() {
    let projector = projector();
    let conv = ConversationId::new("conv-d");
    let frames = [
        suggestions(EventPhase::Start, "m1:suggestions", &["Show stock", "Reorder gears"]),
        suggestions(EventPhase::Update, "m1:suggestions", &["Show stock"]),
        suggestions(EventPhase::Ready, "m1:suggestions", &["Export CSV", "Email supplier"]),
    ];
    for event in &frames {
        projector.apply_event(&conv, event).await.unwrap();
    }

    let snapshot = projector.snapshot(&conv, 0, 0).await.unwrap();
    let entities: Vec<_> = snapshot
        .entities
        .iter()
        .filter(|v| v.entity.kind == EntityKind::Suggestions)
        .collect();
    assert_eq!(entities.len(), 1);

    let entity = snapshot.entity(SUGGESTIONS_ENTITY_ID).unwrap();
    assert_eq!(entity.props["items"], json!(["Export CSV", "Email supplier"]));
    assert_eq!(entity.props["source"], json!("assistant"));
    assert_eq!(snapshot.version, 3);
}

#[tokio::test]
async fn later_turn_replaces_suggestions() {
    let projector = projector();
    let conv = ConversationId::new("conv-turns");
    projector
        .apply_event(&conv, &suggestions(EventPhase::Ready, "t1:s", &["A", "B"]))
        .await
        .unwrap();
    projector
        .apply_event(&conv, &suggestions(EventPhase::Ready, "t2:s", &["C"]))
        .await
        .unwrap();
    projector
        .apply_event(&conv, &suggestions(EventPhase::Error, "t3:s", &[]).with_error("boom"))
        .await
        .unwrap();

    let snapshot = projector.snapshot(&conv, 0, 0).await.unwrap();
    let entity = snapshot.entity(SUGGESTIONS_ENTITY_ID).unwrap();
    assert_eq!(entity.props["items"], json!(["C"]));
    assert_eq!(snapshot.version, 2);
}

#[tokio::test]
async fn version_tracks_applied_frames() {
    let projector = projector();
    let conv = ConversationId::new("conv-n");
    let mut seqs = Vec::new();
    for item in ["m1", "m2"] {
        for event in widget_lifecycle(item) {
            seqs.push(projector.apply_event(&conv, &event).await.unwrap().unwrap());
        }
    }
    assert_eq!(seqs, [1, 2, 3, 4, 5, 6]);

    let snapshot = projector.snapshot(&conv, 0, 0).await.unwrap();
    assert_eq!(snapshot.version, 6);
    let ids: Vec<&str> = snapshot.entities.iter().map(|v| v.entity.id.as_str()).collect();
    assert_eq!(
        ids,
        ["m1:status", "m1:result", "m1:widget", "m2:status", "m2:result", "m2:widget"]
    );

    let since = projector.snapshot(&conv, 3, 0).await.unwrap();
    assert!(since.entities.iter().all(|v| v.seq > 3));
    assert_eq!(since.version, 6);
}

#[tokio::test]
async fn ready_widget_projects_result_entities() {
    let projector = projector();
    let conv = ConversationId::new("conv-ready");
    for event in widget_lifecycle("m1") {
        projector.apply_event(&conv, &event).await.unwrap();
    }

    let snapshot = projector.snapshot(&conv, 0, 0).await.unwrap();
    let widget = snapshot.entity("m1:widget").unwrap();
    assert_eq!(widget.kind, EntityKind::HypercardWidget);
    assert_eq!(widget.props["title"], json!("Stock Summary"));
    assert_eq!(widget.props["widgetType"], json!("report"));
    assert_eq!(widget.props["data"]["artifact"]["id"], json!("inv-report"));

    let result = snapshot.entity("m1:result").unwrap();
    assert_eq!(result.kind, EntityKind::ToolResult);
    assert_eq!(result.props["resultKind"], json!("hypercard.widget.v1"));
    assert_eq!(result.props["result"]["artifact"]["data"]["rows"], json!(3));

    let status = snapshot.entity("m1:status").unwrap();
    assert_eq!(status.props["text"], json!("Building widget: Stock Summary"));
}

#[tokio::test]
async fn card_error_becomes_error_status() {
    let projector = projector();
    let conv = ConversationId::new("conv-err");
    let item = ItemId::new("m1");
    let start = ArtifactEvent::new(ArtifactKind::Card, EventPhase::Start, item.clone())
        .with_name("Low stock");
    let failed = ArtifactEvent::failure(ArtifactKind::Card, item, "runtime card.id is required");
    projector.apply_event(&conv, &start).await.unwrap();
    projector.apply_event(&conv, &failed).await.unwrap();

    let snapshot = projector.snapshot(&conv, 0, 0).await.unwrap();
    let status = snapshot.entity("m1:status").unwrap();
    assert_eq!(status.props["text"], json!("runtime card.id is required"));
    assert_eq!(status.props["level"], json!("error"));
    assert!(snapshot.entity("m1:card").is_none());
}

#[tokio::test]
async fn conversations_are_sequenced_independently() {
    let projector = Arc::new(projector());
    let tasks: Vec<_> = (0..4)
        .map(|n| {
            let projector = Arc::clone(&projector);
            tokio::spawn(async move {
                let conv = ConversationId::new(format!("conv-{n}"));
                for item in ["a", "b", "c"] {
                    for event in widget_lifecycle(item) {
                        projector.apply_event(&conv, &event).await.unwrap();
                    }
                }
                conv
            })
        })
        .collect();

    for conv in futures::future::join_all(tasks).await {
        let conv = conv.unwrap();
        let snapshot = projector.snapshot(&conv, 0, 0).await.unwrap();
        assert_eq!(snapshot.version, 9);
        assert_eq!(snapshot.entities.len(), 9);
    }
}

#[tokio::test]
async fn malformed_frames_are_errors() {
    let projector = projector();
    let conv = ConversationId::new("conv-bad");
    let frame = SemFrame::new("hypercard.widget.start", "m1", json!("not an object"));
    assert!(projector.apply(&conv, &frame).await.is_err());
    assert_eq!(projector.snapshot(&conv, 0, 0).await.unwrap().version, 0);
}
