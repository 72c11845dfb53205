//! Artifact kinds and lifecycle phases.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// The three kinds of artifact that can appear inline in generated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ArtifactKind {
    /// An interactive widget (report, table, chart...).
    Widget,
    /// A runtime card carrying executable card code.
    Card,
    /// A list of follow-up prompt suggestions.
    Suggestions,
}

impl ArtifactKind {
    /// All kinds, in registration order.
    pub const ALL: [Self; 3] = [Self::Widget, Self::Card, Self::Suggestions];

    /// The `type` segment of the artifact's tag, e.g. `widget` in
    /// `<hypercard:widget:v1>`.
    pub const fn tag_type(self) -> &'static str {
        match self {
            Self::Widget => "widget",
            Self::Card => "card",
            Self::Suggestions => "suggestions",
        }
    }

    /// The tag version this kind is produced under. Ready events are named
    /// after it.
    pub const fn tag_version(self) -> &'static str {
        match self {
            Self::Widget | Self::Suggestions => "v1",
            Self::Card => "v2",
        }
    }
}

impl core::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.tag_type())
    }
}

/// The lifecycle phase an event reports for one occurrence.
///
/// `Ready` and `Error` are terminal and mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EventPhase {
    /// Enough of the payload is known to show something.
    Start,
    /// A fuller snapshot of an already-started payload.
    Update,
    /// The payload decoded and validated.
    Ready,
    /// Generation or validation failed.
    Error,
}

impl EventPhase {
    /// All phases, in lifecycle order.
    pub const ALL: [Self; 4] = [Self::Start, Self::Update, Self::Ready, Self::Error];

    /// Whether no further events may follow this one.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Error)
    }

    /// Lower-case phase name as it appears in timeline props.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Update => "update",
            Self::Ready => "ready",
            Self::Error => "error",
        }
    }
}
