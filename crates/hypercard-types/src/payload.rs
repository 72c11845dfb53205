//! Payload snapshots decoded from artifact tag bodies.
//!
//! Generated YAML is sloppy: a half-typed `title:` decodes to null and a
//! numeric id decodes to a number. Scalar fields therefore go through
//! [`lenient_string`] so that a snapshot always decodes and the completeness
//! rules decide what is missing.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Reference to the data artifact a widget or card renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactRef {
    /// Artifact identifier.
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    /// Schema-free artifact data.
    pub data: Value,
}

/// Snapshot of a `<hypercard:widget:v1>` body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetPayload {
    /// Widget renderer type (`report`, `table`, ...).
    #[serde(rename = "type", deserialize_with = "lenient_string")]
    pub widget_type: String,
    /// Human-readable title.
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    /// The data the widget renders.
    #[serde(deserialize_with = "null_as_default")]
    pub artifact: ArtifactRef,
    /// Actions offered by the widget, passed through untouched.
    #[serde(deserialize_with = "null_as_default")]
    pub actions: Vec<Value>,
}

/// Source of a runtime card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardSource {
    /// Identifier-shaped card id, used as the card template name.
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    /// Card code.
    #[serde(deserialize_with = "lenient_string")]
    pub code: String,
}

/// Snapshot of a `<hypercard:card:v2>` body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardPayload {
    /// Display name of the card.
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    /// Title, used when `name` is empty.
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    /// The data the card renders.
    #[serde(deserialize_with = "null_as_default")]
    pub artifact: ArtifactRef,
    /// The card source.
    #[serde(deserialize_with = "null_as_default")]
    pub card: CardSource,
}

impl CardPayload {
    /// The display name: `name`, falling back to `title`, trimmed.
    pub fn display_name(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() { self.title.trim() } else { name }
    }
}

/// Snapshot of a `<hypercard:suggestions:v1>` body.
///
/// Accepts either a bare sequence or a mapping with a `suggestions` key.
/// Serializes as a bare list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SuggestionsPayload {
    /// Suggestions in generation order, not yet normalised.
    pub items: Vec<String>,
}

impl<'de> Deserialize<'de> for SuggestionsPayload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Shape {
            List(Vec<Value>),
            Wrapped {
                #[serde(default)]
                suggestions: Vec<Value>,
            },
            Empty(()),
        }

        let values = match Shape::deserialize(deserializer)? {
            Shape::List(values) | Shape::Wrapped { suggestions: values } => values,
            Shape::Empty(()) => Vec::new(),
        };
        Ok(Self {
            items: values.iter().map(scalar_text).collect(),
        })
    }
}

/// Deserialize any scalar (or null) into a string.
///
/// Null and non-scalar values become the empty string.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(scalar_text).unwrap_or_default())
}

/// Deserialize a value, treating an explicit null (`artifact:` with no
/// body) as the type's default.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}
