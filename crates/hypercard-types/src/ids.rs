//! Opaque string identifiers.
//!
//! Item ids come from whoever slices tag occurrences out of the stream, so
//! unlike database keys they are arbitrary strings rather than UUIDs. The
//! newtypes still keep the three namespaces from being mixed up at compile
//! time.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Generates a newtype wrapper around [`String`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(String);

        impl $name {
            /// Wrap an identifier string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the identifier is the empty string.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            /// Build a derived key of the form `{id}:{suffix}`.
            pub fn scoped(&self, suffix: &str) -> String {
                format!("{}:{suffix}", self.0)
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }
    };
}

define_id! {
    /// Identifier of one artifact tag occurrence in the generated stream.
    ItemId
}

define_id! {
    /// Identifier of a single assistant turn (one generation).
    TurnId
}

define_id! {
    /// Identifier of a conversation; the unit of timeline versioning.
    ConversationId
}
