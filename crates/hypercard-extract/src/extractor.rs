//! Tag extractors and the registry that maps tag triples to them.
//!
//! An extractor is a stateless factory: it names the
//! `<namespace:type:version>` tag it handles and opens a fresh session for
//! each occurrence of that tag. The boundary scanner that finds occurrences
//! in the raw stream lives outside this crate; it asks the registry which
//! extractor a tag belongs to and drives the returned session.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::time::Duration;

use hypercard_events::NAMESPACE;
use hypercard_types::{ArtifactKind, ItemId};
use tracing::debug;

use crate::config::{DecoderConfig, ExtractionConfig};
use crate::decoder::YamlSnapshotDecoder;
use crate::error::ExtractError;
use crate::kinds::{ArtifactSpec, CardSpec, SuggestionsSpec, WidgetSpec};
use crate::session::{ExtractionSession, GatedSession};

/// The `(namespace, type, version)` triple a tag is written with.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TagIdentity {
    /// Tag namespace, e.g. `hypercard`.
    pub namespace: String,
    /// Tag type, e.g. `widget`.
    pub tag_type: String,
    /// Tag version, e.g. `v1`.
    pub version: String,
}

/// Which side of an occurrence a tag marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagEdge {
    /// `<ns:type:ver>`
    Open,
    /// `</ns:type:ver>`
    Close,
}

impl TagIdentity {
    /// Build an identity from its parts.
    pub fn new(namespace: &str, tag_type: &str, version: &str) -> Self {
        Self {
            namespace: namespace.to_owned(),
            tag_type: tag_type.to_owned(),
            version: version.to_owned(),
        }
    }

    /// The built-in identity for an artifact kind.
    pub fn for_kind(kind: ArtifactKind) -> Self {
        Self::new(NAMESPACE, kind.tag_type(), kind.tag_version())
    }

    /// The literal opening tag.
    pub fn opening_tag(&self) -> String {
        format!("<{self}>")
    }

    /// The literal closing tag.
    pub fn closing_tag(&self) -> String {
        format!("</{self}>")
    }

    /// Parse a literal tag such as `<hypercard:card:v2>` or
    /// `</hypercard:card:v2>`.
    pub fn parse_tag(tag: &str) -> Option<(Self, TagEdge)> {
        let inner = tag.trim().strip_prefix('<')?.strip_suffix('>')?;
        let (edge, inner) = match inner.strip_prefix('/') {
            Some(rest) => (TagEdge::Close, rest),
            None => (TagEdge::Open, inner),
        };
        let mut parts = inner.split(':');
        let (namespace, tag_type, version) = (parts.next()?, parts.next()?, parts.next()?);
        let valid = |part: &str| !part.is_empty() && !part.contains(char::is_whitespace);
        if parts.next().is_some() || !(valid(namespace) && valid(tag_type) && valid(version)) {
            return None;
        }
        Some((Self::new(namespace, tag_type, version), edge))
    }
}

impl core::fmt::Display for TagIdentity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.tag_type, self.version)
    }
}

/// A stateless factory for per-occurrence sessions.
pub trait TagExtractor: Send + Sync {
    /// The tag this extractor handles.
    fn identity(&self) -> &TagIdentity;

    /// The artifact kind its sessions produce.
    fn kind(&self) -> ArtifactKind;

    /// Open a session for a new occurrence.
    fn open_session(&self, item_id: ItemId) -> Box<dyn ExtractionSession>;
}

/// Extractor for a built-in kind, decoding YAML bodies.
#[derive(Debug)]
pub struct SpecExtractor<S> {
    identity: TagIdentity,
    decoder: DecoderConfig,
    idle_timeout: Option<Duration>,
    _spec: PhantomData<fn() -> S>,
}

impl<S: ArtifactSpec> SpecExtractor<S> {
    /// Create an extractor for the kind described by `S`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::InvalidDecoderConfig`] if the decoder config
    /// cannot be run.
    pub fn new(decoder: DecoderConfig, idle_timeout: Option<Duration>) -> Result<Self, ExtractError> {
        decoder.validate(S::KIND.tag_type())?;
        Ok(Self {
            identity: TagIdentity::for_kind(S::KIND),
            decoder,
            idle_timeout,
            _spec: PhantomData,
        })
    }
}

impl<S: ArtifactSpec> TagExtractor for SpecExtractor<S> {
    fn identity(&self) -> &TagIdentity {
        &self.identity
    }

    fn kind(&self) -> ArtifactKind {
        S::KIND
    }

    fn open_session(&self, item_id: ItemId) -> Box<dyn ExtractionSession> {
        debug!(item_id = %item_id, tag = %self.identity, "opening extraction session");
        Box::new(GatedSession::<S, _>::new(
            item_id,
            YamlSnapshotDecoder::<S::Payload>::new(self.decoder.clone()),
            self.idle_timeout,
        ))
    }
}

/// Widget extractor (`hypercard:widget:v1`).
pub type WidgetExtractor = SpecExtractor<WidgetSpec>;
/// Runtime-card extractor (`hypercard:card:v2`).
pub type CardExtractor = SpecExtractor<CardSpec>;
/// Suggestions extractor (`hypercard:suggestions:v1`).
pub type SuggestionsExtractor = SpecExtractor<SuggestionsSpec>;

/// Extractors keyed by tag identity.
#[derive(Default)]
pub struct ExtractorRegistry {
    extractors: BTreeMap<TagIdentity, Box<dyn TagExtractor>>,
}

impl core::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.extractors.keys()).finish()
    }
}

impl ExtractorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the widget, card and suggestions extractors.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::InvalidDecoderConfig`] if any decoder config
    /// is unusable.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        let idle = config.idle_timeout();
        let mut registry = Self::new();
        registry.register(Box::new(WidgetExtractor::new(config.widget.clone(), idle)?))?;
        registry.register(Box::new(CardExtractor::new(config.card.clone(), idle)?))?;
        registry.register(Box::new(SuggestionsExtractor::new(
            config.suggestions.clone(),
            idle,
        )?))?;
        Ok(registry)
    }

    /// Add an extractor.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::DuplicateExtractor`] if its identity is taken.
    pub fn register(&mut self, extractor: Box<dyn TagExtractor>) -> Result<(), ExtractError> {
        let identity = extractor.identity().clone();
        if self.extractors.contains_key(&identity) {
            return Err(ExtractError::DuplicateExtractor(identity.to_string()));
        }
        self.extractors.insert(identity, extractor);
        Ok(())
    }

    /// Find the extractor for a tag identity.
    pub fn find(&self, identity: &TagIdentity) -> Option<&dyn TagExtractor> {
        self.extractors.get(identity).map(AsRef::as_ref)
    }

    /// Match a literal tag against the registered extractors.
    pub fn match_tag(&self, tag: &str) -> Option<(&dyn TagExtractor, TagEdge)> {
        let (identity, edge) = TagIdentity::parse_tag(tag)?;
        self.find(&identity).map(|extractor| (extractor, edge))
    }

    /// Open a session for an occurrence of the given tag.
    pub fn open(&self, identity: &TagIdentity, item_id: ItemId) -> Option<Box<dyn ExtractionSession>> {
        self.find(identity).map(|extractor| extractor.open_session(item_id))
    }

    /// Registered identities in order.
    pub fn identities(&self) -> impl Iterator<Item = &TagIdentity> {
        self.extractors.keys()
    }

    /// Number of registered extractors.
    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    /// Whether no extractor is registered.
    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}
