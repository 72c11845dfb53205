//! Error types for extraction.
//!
//! None of these surface from a session: sessions turn every in-scope
//! failure into an error event. They are returned by construction-time
//! checks, configuration loading, and the decoder contract.

/// Errors raised while building extractors and sessions.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// A decoder configuration is unusable.
    #[error("invalid decoder config for {kind}: {reason}")]
    InvalidDecoderConfig {
        /// The artifact kind the config belongs to.
        kind: String,
        /// Why the config was rejected.
        reason: String,
    },

    /// Two extractors declared the same tag identity.
    #[error("extractor already registered for {0}")]
    DuplicateExtractor(String),
}

/// Errors returned by a snapshot decoder.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The accumulated bytes did not parse.
    #[error("payload parse error: {0}")]
    Parse(#[from] serde_yml::Error),

    /// The body is not valid UTF-8.
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// The body grew past the configured byte limit.
    #[error("payload exceeded {limit} bytes ({received} received)")]
    TooLarge {
        /// Configured `max_total_bytes`.
        limit: usize,
        /// Bytes received so far.
        received: usize,
    },
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override held an unparseable value.
    #[error("invalid value for {name}: {reason}")]
    InvalidOverride {
        /// Environment variable name.
        name: String,
        /// Parse failure description.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}
