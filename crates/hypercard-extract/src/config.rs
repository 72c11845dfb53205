//! Configuration loading and typed config structures.
//!
//! Configuration is an optional YAML document:
//!
//! ```yaml
//! extraction:
//!   idle_timeout_ms: 120000
//!   widget:
//!     snapshot_every_n_bytes: 512
//!     snapshot_on_newline: true
//!     parse_attempt_timeout_ms: 25
//!     max_total_bytes: 262144
//! policy:
//!   require_widget: true
//!   require_card: false
//! ```
//!
//! Every section and field has a default, so an empty document is valid.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, ExtractError};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HypercardConfig {
    /// Decoder and session settings.
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Completion-policy settings.
    #[serde(default)]
    pub policy: PolicyConfig,
}

impl HypercardConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override file values:
    /// - `HYPERCARD_REQUIRE_WIDGET` overrides `policy.require_widget`
    /// - `HYPERCARD_REQUIRE_CARD` overrides `policy.require_card`
    /// - `HYPERCARD_IDLE_TIMEOUT_MS` overrides `extraction.idle_timeout_ms`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::InvalidOverride`] for an unparseable override.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No overrides are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] for an unparseable value.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] for an unparseable value.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("HYPERCARD_REQUIRE_WIDGET") {
            self.policy.require_widget = parse_override("HYPERCARD_REQUIRE_WIDGET", &val)?;
        }
        if let Some(val) = lookup("HYPERCARD_REQUIRE_CARD") {
            self.policy.require_card = parse_override("HYPERCARD_REQUIRE_CARD", &val)?;
        }
        if let Some(val) = lookup("HYPERCARD_IDLE_TIMEOUT_MS") {
            self.extraction.idle_timeout_ms = parse_override("HYPERCARD_IDLE_TIMEOUT_MS", &val)?;
        }
        Ok(())
    }
}

fn parse_override<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidOverride {
            name: name.to_owned(),
            reason: format!("{value:?}: {e}"),
        })
}

/// Per-kind decoder settings plus the session idle timeout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Decoder settings for widget bodies.
    pub widget: DecoderConfig,
    /// Decoder settings for runtime-card bodies.
    pub card: DecoderConfig,
    /// Decoder settings for suggestion lists.
    pub suggestions: DecoderConfig,
    /// Milliseconds without a chunk before an unfinished session is forced
    /// into an error. Zero disables the timeout.
    pub idle_timeout_ms: u64,
}

impl ExtractionConfig {
    /// The idle timeout, or `None` when disabled.
    pub const fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.idle_timeout_ms))
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            widget: DecoderConfig::default(),
            card: DecoderConfig::default(),
            suggestions: DecoderConfig::suggestions(),
            idle_timeout_ms: 120_000,
        }
    }
}

/// Snapshot cadence and limits for one decoder.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Attempt a snapshot once this many bytes arrived since the last
    /// attempt. Zero disables byte-count snapshots.
    pub snapshot_every_n_bytes: usize,
    /// Attempt a snapshot whenever a chunk contains a newline.
    pub snapshot_on_newline: bool,
    /// Snapshot attempts that take longer than this are discarded. Zero
    /// disables the check.
    pub parse_attempt_timeout_ms: u64,
    /// Hard limit on the accumulated body size.
    pub max_total_bytes: usize,
}

impl DecoderConfig {
    /// Defaults for the short suggestion lists.
    pub const fn suggestions() -> Self {
        Self {
            snapshot_every_n_bytes: 128,
            snapshot_on_newline: true,
            parse_attempt_timeout_ms: 15,
            max_total_bytes: 16 * 1024,
        }
    }

    /// The per-attempt timeout, or `None` when disabled.
    pub const fn parse_attempt_timeout(&self) -> Option<Duration> {
        if self.parse_attempt_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.parse_attempt_timeout_ms))
        }
    }

    /// Reject configs a decoder cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::InvalidDecoderConfig`] when `max_total_bytes`
    /// is zero, or when neither snapshot trigger is enabled.
    pub fn validate(&self, kind: &str) -> Result<(), ExtractError> {
        let reason = if self.max_total_bytes == 0 {
            Some("max_total_bytes must be greater than zero")
        } else if self.snapshot_every_n_bytes == 0 && !self.snapshot_on_newline {
            Some("either snapshot_every_n_bytes or snapshot_on_newline must be enabled")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(ExtractError::InvalidDecoderConfig {
                kind: kind.to_owned(),
                reason: reason.to_owned(),
            }),
            None => Ok(()),
        }
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            snapshot_every_n_bytes: 512,
            snapshot_on_newline: true,
            parse_attempt_timeout_ms: 25,
            max_total_bytes: 256 * 1024,
        }
    }
}

/// Which artifact tags a turn must contain.
///
/// When both flags are false the policy treats both as required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Require a `<hypercard:widget:v1>` block.
    pub require_widget: bool,
    /// Require a `<hypercard:card:v2>` block.
    pub require_card: bool,
}
