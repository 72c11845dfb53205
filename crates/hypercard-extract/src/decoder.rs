//! Best-effort snapshot decoding of partially generated payloads.
//!
//! Artifact bodies arrive a few bytes at a time. The decoder accumulates
//! them and, when the configured cadence says so, attempts to parse what it
//! has so far. A failed attempt on partial content is expected and the
//! caller simply tries again with the next chunk.
//!
//! Bodies are written as YAML, usually wrapped in a markdown fence and
//! sometimes with the surrounding tag markers still attached:
//!
//! ~~~text
//! <hypercard:widget:v1>
//! ```yaml
//! type: report
//! title: Stock Summary
//! ```
//! </hypercard:widget:v1>
//! ~~~
//!
//! Fence and tag lines are stripped before parsing.

use std::marker::PhantomData;
use std::time::Instant;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::DecoderConfig;
use crate::error::DecodeError;

/// The decoder contract sessions are written against.
pub trait SnapshotDecoder: Send {
    /// The structured snapshot type.
    type Snapshot;

    /// Append a chunk and, if an attempt is due, decode the bytes so far.
    ///
    /// Returns `Ok(None)` when no attempt was due, the attempt ran past its
    /// timeout, or nothing parseable has arrived yet.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Parse`] or [`DecodeError::Utf8`] when the
    /// partial content does not decode (transient), and
    /// [`DecodeError::TooLarge`] when the body outgrows its limit.
    fn feed(&mut self, chunk: &[u8]) -> Result<Option<Self::Snapshot>, DecodeError>;

    /// Strictly decode a complete body. Does not read or modify the feed
    /// buffer, so equal input always yields an equal snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] when the body does not decode.
    fn finalize(&self, full: &[u8]) -> Result<Self::Snapshot, DecodeError>;

    /// Number of bytes accumulated by [`feed`](Self::feed).
    fn buffered_len(&self) -> usize;
}

/// YAML implementation of [`SnapshotDecoder`].
#[derive(Debug)]
pub struct YamlSnapshotDecoder<T> {
    config: DecoderConfig,
    buffer: Vec<u8>,
    since_attempt: usize,
    _snapshot: PhantomData<fn() -> T>,
}

impl<T> YamlSnapshotDecoder<T>
where
    T: DeserializeOwned + Default,
{
    /// Create a decoder with the given cadence and limits.
    pub const fn new(config: DecoderConfig) -> Self {
        Self {
            config,
            buffer: Vec::new(),
            since_attempt: 0,
            _snapshot: PhantomData,
        }
    }

    fn attempt_due(&self, chunk: &[u8]) -> bool {
        let by_bytes = self.config.snapshot_every_n_bytes > 0
            && self.since_attempt >= self.config.snapshot_every_n_bytes;
        let by_newline = self.config.snapshot_on_newline && chunk.contains(&b'\n');
        by_bytes || by_newline
    }

    /// The bytes a partial attempt may look at. In newline mode a trailing
    /// unterminated line is held back so a half-written scalar never shows
    /// up in a snapshot.
    fn attempt_window(&self) -> &[u8] {
        if !self.config.snapshot_on_newline {
            return &self.buffer;
        }
        self.buffer
            .iter()
            .rposition(|b| *b == b'\n')
            .and_then(|pos| self.buffer.get(..=pos))
            .unwrap_or_default()
    }
}

impl<T> SnapshotDecoder for YamlSnapshotDecoder<T>
where
    T: DeserializeOwned + Default,
{
    type Snapshot = T;

    fn feed(&mut self, chunk: &[u8]) -> Result<Option<T>, DecodeError> {
        let received = self.buffer.len().saturating_add(chunk.len());
        if received > self.config.max_total_bytes {
            return Err(DecodeError::TooLarge {
                limit: self.config.max_total_bytes,
                received,
            });
        }
        self.buffer.extend_from_slice(chunk);
        self.since_attempt = self.since_attempt.saturating_add(chunk.len());

        if !self.attempt_due(chunk) {
            return Ok(None);
        }
        self.since_attempt = 0;

        let started = Instant::now();
        let parsed = decode_body::<T>(self.attempt_window());
        if let Some(limit) = self.config.parse_attempt_timeout() {
            let elapsed = started.elapsed();
            if elapsed > limit {
                debug!(
                    elapsed_ms = elapsed.as_millis(),
                    limit_ms = limit.as_millis(),
                    buffered = self.buffer.len(),
                    "snapshot attempt exceeded timeout, discarding"
                );
                return Ok(None);
            }
        }
        parsed
    }

    fn finalize(&self, full: &[u8]) -> Result<T, DecodeError> {
        if full.len() > self.config.max_total_bytes {
            return Err(DecodeError::TooLarge {
                limit: self.config.max_total_bytes,
                received: full.len(),
            });
        }
        Ok(decode_body::<T>(full)?.unwrap_or_default())
    }

    fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

/// Decode a body, returning `None` if nothing but wrapping is present.
fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<Option<T>, DecodeError> {
    let text = std::str::from_utf8(bytes)?;
    let body = strip_wrapping(text);
    if body.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_yml::from_str(&body)?))
}

/// Remove markdown fence lines and artifact tag lines.
fn strip_wrapping(text: &str) -> String {
    let mut body = String::with_capacity(text.len());
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") || is_tag_marker(trimmed) {
            continue;
        }
        body.push_str(line);
        body.push('\n');
    }
    body
}

/// Whether a trimmed line is an opening or closing `<ns:type:ver>` marker.
fn is_tag_marker(line: &str) -> bool {
    let Some(inner) = line.strip_prefix('<').and_then(|l| l.strip_suffix('>')) else {
        return false;
    };
    let inner = inner.strip_prefix('/').unwrap_or(inner);
    inner.split(':').count() == 3
        && inner
            .split(':')
            .all(|part| !part.is_empty() && !part.contains(char::is_whitespace))
}
