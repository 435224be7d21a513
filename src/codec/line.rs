//! Newline-delimited JSON codec.
//!
//! Each logical message is serialized with `serde_json` and terminated by a
//! single `\n`. Incoming data is reassembled across chunks: only complete
//! lines are decoded, an unterminated tail waits for the next chunk.
//!
//! # Wire Format
//!
//! ```text
//! {"action":"subscribe","data":["a","b"]}\n{"action":"message","data":[1]}\n
//! └──────────────── frame ───────────────┘ └──────────── frame ──────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Frame delimiter.
pub const DELIMITER: char = '\n';

/// Largest unterminated fragment kept while waiting for its delimiter.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

// ============================================================================
// LineCodec
// ============================================================================

/// Stateful line codec for messages of type `M`.
///
/// Encoding is stateless; decoding buffers the partial final fragment of
/// each chunk.
pub struct LineCodec<M> {
    buffer: String,
    _message: PhantomData<fn() -> M>,
}

impl<M> Default for LineCodec<M> {
    fn default() -> Self {
        Self {
            buffer: String::new(),
            _message: PhantomData,
        }
    }
}

impl<M> fmt::Debug for LineCodec<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineCodec")
            .field("buffered", &self.buffer.len())
            .finish()
    }
}

impl<M> LineCodec<M> {
    /// Creates a codec with an empty buffer.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards any buffered partial frame.
    #[inline]
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Returns the length of the buffered partial frame.
    #[inline]
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

impl<M: Serialize> LineCodec<M> {
    /// Serializes a message into one delimited frame.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if serialization fails
    /// - [`Error::EmbeddedDelimiter`] if the body would contain the delimiter
    pub fn encode(message: &M) -> Result<String> {
        let mut frame = serde_json::to_string(message)?;

        if frame.contains(DELIMITER) {
            return Err(Error::EmbeddedDelimiter);
        }

        frame.push(DELIMITER);
        Ok(frame)
    }
}

impl<M: DeserializeOwned> LineCodec<M> {
    /// Parses a single frame body (without delimiter).
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedFrame`] if the body is not a valid `M`.
    pub fn decode_frame(line: &str) -> Result<M> {
        serde_json::from_str(line).map_err(|e| Error::malformed_frame(e.to_string()))
    }

    /// Feeds a raw chunk and returns every message it completes, in order.
    ///
    /// Blank segments are skipped. A segment that fails to parse is dropped
    /// with a warning without affecting the others.
    pub fn decode(&mut self, chunk: &str) -> Vec<M> {
        self.buffer.push_str(chunk);

        let Some(end) = self.buffer.rfind(DELIMITER) else {
            self.enforce_limit();
            return Vec::new();
        };

        let tail = self.buffer.split_off(end + DELIMITER.len_utf8());
        let complete = std::mem::replace(&mut self.buffer, tail);
        self.enforce_limit();

        complete
            .split(DELIMITER)
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| match Self::decode_frame(line) {
                Ok(message) => Some(message),
                Err(e) => {
                    warn!(error = %e, frame = line, "Dropping malformed frame");
                    None
                }
            })
            .collect()
    }
}

impl<M> LineCodec<M> {
    fn enforce_limit(&mut self) {
        if self.buffer.len() > MAX_FRAME_LEN {
            warn!(
                len = self.buffer.len(),
                max = MAX_FRAME_LEN,
                "Dropping oversized unterminated frame"
            );
            self.buffer.clear();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
