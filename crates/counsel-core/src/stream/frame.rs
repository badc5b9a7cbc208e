//! Frame reassembly for the deliberation stream.
//!
//! The transport delivers bytes with no alignment to protocol frames. A frame
//! is the text between two `\n\n` delimiters. `FrameBuffer` accumulates decoded
//! text across reads and hands out complete frames one at a time, holding back
//! the trailing incomplete segment until the next read completes it.

use crate::error::{CounselError, Result};

/// Frame delimiter of the wire protocol.
pub const FRAME_DELIMITER: &str = "\n\n";

/// Default cap for a pending (incomplete) frame: 1 MiB.
pub const DEFAULT_MAX_BUFFER_BYTES: usize = 1024 * 1024;

/// Incremental frame splitter with a hard cap on the pending segment.
#[derive(Debug)]
pub struct FrameBuffer {
    buffer: String,
    /// Bytes of an incomplete UTF-8 sequence carried over from the last read.
    partial_utf8: Vec<u8>,
    max_pending: usize,
}

impl FrameBuffer {
    /// Creates a buffer with the default 1 MiB cap.
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_BUFFER_BYTES)
    }

    /// Creates a buffer that fails once a pending frame exceeds `max_pending` bytes.
    pub fn with_limit(max_pending: usize) -> Self {
        Self {
            buffer: String::new(),
            partial_utf8: Vec::new(),
            max_pending,
        }
    }

    /// Appends a raw chunk from the transport.
    ///
    /// Multibyte characters split across reads are reassembled; invalid
    /// sequences are replaced with U+FFFD.
    ///
    /// # Errors
    ///
    /// Returns `FrameTooLarge` if the text after the last delimiter grows past
    /// the configured cap.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> Result<()> {
        let mut bytes = std::mem::take(&mut self.partial_utf8);
        bytes.extend_from_slice(chunk);

        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    self.buffer.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    self.buffer
                        .push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match err.error_len() {
                        Some(invalid) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[invalid..];
                        }
                        None => {
                            // Incomplete sequence at the end: wait for the next read.
                            self.partial_utf8 = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        self.check_limit()
    }

    /// Appends already-decoded text.
    pub fn push_str(&mut self, chunk: &str) -> Result<()> {
        self.buffer.push_str(chunk);
        self.check_limit()
    }

    /// Removes and returns the next complete frame, if any.
    pub fn next_frame(&mut self) -> Option<String> {
        let end = self.buffer.find(FRAME_DELIMITER)?;
        let frame = self.buffer[..end].to_string();
        self.buffer.drain(..end + FRAME_DELIMITER.len());
        Some(frame)
    }

    /// Returns the text held back for the next read.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Consumes the buffer at end of stream, returning the trailing segment
    /// if it holds anything besides whitespace.
    pub fn finish(mut self) -> Option<String> {
        if !self.partial_utf8.is_empty() {
            self.buffer.push(char::REPLACEMENT_CHARACTER);
        }
        if self.buffer.trim().is_empty() {
            None
        } else {
            Some(self.buffer)
        }
    }

    fn check_limit(&self) -> Result<()> {
        let pending = match self.buffer.rfind(FRAME_DELIMITER) {
            Some(index) => self.buffer.len() - index - FRAME_DELIMITER.len(),
            None => self.buffer.len(),
        };
        if pending + self.partial_utf8.len() > self.max_pending {
            return Err(CounselError::FrameTooLarge {
                limit: self.max_pending,
            });
        }
        Ok(())
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for FrameBuffer {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.next_frame()
    }
}
