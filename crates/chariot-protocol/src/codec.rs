//! Line and frame codecs for the serial link.
//!
//! Traffic in the two directions is delimited differently:
//!
//! - **Host → peer**: single-line ASCII records terminated with `\n`.
//! - **Peer → host responses**: arbitrary text closed by the two-character
//!   sentinel `<<`. The sentinel characters are stripped, never returned.
//! - **Peer → host commands**: single lines terminated with `\n`, `\r` or `\0`.

use bytes::{Buf, BytesMut};

use crate::constants::{
    FRAME_SENTINEL, LINE_TERMINATOR, MAX_RECORD_LEN, MAX_RESPONSE_LEN, SENTINEL, SENTINEL_COUNT,
};
use crate::error::{ProtocolError, ProtocolResult};

/// Append the line terminator to `text`.
pub fn encode_line(text: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(text.len() + 1);
    buf.extend_from_slice(text.as_bytes());
    buf.push(LINE_TERMINATOR);
    buf
}

/// Encode `text` as a line and reject it if the result exceeds `max` bytes.
///
/// The terminator counts toward the bound.
pub fn encode_line_bounded(text: &str, max: usize) -> ProtocolResult<Vec<u8>> {
    let actual = text.len() + 1;
    if actual > max {
        return Err(ProtocolError::RecordTooLong { max, actual });
    }
    Ok(encode_line(text))
}

/// Encode `text` as a line bounded by [`MAX_RECORD_LEN`].
pub fn encode_record_line(text: &str) -> ProtocolResult<Vec<u8>> {
    encode_line_bounded(text, MAX_RECORD_LEN)
}

/// Remove every `<<` sentinel from `line`. A lone `<` is kept.
pub fn strip_sentinels(line: &str) -> String {
    line.replace(FRAME_SENTINEL, "")
}

/// Accumulates peer bytes into one response frame.
///
/// Every `<` counts toward the sentinel and is dropped from the content. The
/// frame completes once two have been seen, whether or not they were adjacent.
#[derive(Debug, Default)]
pub struct ResponseFramer {
    content: BytesMut,
    sentinels_seen: u8,
}

impl ResponseFramer {
    /// Create an empty framer.
    pub fn new() -> Self {
        ResponseFramer {
            content: BytesMut::with_capacity(64),
            sentinels_seen: 0,
        }
    }

    /// Feed one byte.
    ///
    /// Returns `Ok(Some(content))` when this byte completes the frame and
    /// resets the framer for the next one.
    pub fn push(&mut self, byte: u8) -> ProtocolResult<Option<String>> {
        if byte == SENTINEL {
            self.sentinels_seen += 1;
            if self.sentinels_seen >= SENTINEL_COUNT {
                let content = String::from_utf8_lossy(&self.content).to_string();
                self.reset();
                return Ok(Some(content));
            }
            return Ok(None);
        }

        if self.content.len() >= MAX_RESPONSE_LEN {
            let actual = self.content.len() + 1;
            log::warn!("response frame exceeds {} bytes, discarding", MAX_RESPONSE_LEN);
            self.reset();
            return Err(ProtocolError::FrameTooLong {
                max: MAX_RESPONSE_LEN,
                actual,
            });
        }
        self.content.extend_from_slice(&[byte]);
        Ok(None)
    }

    /// Feed a slice, stopping at the first completed frame.
    ///
    /// Returns the frame content and the number of bytes consumed, or `None`
    /// if all of `data` was consumed without completing a frame.
    pub fn push_slice(&mut self, data: &[u8]) -> ProtocolResult<Option<(String, usize)>> {
        for (i, &byte) in data.iter().enumerate() {
            if let Some(content) = self.push(byte)? {
                return Ok(Some((content, i + 1)));
            }
        }
        Ok(None)
    }

    /// Whether any byte of the current frame has arrived.
    pub fn is_started(&self) -> bool {
        !self.content.is_empty() || self.sentinels_seen > 0
    }

    /// Number of content bytes accumulated so far.
    pub fn buffered_len(&self) -> usize {
        self.content.len()
    }

    /// Content received so far, for diagnostics on a truncated frame.
    pub fn partial(&self) -> String {
        String::from_utf8_lossy(&self.content).to_string()
    }

    /// Discard the current frame.
    pub fn reset(&mut self) {
        self.content.clear();
        self.sentinels_seen = 0;
    }
}

/// Accumulates peer bytes into inbound command lines.
#[derive(Debug, Default)]
pub struct LineCodec {
    buffer: BytesMut,
}

impl LineCodec {
    /// Create a new line codec.
    pub fn new() -> Self {
        LineCodec {
            buffer: BytesMut::with_capacity(MAX_RECORD_LEN),
        }
    }

    /// Add received data to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Add a single received byte.
    pub fn push_byte(&mut self, byte: u8) {
        self.buffer.extend_from_slice(&[byte]);
    }

    /// Try to decode a complete line from the buffer.
    ///
    /// A line ends at `\n`, `\r` or `\0`. Blank lines are skipped.
    pub fn decode_line(&mut self) -> Option<String> {
        loop {
            let end = self.buffer.iter().position(|&b| is_line_end(b))?;
            let line_data = self.buffer.split_to(end);
            while !self.buffer.is_empty() && is_line_end(self.buffer[0]) {
                self.buffer.advance(1);
            }
            let line = String::from_utf8_lossy(&line_data).to_string();
            if !line.trim().is_empty() {
                return Some(line);
            }
        }
    }

    /// Whether a partial line is buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Get the number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

fn is_line_end(byte: u8) -> bool {
    byte == b'\n' || byte == b'\r' || byte == 0
}
