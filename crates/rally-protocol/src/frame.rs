//! Newline-delimited framing.
//!
//! TCP is a byte stream: one read can hold half a message, exactly one, or
//! several glued together. Each record on the wire is the codec's payload
//! followed by a single `\n`. Receivers buffer bytes until they see the
//! delimiter and split there.
//!
//! ```text
//! {"type":"input","direction":"up"}\n{"type":"rematch_vote"}\n{"type":"inp
//! └────────────── frame ──────────┘  └──────── frame ───────┘  └─ pending ─
//! ```
//!
//! A trailing partial record at end-of-stream is never decoded. It means the
//! peer went away mid-send, so [`FrameDecoder::finish`] reports it as
//! [`ProtocolError::Truncated`].

use serde::{Serialize, de::DeserializeOwned};

use crate::{Codec, ProtocolError};

/// Record delimiter. Never appears inside an encoded payload.
pub const DELIMITER: u8 = b'\n';

/// Upper bound on a single record, delimiter excluded.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Encodes one message as a complete frame (payload plus delimiter).
///
/// # Errors
/// Propagates codec errors, and rejects payloads that contain the delimiter.
pub fn encode_frame<C: Codec, T: Serialize>(
    codec: &C,
    msg: &T,
) -> Result<Vec<u8>, ProtocolError> {
    let mut bytes = codec.encode(msg)?;
    if bytes.contains(&DELIMITER) {
        return Err(ProtocolError::InvalidMessage(
            "encoded payload contains a raw newline".into(),
        ));
    }
    bytes.push(DELIMITER);
    Ok(bytes)
}

/// Splits `buf` into complete frames and the unconsumed remainder.
///
/// Frames are returned without their delimiter. A `\r` before the
/// delimiter is dropped and blank lines are skipped.
pub fn decode_frames(buf: &[u8]) -> (Vec<&[u8]>, &[u8]) {
    let mut frames = Vec::new();
    let mut rest = buf;
    while let Some(pos) = rest.iter().position(|&b| b == DELIMITER) {
        let line = trim_cr(&rest[..pos]);
        if !line.is_empty() {
            frames.push(line);
        }
        rest = &rest[pos + 1..];
    }
    (frames, rest)
}

fn trim_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Incremental frame splitter for one inbound stream.
///
/// Feed it every chunk the socket produces with [`push`](Self::push), drain
/// complete frames with [`next_frame`](Self::next_frame) or
/// [`decode_next`](Self::decode_next), and call [`finish`](Self::finish)
/// once the socket reports end-of-stream.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    /// Bytes at the front of `buf` already scanned without finding a
    /// delimiter. Saves rescanning on every push.
    scanned: usize,
    max_len: usize,
}

impl FrameDecoder {
    /// Creates a decoder with the default [`MAX_FRAME_LEN`].
    pub fn new() -> Self {
        Self::with_max_len(MAX_FRAME_LEN)
    }

    /// Creates a decoder with a custom frame limit.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            buf: Vec::new(),
            scanned: 0,
            max_len,
        }
    }

    /// Appends freshly received bytes.
    ///
    /// # Errors
    /// [`ProtocolError::FrameTooLong`] if the pending (undelimited) tail
    /// grows past the limit.
    pub fn push(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        self.buf.extend_from_slice(data);
        let tail = match self.buf.iter().rposition(|&b| b == DELIMITER) {
            Some(pos) => self.buf.len() - pos - 1,
            None => self.buf.len(),
        };
        if tail > self.max_len {
            return Err(ProtocolError::FrameTooLong {
                len: tail,
                max: self.max_len,
            });
        }
        Ok(())
    }

    /// Pops the next complete frame, without its delimiter.
    ///
    /// Returns `Ok(None)` when only a partial record (or nothing) is left.
    ///
    /// # Errors
    /// [`ProtocolError::FrameTooLong`] for a delimited record over the limit.
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>, ProtocolError> {
        loop {
            let Some(offset) = self.buf[self.scanned..]
                .iter()
                .position(|&b| b == DELIMITER)
            else {
                self.scanned = self.buf.len();
                return Ok(None);
            };
            let pos = self.scanned + offset;
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            self.scanned = 0;
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.is_empty() {
                continue;
            }
            if line.len() > self.max_len {
                return Err(ProtocolError::FrameTooLong {
                    len: line.len(),
                    max: self.max_len,
                });
            }
            return Ok(Some(line));
        }
    }

    /// Pops and decodes the next complete frame.
    pub fn decode_next<C: Codec, T: DeserializeOwned>(
        &mut self,
        codec: &C,
    ) -> Result<Option<T>, ProtocolError> {
        match self.next_frame()? {
            Some(frame) => codec.decode(&frame).map(Some),
            None => Ok(None),
        }
    }

    /// Number of buffered bytes not yet returned as a frame.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Declares end-of-stream.
    ///
    /// # Errors
    /// [`ProtocolError::Truncated`] if anything other than whitespace is
    /// still buffered.
    pub fn finish(&mut self) -> Result<(), ProtocolError> {
        let pending = self.buf.len();
        let leftover = self.buf.iter().any(|b| !b.is_ascii_whitespace());
        self.buf.clear();
        self.scanned = 0;
        if leftover {
            return Err(ProtocolError::Truncated { pending });
        }
        Ok(())
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================
