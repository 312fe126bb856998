//! Frame Reader — Length-delimited framing over the raw feed stream
//!
//! TotalView-ITCH 5.0 transmits messages as `[u16 length][body]` where the
//! big-endian length counts the body bytes (type tag plus payload). The
//! reader yields one frame at a time from any `Read` source and tracks the
//! byte offset of every frame for diagnostics.
//!
//! Features:
//! - Sequential frame extraction from any `Read` source
//! - Byte-offset and frame-count tracking
//! - Truncation and zero-length detection with offset reporting

use std::io::{self, Read};
use thiserror::Error;

// ── Errors ──────────────────────────────────────────────────────────

/// Fatal framing failures. Once the length-prefix chain is broken there is
/// no way to resynchronize, so the session aborts.
#[derive(Error, Debug)]
pub enum FramingError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Truncated frame at byte offset {offset}: needed {needed} bytes, found {available}")]
    Truncated {
        offset: u64,
        needed: usize,
        available: usize,
    },

    #[error("Zero-length frame at byte offset {offset}")]
    ZeroLength { offset: u64 },
}

// ── Raw Frame ───────────────────────────────────────────────────────

/// One length-delimited message as it appeared on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Message type tag (first byte of the framed body).
    pub tag: u8,
    /// Body bytes after the type tag.
    pub payload: Vec<u8>,
    /// Stream offset of this frame's length prefix.
    pub byte_offset: u64,
}

impl RawFrame {
    /// Declared body length: type tag plus payload.
    pub fn wire_len(&self) -> usize {
        self.payload.len() + 1
    }
}

// ── Frame Reader ────────────────────────────────────────────────────

/// Sequential frame reader over a byte stream.
///
/// The sequence is finite and single-pass: the underlying stream position
/// is never reset, so frames can only be consumed in arrival order.
pub struct FrameReader<R> {
    inner: R,
    /// Byte offset of the next unread byte.
    offset: u64,
    /// Frames successfully read so far.
    frames_read: u64,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            offset: 0,
            frames_read: 0,
        }
    }

    /// Read the next frame.
    ///
    /// Returns `None` on a clean end of stream (EOF exactly at a frame
    /// boundary). EOF anywhere inside a length prefix or body is a
    /// `Truncated` error.
    pub fn next_frame(&mut self) -> Result<Option<RawFrame>, FramingError> {
        let frame_offset = self.offset;

        let mut prefix = [0u8; 2];
        let got = self.read_into(&mut prefix)?;
        if got == 0 {
            return Ok(None);
        }
        if got < prefix.len() {
            return Err(FramingError::Truncated {
                offset: frame_offset,
                needed: prefix.len(),
                available: got,
            });
        }
        self.offset += prefix.len() as u64;

        let declared = u16::from_be_bytes(prefix) as usize;
        if declared == 0 {
            return Err(FramingError::ZeroLength {
                offset: frame_offset,
            });
        }

        let mut body = vec![0u8; declared];
        let got = self.read_into(&mut body)?;
        if got < declared {
            return Err(FramingError::Truncated {
                offset: frame_offset,
                needed: declared,
                available: got,
            });
        }
        self.offset += declared as u64;
        self.frames_read += 1;

        let tag = body.remove(0);
        Ok(Some(RawFrame {
            tag,
            payload: body,
            byte_offset: frame_offset,
        }))
    }

    /// Byte offset of the next unread position in the stream.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of frames successfully read.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    // ── Internal Helpers ────────────────────────────────────────────

    /// Fill `buf` as far as the stream allows. Returns the number of bytes
    /// actually read; anything short of `buf.len()` means EOF was hit.
    fn read_into(&mut self, buf: &mut [u8]) -> Result<usize, io::Error> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
