//! Incremental framing of the inbound byte stream
//!
//! Lines are terminated by a single carriage return; there are no newlines
//! on the wire. One quirk has to live here: the onscreen-display responses
//! (`NSE`/`NSA`) carry a flags byte immediately after the line digit, and
//! that byte may legally equal the terminator. The scanner consumes it as
//! data instead of ending the line.

use crate::command::LINE_TERMINATOR;
use crate::frame::Frame;

/// Maximum accepted line length. Longer lines indicate a desynchronized
/// stream; they are discarded and scanning resumes at the next terminator.
pub const MAX_LINE_LEN: usize = 135;

/// Splits a raw byte stream into protocol [`Frame`]s.
#[derive(Debug, Default)]
pub struct LineScanner {
    buf: Vec<u8>,
    discarding: bool,
}

impl LineScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning every completed frame.
    ///
    /// Empty lines are dropped. Oversized lines are logged and discarded;
    /// the scanner then drains bytes up to the next terminator before
    /// resuming.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        for &byte in chunk {
            if self.discarding {
                if byte == LINE_TERMINATOR {
                    self.discarding = false;
                }
                continue;
            }
            if byte == LINE_TERMINATOR && !self.terminator_is_data() {
                if !self.buf.is_empty() {
                    frames.push(Frame::new(std::mem::take(&mut self.buf)));
                }
                continue;
            }
            if self.buf.len() >= MAX_LINE_LEN {
                tracing::error!(
                    "inbound line exceeded {} bytes, resynchronizing: {:?}",
                    MAX_LINE_LEN,
                    Frame::from_raw(&self.buf, 16)
                );
                self.buf.clear();
                self.discarding = true;
                continue;
            }
            self.buf.push(byte);
        }
        frames
    }

    /// Whether a terminator byte at the current position is display payload.
    ///
    /// True exactly when the buffer so far is `NSE<digit>` or `NSA<digit>`:
    /// the next byte is the display flags byte, which may be 0x0D.
    fn terminator_is_data(&self) -> bool {
        self.buf.len() == 4
            && (self.buf.starts_with(b"NSE") || self.buf.starts_with(b"NSA"))
            && self.buf[3].is_ascii_digit()
    }

    /// Drop any partially accumulated line (used when the transport closes).
    pub fn reset(&mut self) {
        self.buf.clear();
        self.discarding = false;
    }
}
