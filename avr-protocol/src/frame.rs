//! One line of the wire protocol
//!
//! A [`Frame`] wraps the raw bytes of a single inbound or outbound protocol
//! line together with an active offset. Dispatch advances the offset past the
//! matched receive prefix instead of reallocating, so a feature's `update`
//! only ever sees its own payload.

use std::fmt;

/// Sentinel returned by [`Frame::as_number`] for the literal `OFF` token and
/// for unparseable numeric fields.
pub const OFF: i32 = -1;

/// One inbound or outbound protocol line.
///
/// Invariant: `offset <= len <= buf.len()`.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    buf: Vec<u8>,
    offset: usize,
    len: usize,
}

impl Frame {
    /// Build a frame from a raw buffer and a byte count.
    ///
    /// Bytes past `count` are ignored; this matches how the receive loop
    /// hands over a partially filled line buffer.
    pub fn from_raw(buf: &[u8], count: usize) -> Self {
        let len = count.min(buf.len());
        Self {
            buf: buf[..len].to_vec(),
            offset: 0,
            len,
        }
    }

    /// Build a frame that owns the whole buffer.
    pub fn new(buf: Vec<u8>) -> Self {
        let len = buf.len();
        Self {
            buf,
            offset: 0,
            len,
        }
    }

    /// Logical length of the whole line, independent of the offset.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current active offset.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes remaining in the active region.
    pub fn remaining(&self) -> usize {
        self.len - self.offset
    }

    /// Advance the offset past a matched prefix. Clamped to the line length.
    pub fn advance(&mut self, n: usize) {
        self.offset = (self.offset + n).min(self.len);
    }

    /// Reset the offset to the start of the line.
    pub fn rewind(&mut self) {
        self.offset = 0;
    }

    /// The active region as raw bytes.
    pub fn active(&self) -> &[u8] {
        &self.buf[self.offset..self.len]
    }

    /// The whole line as raw bytes, ignoring the offset.
    pub fn raw(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// The active region decoded as text. Non-UTF-8 bytes are replaced; the
    /// protocol is ASCII apart from display payloads, which go through
    /// [`Frame::extract_line`] instead.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.active()).into_owned()
    }

    /// Leading candidate of the active region, used for prefix matching.
    pub fn head(&self, n: usize) -> Option<&[u8]> {
        self.active().get(..n)
    }

    /// Whether the active region starts with the given ASCII prefix.
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.active().starts_with(prefix.as_bytes())
    }

    /// True iff every byte of the active region is a decimal digit.
    /// An empty region is not a number.
    pub fn is_number(&self) -> bool {
        let active = self.active();
        !active.is_empty() && active.iter().all(u8::is_ascii_digit)
    }

    /// Parse the trimmed active region as a number.
    ///
    /// The literal `OFF` maps to the [`OFF`] sentinel. A parse failure is
    /// logged and also yields the sentinel; callers never see an error from
    /// a malformed status line.
    pub fn as_number(&self) -> i32 {
        let text = self.text();
        let trimmed = text.trim();
        if trimmed == "OFF" {
            return OFF;
        }
        match trimmed.parse::<i32>() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("unparseable numeric field in frame {:?}", self);
                OFF
            }
        }
    }

    /// Decode a trailing display segment as text.
    ///
    /// Skips `skip` bytes past the current offset, then decodes up to the
    /// first NUL (or the end of the line). Display payloads carry raw
    /// extended bytes; they are decoded leniently and never fail.
    pub fn extract_line(&self, skip: usize) -> String {
        let start = (self.offset + skip).min(self.len);
        let segment = &self.buf[start..self.len];
        let end = segment
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(segment.len());
        String::from_utf8_lossy(&segment[..end]).into_owned()
    }

    /// Render the active region with control and non-ASCII bytes escaped as
    /// `{hex}`. Never fails on malformed input.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.remaining());
        for &b in self.active() {
            if (0x20..0x7f).contains(&b) {
                out.push(b as char);
            } else {
                out.push_str(&format!("{{{:02x}}}", b));
            }
        }
        out
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({}", self.render())?;
        if self.offset > 0 {
            write!(f, " @{}", self.offset)?;
        }
        write!(f, ")")
    }
}

impl From<&str> for Frame {
    fn from(s: &str) -> Self {
        Frame::new(s.as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_honors_count() {
        let frame = Frame::from_raw(b"MV505xxxx", 5);
        assert_eq!(frame.len(), 5);
        assert_eq!(frame.text(), "MV505");
    }

    #[test]
    fn advance_moves_active_region() {
        let mut frame = Frame::from("MV505");
        frame.advance(2);
        assert_eq!(frame.text(), "505");
        assert_eq!(frame.remaining(), 3);
    }

    #[test]
    fn advance_clamps_to_length() {
        let mut frame = Frame::from("MV");
        frame.advance(10);
        assert_eq!(frame.remaining(), 0);
        assert!(frame.active().is_empty());
    }

    #[test]
    fn is_number_requires_all_digits() {
        assert!(Frame::from("505").is_number());
        assert!(!Frame::from("50A").is_number());
        assert!(!Frame::from("").is_number());
        let mut frame = Frame::from("MV50");
        assert!(!frame.is_number());
        frame.advance(2);
        assert!(frame.is_number());
    }

    #[test]
    fn as_number_parses_trimmed_text() {
        assert_eq!(Frame::from("50").as_number(), 50);
        assert_eq!(Frame::from(" 120 ").as_number(), 120);
    }

    #[test]
    fn as_number_off_sentinel() {
        assert_eq!(Frame::from("OFF").as_number(), OFF);
    }

    #[test]
    fn as_number_never_panics_on_garbage() {
        assert_eq!(Frame::from("MV?!").as_number(), OFF);
        assert_eq!(Frame::from("").as_number(), OFF);
    }

    #[test]
    fn extract_line_stops_at_nul() {
        let mut frame = Frame::new(b"NSE1Now Playing\0garbage".to_vec());
        frame.advance(3);
        assert_eq!(frame.extract_line(1), "Now Playing");
    }

    #[test]
    fn extract_line_passes_raw_high_bytes() {
        let mut frame = Frame::new(vec![b'N', b'S', b'E', b'1', 0xe2, 0x99, 0xaa]);
        frame.advance(3);
        // UTF-8 eighth-note glyph survives the decode
        assert_eq!(frame.extract_line(1), "\u{266a}");
    }

    #[test]
    fn render_escapes_control_bytes() {
        let frame = Frame::new(vec![b'N', b'S', b'E', b'0', 0x01, 0xff]);
        assert_eq!(frame.render(), "NSE0{01}{ff}");
    }

    #[test]
    fn debug_shows_offset() {
        let mut frame = Frame::from("MV50");
        frame.advance(2);
        assert_eq!(format!("{:?}", frame), "Frame(50 @2)");
    }
}
