//! Longest-prefix-match dispatch over registered receive prefixes
//!
//! The protocol has prefixes that are textual extensions of shorter ones
//! (`MS` vs `MSQUICK`, `PS` vs `PSBAS`), so an inbound line must be matched
//! against the longest registered prefix first; shortest-first matching
//! would misroute frames. The floor of two characters avoids
//! single-character collisions.

use std::collections::HashMap;

use crate::error::{ProtocolError, Result};
use crate::frame::Frame;

/// Minimum prefix length considered during dispatch.
pub const MIN_PREFIX_LEN: usize = 2;

/// Maps a frame's leading characters to the tag that owns that prefix.
///
/// Built once per zone store from the registered receive prefixes. `T` is a
/// small copyable tag (the store uses its feature tag enum).
#[derive(Debug, Clone)]
pub struct PrefixResolver<T> {
    entries: HashMap<Vec<u8>, T>,
    max_len: usize,
}

impl<T: Copy> PrefixResolver<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            max_len: 0,
        }
    }

    /// Register a receive prefix.
    ///
    /// Rejects prefixes below the dispatch floor and duplicates; the owning
    /// store treats either as fatal at construction.
    pub fn register(&mut self, prefix: &str, tag: T) -> Result<()> {
        if prefix.len() < MIN_PREFIX_LEN {
            return Err(ProtocolError::PrefixTooShort(prefix.to_string()));
        }
        if self.entries.contains_key(prefix.as_bytes()) {
            return Err(ProtocolError::DuplicatePrefix(prefix.to_string()));
        }
        self.max_len = self.max_len.max(prefix.len());
        self.entries.insert(prefix.as_bytes().to_vec(), tag);
        Ok(())
    }

    /// Resolve a frame to the owner of its longest matching prefix.
    ///
    /// Tries substring lengths from `min(max_len, frame_len)` down to two
    /// and returns the tag together with the matched length so the caller
    /// can advance the frame offset. `None` means no registered prefix
    /// matches; the caller logs and discards the frame.
    pub fn find(&self, frame: &Frame) -> Option<(T, usize)> {
        let upper = self.max_len.min(frame.remaining());
        for n in (MIN_PREFIX_LEN..=upper).rev() {
            if let Some(head) = frame.head(n) {
                if let Some(&tag) = self.entries.get(head) {
                    return Some((tag, n));
                }
            }
        }
        None
    }

    /// Number of registered prefixes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Copy> Default for PrefixResolver<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn resolver() -> PrefixResolver<u8> {
        let mut r = PrefixResolver::new();
        r.register("MV", 0).unwrap();
        r.register("MS", 1).unwrap();
        r.register("MSQUICK", 2).unwrap();
        r.register("PS", 3).unwrap();
        r.register("PSBAS", 4).unwrap();
        r
    }

    #[test]
    fn longest_match_wins() {
        let r = resolver();
        assert_eq!(r.find(&Frame::from("MSQUICK2")), Some((2, 7)));
        assert_eq!(r.find(&Frame::from("MSSTEREO")), Some((1, 2)));
        assert_eq!(r.find(&Frame::from("PSBAS 52")), Some((4, 5)));
        assert_eq!(r.find(&Frame::from("PSTONE CTRL ON")), Some((3, 2)));
    }

    #[test]
    fn no_match_returns_none() {
        let r = resolver();
        assert_eq!(r.find(&Frame::from("ZZ99")), None);
        assert_eq!(r.find(&Frame::from("M")), None);
        assert_eq!(r.find(&Frame::from("")), None);
    }

    #[test]
    fn match_respects_frame_offset() {
        let r = resolver();
        let mut frame = Frame::from("Z2MV50");
        frame.advance(2);
        assert_eq!(r.find(&frame), Some((0, 2)));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut r = resolver();
        assert!(matches!(
            r.register("MV", 9),
            Err(ProtocolError::DuplicatePrefix(_))
        ));
    }

    #[test]
    fn single_character_prefix_is_rejected() {
        let mut r = PrefixResolver::new();
        assert!(matches!(
            r.register("Z", 0u8),
            Err(ProtocolError::PrefixTooShort(_))
        ));
    }

    proptest! {
        /// When several registered prefixes are proper prefixes of a frame,
        /// find always returns the longest one.
        #[test]
        fn longest_of_nested_prefixes(tail in "[A-Z0-9]{0,8}") {
            let r = resolver();
            let frame = Frame::from(format!("MSQUICK{}", tail).as_str());
            prop_assert_eq!(r.find(&frame), Some((2, 7)));
        }

        #[test]
        fn match_length_never_exceeds_frame(line in "[A-Z]{0,6}") {
            let r = resolver();
            let frame = Frame::from(line.as_str());
            if let Some((_, n)) = r.find(&frame) {
                prop_assert!(n >= MIN_PREFIX_LEN);
                prop_assert!(n <= frame.remaining());
            }
        }
    }
}
