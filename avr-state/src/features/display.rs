//! Onscreen display lines
//!
//! The display burst (`NSE0`..`NSE8`) reports the receiver's on-screen menu.
//! Line 0 is the title; lines 1 and up carry a flags byte between the line
//! digit and the text, which [`avr_protocol::Frame::extract_line`] skips.
//! The whole burst is queried with the bare prefix, never with a suffix.

use avr_protocol::{Frame, QueryFormat};

use crate::feature::{FeatureState, FeatureTag};
use crate::value::FeatureValue;

const LINE_COUNT: usize = 9;

/// The composite onscreen display state.
#[derive(Debug)]
pub struct DisplayState {
    tag: FeatureTag,
    prefix: &'static str,
    lines: [Option<String>; LINE_COUNT],
}

impl DisplayState {
    pub fn new(tag: FeatureTag, prefix: &'static str) -> Self {
        Self {
            tag,
            prefix,
            lines: Default::default(),
        }
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).and_then(|l| l.as_deref())
    }
}

impl FeatureState for DisplayState {
    fn tag(&self) -> FeatureTag {
        self.tag
    }

    fn command_prefix(&self) -> &str {
        self.prefix
    }

    fn query_format(&self) -> QueryFormat {
        QueryFormat::Bare
    }

    fn is_auto_update(&self) -> bool {
        false
    }

    fn update(&mut self, frame: &mut Frame) -> bool {
        let active = frame.active();
        let Some(&digit) = active.first() else {
            tracing::warn!("{:?}: display line without a line digit", self.tag);
            return false;
        };
        if !digit.is_ascii_digit() {
            tracing::warn!("{:?}: bad display line digit {:?}", self.tag, frame);
            return false;
        }
        let index = (digit - b'0') as usize;
        if index >= LINE_COUNT {
            return false;
        }
        // line 0 has no flags byte; later lines do
        let skip = if index == 0 { 1 } else { 2 };
        let text = frame.extract_line(skip);
        if self.lines[index].as_deref() == Some(text.as_str()) {
            return false;
        }
        self.lines[index] = Some(text);
        true
    }

    fn is_defined(&self) -> bool {
        self.lines.iter().any(Option::is_some)
    }

    fn reset(&mut self) {
        self.lines = Default::default();
    }

    fn value(&self) -> FeatureValue {
        if !self.is_defined() {
            return FeatureValue::Undefined;
        }
        let lines = self
            .lines
            .iter()
            .map(|l| l.clone().unwrap_or_default())
            .collect();
        FeatureValue::Display(lines)
    }

    fn encode_set(&self, _desired: &FeatureValue) -> Option<String> {
        // the display is read-only
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display() -> DisplayState {
        DisplayState::new(FeatureTag::DisplayLine, "NSE")
    }

    fn line_frame(bytes: &[u8]) -> Frame {
        // frames arrive with the offset already past the NSE prefix
        let mut frame = Frame::new(bytes.to_vec());
        frame.advance(3);
        frame
    }

    #[test]
    fn title_line_has_no_flags_byte() {
        let mut d = display();
        assert!(d.update(&mut line_frame(b"NSE0Internet Radio")));
        assert_eq!(d.line(0), Some("Internet Radio"));
    }

    #[test]
    fn content_lines_skip_the_flags_byte() {
        let mut d = display();
        let mut bytes = b"NSE1".to_vec();
        bytes.push(0x02);
        bytes.extend_from_slice(b"Some Station");
        assert!(d.update(&mut line_frame(&bytes)));
        assert_eq!(d.line(1), Some("Some Station"));
    }

    #[test]
    fn identical_line_is_not_a_change() {
        let mut d = display();
        assert!(d.update(&mut line_frame(b"NSE0Title")));
        assert!(!d.update(&mut line_frame(b"NSE0Title")));
        assert!(d.update(&mut line_frame(b"NSE0Other")));
    }

    #[test]
    fn value_collects_lines_in_order() {
        let mut d = display();
        d.update(&mut line_frame(b"NSE0Title"));
        let mut bytes = b"NSE2".to_vec();
        bytes.push(0x00);
        bytes.extend_from_slice(b"Entry");
        d.update(&mut line_frame(&bytes));
        match d.value() {
            FeatureValue::Display(lines) => {
                assert_eq!(lines[0], "Title");
                assert_eq!(lines[1], "");
                assert_eq!(lines[2], "Entry");
            }
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn malformed_lines_are_dropped() {
        let mut d = display();
        assert!(!d.update(&mut line_frame(b"NSEX??")));
        assert!(!d.update(&mut line_frame(b"NSE")));
        assert!(!d.is_defined());
    }
}
