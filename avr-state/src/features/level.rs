//! Bounded integer levels
//!
//! Two shapes exist on the wire: a single numeric value per command
//! (`PSBAS 52`, `SLP030`) and a multiplexed "key value" pairs line listing
//! sub-channels (`CVFL 50`). Values are zero-padded to the field width
//! implied by the type's maximum (1, 2 or 3 digits); a value arriving with
//! a spurious extra decimal digit is truncated, not rounded.

use std::collections::BTreeMap;

use avr_protocol::{Frame, QueryFormat, OFF};

use crate::feature::{FeatureState, FeatureTag};
use crate::value::FeatureValue;

/// Field width implied by a maximum value.
fn width_for_max(max: i32) -> usize {
    if max < 10 {
        1
    } else if max < 100 {
        2
    } else {
        3
    }
}

/// Parse a digit token at the given field width, truncating one spurious
/// extra digit.
fn parse_level(token: &str, width: usize) -> Option<i32> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let token = if token.len() == width + 1 {
        &token[..width]
    } else {
        token
    };
    token.parse().ok()
}

/// A single bounded integer level.
#[derive(Debug)]
pub struct LevelState {
    tag: FeatureTag,
    prefix: &'static str,
    max: i32,
    width: usize,
    encode_width: usize,
    query_format: QueryFormat,
    auto_update: bool,
    off_sentinel: bool,
    value: Option<i32>,
}

impl LevelState {
    pub fn new(tag: FeatureTag, prefix: &'static str, max: i32) -> Self {
        let width = width_for_max(max);
        Self {
            tag,
            prefix,
            max,
            width,
            encode_width: width,
            query_format: QueryFormat::Suffix,
            auto_update: true,
            off_sentinel: false,
            value: None,
        }
    }

    pub fn with_query_format(mut self, format: QueryFormat) -> Self {
        self.query_format = format;
        self
    }

    /// Override the field width (the tuner frequency uses six digits).
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self.encode_width = width;
        self
    }

    /// Encode outbound values without zero padding. Some models want
    /// `SLP30` where others want `SLP030`; inbound parsing is unaffected.
    pub fn plain_encoded(mut self) -> Self {
        self.encode_width = 1;
        self
    }

    /// Accept the literal `OFF` token as the −1 sentinel.
    pub fn with_off_sentinel(mut self) -> Self {
        self.off_sentinel = true;
        self
    }

    pub fn on_demand(mut self) -> Self {
        self.auto_update = false;
        self
    }

    /// Zero-padded wire encoding of a value.
    pub fn encode_value(&self, value: i32) -> String {
        if self.off_sentinel && value == OFF {
            return "OFF".to_string();
        }
        format!(
            "{:0width$}",
            value.clamp(0, self.max),
            width = self.encode_width
        )
    }
}

impl FeatureState for LevelState {
    fn tag(&self) -> FeatureTag {
        self.tag
    }

    fn command_prefix(&self) -> &str {
        self.prefix
    }

    fn query_format(&self) -> QueryFormat {
        self.query_format
    }

    fn is_auto_update(&self) -> bool {
        self.auto_update
    }

    fn update(&mut self, frame: &mut Frame) -> bool {
        let text = frame.text();
        let token = text.trim();
        let new = if self.off_sentinel && token == "OFF" {
            OFF
        } else {
            match parse_level(token, self.width) {
                Some(v) => v,
                None => {
                    tracing::warn!("{:?}: unparseable level {:?}", self.tag, token);
                    return false;
                }
            }
        };
        let changed = self.value != Some(new);
        self.value = Some(new);
        changed
    }

    fn is_defined(&self) -> bool {
        self.value.is_some()
    }

    fn reset(&mut self) {
        self.value = None;
    }

    fn value(&self) -> FeatureValue {
        match self.value {
            Some(v) => FeatureValue::Level(v),
            None => FeatureValue::Undefined,
        }
    }

    fn encode_set(&self, desired: &FeatureValue) -> Option<String> {
        desired.as_level().map(|v| self.encode_value(v))
    }
}

/// A multiplexed level: several sub-channels behind one command prefix.
#[derive(Debug)]
pub struct ChannelLevelState {
    tag: FeatureTag,
    prefix: &'static str,
    max: i32,
    width: usize,
    auto_update: bool,
    channels: BTreeMap<String, i32>,
}

impl ChannelLevelState {
    pub fn new(tag: FeatureTag, prefix: &'static str, max: i32) -> Self {
        Self {
            tag,
            prefix,
            max,
            width: width_for_max(max),
            auto_update: true,
            channels: BTreeMap::new(),
        }
    }

    pub fn on_demand(mut self) -> Self {
        self.auto_update = false;
        self
    }

    pub fn channel(&self, key: &str) -> Option<i32> {
        self.channels.get(key).copied()
    }

    /// Wire token setting one sub-channel, e.g. `FL 50`.
    pub fn encode_channel(&self, key: &str, value: i32) -> String {
        format!(
            "{} {:0width$}",
            key,
            value.clamp(0, self.max),
            width = self.width
        )
    }
}

impl FeatureState for ChannelLevelState {
    fn tag(&self) -> FeatureTag {
        self.tag
    }

    fn command_prefix(&self) -> &str {
        self.prefix
    }

    fn query_format(&self) -> QueryFormat {
        QueryFormat::SpaceSuffix
    }

    fn is_auto_update(&self) -> bool {
        self.auto_update
    }

    fn update(&mut self, frame: &mut Frame) -> bool {
        let text = frame.text();
        let mut parts = text.split_whitespace();
        let mut changed = false;
        let mut seen_pair = false;
        while let Some(key) = parts.next() {
            // END marks the close of a multi-line report burst
            if key == "END" {
                return changed;
            }
            let Some(raw) = parts.next() else {
                tracing::warn!("{:?}: channel {:?} without a value", self.tag, key);
                return changed;
            };
            let Some(value) = parse_level(raw, self.width) else {
                tracing::warn!("{:?}: unparseable channel level {:?}", self.tag, raw);
                continue;
            };
            seen_pair = true;
            if self.channels.get(key) != Some(&value) {
                self.channels.insert(key.to_string(), value);
                changed = true;
            }
        }
        if !seen_pair && !changed {
            tracing::warn!("{:?}: no channel pairs in {:?}", self.tag, text.trim());
        }
        changed
    }

    fn is_defined(&self) -> bool {
        !self.channels.is_empty()
    }

    fn reset(&mut self) {
        self.channels.clear();
    }

    fn value(&self) -> FeatureValue {
        if self.channels.is_empty() {
            FeatureValue::Undefined
        } else {
            FeatureValue::Levels(self.channels.clone())
        }
    }

    fn encode_set(&self, desired: &FeatureValue) -> Option<String> {
        match desired {
            FeatureValue::Levels(map) => {
                let (key, value) = map.iter().next()?;
                Some(self.encode_channel(key, *value))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_follows_max() {
        assert_eq!(width_for_max(9), 1);
        assert_eq!(width_for_max(99), 2);
        assert_eq!(width_for_max(120), 3);
    }

    #[test]
    fn level_update_and_idempotence() {
        let mut s = LevelState::new(FeatureTag::Bass, "PSBAS", 99);
        assert!(s.update(&mut Frame::from("52")));
        assert_eq!(s.value(), FeatureValue::Level(52));
        assert!(!s.update(&mut Frame::from("52")));
        assert!(s.update(&mut Frame::from("53")));
    }

    #[test]
    fn spurious_extra_digit_is_truncated() {
        let mut s = LevelState::new(FeatureTag::Bass, "PSBAS", 99);
        // "545" at width 2 means 54.5: truncate, never round
        assert!(s.update(&mut Frame::from("545")));
        assert_eq!(s.value(), FeatureValue::Level(54));
    }

    #[test]
    fn encode_zero_pads_to_width() {
        let s = LevelState::new(FeatureTag::Sleep, "SLP", 120);
        assert_eq!(s.encode_value(30), "030");
        assert_eq!(s.encode_value(120), "120");
        let narrow = LevelState::new(FeatureTag::Bass, "PSBAS", 99);
        assert_eq!(narrow.encode_value(5), "05");
    }

    #[test]
    fn off_sentinel_round_trip() {
        let mut s = LevelState::new(FeatureTag::Sleep, "SLP", 120).with_off_sentinel();
        assert!(s.update(&mut Frame::from("OFF")));
        assert_eq!(s.value(), FeatureValue::Level(OFF));
        assert_eq!(s.encode_value(OFF), "OFF");
    }

    #[test]
    fn plain_encoding_drops_zero_padding() {
        let s = LevelState::new(FeatureTag::Sleep, "SLP", 120)
            .with_off_sentinel()
            .plain_encoded();
        assert_eq!(s.encode_value(30), "30");
        assert_eq!(s.encode_value(120), "120");
        assert_eq!(s.encode_value(OFF), "OFF");
    }

    #[test]
    fn plain_encoding_leaves_parsing_untouched() {
        let mut s = LevelState::new(FeatureTag::Sleep, "SLP", 120)
            .with_off_sentinel()
            .plain_encoded();
        assert!(s.update(&mut Frame::from("030")));
        assert_eq!(s.value(), FeatureValue::Level(30));
        assert!(s.update(&mut Frame::from("OFF")));
        assert_eq!(s.value(), FeatureValue::Level(OFF));
    }

    #[test]
    fn garbage_level_is_ignored() {
        let mut s = LevelState::new(FeatureTag::Treble, "PSTRE", 99);
        assert!(!s.update(&mut Frame::from("UP")));
        assert!(!s.is_defined());
    }

    #[test]
    fn channel_pairs_accumulate() {
        let mut s = ChannelLevelState::new(FeatureTag::ChannelLevel, "CV", 99);
        assert!(s.update(&mut Frame::from("FL 50")));
        assert!(s.update(&mut Frame::from("FR 52")));
        assert_eq!(s.channel("FL"), Some(50));
        assert_eq!(s.channel("FR"), Some(52));
        match s.value() {
            FeatureValue::Levels(map) => assert_eq!(map.len(), 2),
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn repeated_channel_pair_is_not_a_change() {
        let mut s = ChannelLevelState::new(FeatureTag::ChannelLevel, "CV", 99);
        assert!(s.update(&mut Frame::from("FL 50")));
        assert!(!s.update(&mut Frame::from("FL 50")));
    }

    #[test]
    fn channel_report_end_marker_is_absorbed() {
        let mut s = ChannelLevelState::new(FeatureTag::ChannelLevel, "CV", 99);
        assert!(!s.update(&mut Frame::from("END")));
        assert!(!s.is_defined());
    }

    #[test]
    fn channel_truncates_half_steps() {
        let mut s = ChannelLevelState::new(FeatureTag::ChannelLevel, "CV", 99);
        assert!(s.update(&mut Frame::from("SW 545")));
        assert_eq!(s.channel("SW"), Some(54));
    }

    #[test]
    fn encode_channel_token() {
        let s = ChannelLevelState::new(FeatureTag::ChannelLevel, "CV", 99);
        assert_eq!(s.encode_channel("FL", 5), "FL 05");
    }
}
