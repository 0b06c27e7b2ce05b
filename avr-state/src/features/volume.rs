//! The volume special case
//!
//! The wire value is absolute tenths with a model-specific additive
//! adjustment and modulo-1000 wraparound. Display conversion supports an
//! absolute `NN.n` mode and a relative `±NN.n dB` mode against a fixed
//! reference; the silent minimum renders as a placeholder, never as a
//! number. `MAX` sub-reports on the same prefix are absorbed without a
//! change event.

use avr_protocol::Frame;

use crate::feature::{FeatureState, FeatureTag};
use crate::value::FeatureValue;

/// Reference point for relative display: 80.0 maps to 0.0 dB.
pub const VOLUME_REFERENCE_TENTHS: i32 = 800;

/// Placeholder for the silent minimum.
const SILENT_PLACEHOLDER: &str = "---";

/// Volume display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeDisplay {
    Absolute,
    Relative,
}

/// Absolute volume in tenths.
#[derive(Debug)]
pub struct VolumeState {
    tag: FeatureTag,
    prefix: &'static str,
    adjust_tenths: i32,
    tenths: Option<i32>,
    max_tenths: Option<i32>,
}

impl VolumeState {
    pub fn new(tag: FeatureTag, prefix: &'static str, adjust_tenths: i32) -> Self {
        Self {
            tag,
            prefix,
            adjust_tenths,
            tenths: None,
            max_tenths: None,
        }
    }

    /// Current value in tenths, if defined.
    pub fn tenths(&self) -> Option<i32> {
        self.tenths
    }

    /// Upper limit reported by the receiver, if it sent one.
    pub fn max_tenths(&self) -> Option<i32> {
        self.max_tenths
    }

    /// Wire encoding of a tenths value, undoing the model adjustment.
    pub fn encode_tenths(&self, tenths: i32) -> String {
        let wire = (tenths - self.adjust_tenths).rem_euclid(1000);
        format!("{:03}", wire)
    }

    /// Render a tenths value in the given display mode.
    pub fn render(tenths: i32, mode: VolumeDisplay) -> String {
        if tenths == 0 {
            return SILENT_PLACEHOLDER.to_string();
        }
        match mode {
            VolumeDisplay::Absolute => format!("{}.{}", tenths / 10, tenths % 10),
            VolumeDisplay::Relative => {
                let rel = tenths - VOLUME_REFERENCE_TENTHS;
                let sign = if rel < 0 { "-" } else { "+" };
                let abs = rel.abs();
                format!("{}{}.{} dB", sign, abs / 10, abs % 10)
            }
        }
    }

    /// Current value rendered for display.
    pub fn display(&self, mode: VolumeDisplay) -> Option<String> {
        self.tenths.map(|t| Self::render(t, mode))
    }

    fn apply_wire(&self, wire: i32) -> i32 {
        (wire + self.adjust_tenths).rem_euclid(1000)
    }
}

impl FeatureState for VolumeState {
    fn tag(&self) -> FeatureTag {
        self.tag
    }

    fn command_prefix(&self) -> &str {
        self.prefix
    }

    fn is_auto_update(&self) -> bool {
        true
    }

    fn is_command_secondary_zone_encoded(&self) -> bool {
        true
    }

    fn update(&mut self, frame: &mut Frame) -> bool {
        let text = frame.text();
        let token = text.trim();
        // MAX sub-report shares the volume prefix; absorb without a change
        if let Some(rest) = token.strip_prefix("MAX") {
            if let Ok(wire) = rest.trim().parse::<i32>() {
                self.max_tenths = Some(self.apply_wire(wire));
            }
            return false;
        }
        if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
            tracing::warn!("{:?}: unparseable volume {:?}", self.tag, token);
            return false;
        }
        // truncate a spurious extra digit past the three-digit field
        let token = if token.len() > 3 { &token[..3] } else { token };
        let wire: i32 = match token.parse() {
            Ok(v) => v,
            Err(_) => return false,
        };
        let new = self.apply_wire(wire);
        let changed = self.tenths != Some(new);
        self.tenths = Some(new);
        changed
    }

    fn is_defined(&self) -> bool {
        self.tenths.is_some()
    }

    fn reset(&mut self) {
        self.tenths = None;
    }

    fn value(&self) -> FeatureValue {
        match self.tenths {
            Some(t) => FeatureValue::Volume(t),
            None => FeatureValue::Undefined,
        }
    }

    fn encode_set(&self, desired: &FeatureValue) -> Option<String> {
        desired.as_volume_tenths().map(|t| self.encode_tenths(t))
    }
}
