//! Boolean on/off features
//!
//! Power uses `ON`/`STANDBY` on the wire; everything else uses `ON`/`OFF`.

use avr_protocol::Frame;

use crate::feature::{FeatureState, FeatureTag};
use crate::value::FeatureValue;

/// A feature with distinct on/off wire tokens.
#[derive(Debug)]
pub struct SwitchState {
    tag: FeatureTag,
    prefix: &'static str,
    on_token: &'static str,
    off_token: &'static str,
    auto_update: bool,
    zone_encoded: bool,
    state: Option<bool>,
}

impl SwitchState {
    pub fn new(
        tag: FeatureTag,
        prefix: &'static str,
        on_token: &'static str,
        off_token: &'static str,
    ) -> Self {
        Self {
            tag,
            prefix,
            on_token,
            off_token,
            auto_update: true,
            zone_encoded: false,
            state: None,
        }
    }

    pub fn zone_encoded(mut self) -> Self {
        self.zone_encoded = true;
        self
    }

    pub fn on_demand(mut self) -> Self {
        self.auto_update = false;
        self
    }

    pub fn token_for(&self, on: bool) -> &'static str {
        if on {
            self.on_token
        } else {
            self.off_token
        }
    }
}

impl FeatureState for SwitchState {
    fn tag(&self) -> FeatureTag {
        self.tag
    }

    fn command_prefix(&self) -> &str {
        self.prefix
    }

    fn is_auto_update(&self) -> bool {
        self.auto_update
    }

    fn is_command_secondary_zone_encoded(&self) -> bool {
        self.zone_encoded
    }

    fn update(&mut self, frame: &mut Frame) -> bool {
        let text = frame.text();
        let token = text.trim();
        let new = if token == self.on_token {
            true
        } else if token == self.off_token {
            false
        } else {
            tracing::warn!("{:?}: unrecognized switch token {:?}", self.tag, token);
            return false;
        };
        let changed = self.state != Some(new);
        self.state = Some(new);
        changed
    }

    fn is_defined(&self) -> bool {
        self.state.is_some()
    }

    fn reset(&mut self) {
        self.state = None;
    }

    fn value(&self) -> FeatureValue {
        match self.state {
            Some(on) => FeatureValue::Switch(on),
            None => FeatureValue::Undefined,
        }
    }

    fn encode_set(&self, desired: &FeatureValue) -> Option<String> {
        let on = desired.as_switch()?;
        Some(self.token_for(on).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mute() -> SwitchState {
        SwitchState::new(FeatureTag::Mute, "MU", "ON", "OFF")
    }

    #[test]
    fn update_parses_tokens() {
        let mut s = mute();
        assert!(!s.is_defined());
        assert!(s.update(&mut Frame::from("ON")));
        assert_eq!(s.value(), FeatureValue::Switch(true));
        assert!(s.update(&mut Frame::from("OFF")));
        assert_eq!(s.value(), FeatureValue::Switch(false));
    }

    #[test]
    fn repeated_update_reports_no_change() {
        let mut s = mute();
        assert!(s.update(&mut Frame::from("ON")));
        assert!(!s.update(&mut Frame::from("ON")));
    }

    #[test]
    fn unknown_token_is_ignored() {
        let mut s = mute();
        assert!(!s.update(&mut Frame::from("MAYBE")));
        assert!(!s.is_defined());
    }

    #[test]
    fn power_tokens_differ() {
        let mut s = SwitchState::new(FeatureTag::Power, "PW", "ON", "STANDBY");
        assert!(s.update(&mut Frame::from("STANDBY")));
        assert_eq!(s.value(), FeatureValue::Switch(false));
        assert_eq!(s.encode_set(&FeatureValue::Switch(false)).unwrap(), "STANDBY");
    }

    #[test]
    fn reset_forgets_value() {
        let mut s = mute();
        s.update(&mut Frame::from("ON"));
        s.reset();
        assert!(!s.is_defined());
        assert_eq!(s.value(), FeatureValue::Undefined);
        // a repeated token after reset counts as a change again
        assert!(s.update(&mut Frame::from("ON")));
    }

    #[test]
    fn encode_set_rejects_foreign_values() {
        let s = mute();
        assert!(s.encode_set(&FeatureValue::Level(3)).is_none());
    }
}
