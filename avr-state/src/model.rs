//! Per-model feature tables
//!
//! A [`ModelProfile`] is the declarative description of one receiver model:
//! how many zones it drives, the additive volume adjustment its firmware
//! applies, and the input sources it ships with. The profile builds the
//! zone stores; the tables below are the single place where wire prefixes
//! and feature shapes are wired together.

use std::sync::Arc;

use avr_protocol::QueryFormat;

use crate::bridge::CommandBridge;
use crate::feature::{FeatureState, FeatureTag};
use crate::features::{
    ChannelLevelState, DisplayState, LevelState, SelectState, SwitchState, VolumeState,
};
use crate::store::ZoneStateStore;
use crate::zone::Zone;

const SURROUND_MODES: &[&str] = &[
    "DIRECT",
    "PURE DIRECT",
    "STEREO",
    "STANDARD",
    "DOLBY DIGITAL",
    "DTS SURROUND",
    "MCH STEREO",
    "ROCK ARENA",
    "JAZZ CLUB",
    "MONO MOVIE",
    "MATRIX",
    "VIDEO GAME",
    "VIRTUAL",
];

const QUICK_SELECTS: &[&str] = &["1", "2", "3", "4", "5"];

const DEFAULT_INPUTS: &[&str] = &[
    "PHONO", "CD", "TUNER", "DVD", "BD", "TV", "SAT/CBL", "GAME", "AUX1", "NET", "USB/IPOD",
];

/// Declarative description of one receiver model.
#[derive(Debug, Clone)]
pub struct ModelProfile {
    name: String,
    zone_count: usize,
    volume_adjust_tenths: i32,
    plain_sleep: bool,
    inputs: Vec<String>,
}

impl ModelProfile {
    pub fn new(name: &str, zone_count: usize) -> Self {
        Self {
            name: name.to_string(),
            zone_count: zone_count.clamp(1, 4),
            volume_adjust_tenths: 0,
            plain_sleep: false,
            inputs: DEFAULT_INPUTS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// A two-zone profile with no volume adjustment.
    pub fn generic() -> Self {
        Self::new("generic", 2)
    }

    /// Additive tenths adjustment applied to every wire volume value.
    pub fn with_volume_adjust(mut self, tenths: i32) -> Self {
        self.volume_adjust_tenths = tenths;
        self
    }

    /// Send the sleep timer without zero padding (`SLP30` instead of
    /// `SLP030`). Model-specific firmware quirk.
    pub fn with_plain_sleep(mut self) -> Self {
        self.plain_sleep = true;
        self
    }

    /// Replace the input source vocabulary.
    pub fn with_inputs(mut self, inputs: &[&str]) -> Self {
        self.inputs = inputs.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The zones this model drives, main zone first.
    pub fn zones(&self) -> &'static [Zone] {
        Zone::active(self.zone_count)
    }

    pub fn volume_adjust_tenths(&self) -> i32 {
        self.volume_adjust_tenths
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    fn input_refs(&self) -> Vec<&str> {
        self.inputs.iter().map(String::as_str).collect()
    }

    /// The full main-zone feature table.
    pub fn main_zone_features(&self) -> Vec<Box<dyn FeatureState>> {
        let inputs = self.input_refs();
        let mut sleep = LevelState::new(FeatureTag::Sleep, "SLP", 120).with_off_sentinel();
        if self.plain_sleep {
            sleep = sleep.plain_encoded();
        }
        vec![
            Box::new(SwitchState::new(FeatureTag::Power, "PW", "ON", "STANDBY")),
            Box::new(SwitchState::new(FeatureTag::MainZone, "ZM", "ON", "OFF").zone_encoded()),
            Box::new(SwitchState::new(FeatureTag::Mute, "MU", "ON", "OFF")),
            Box::new(VolumeState::new(
                FeatureTag::Volume,
                "MV",
                self.volume_adjust_tenths,
            )),
            Box::new(SelectState::new(FeatureTag::InputSource, "SI", &inputs).zone_encoded()),
            Box::new(SelectState::new(
                FeatureTag::SurroundMode,
                "MS",
                SURROUND_MODES,
            )),
            Box::new(
                SelectState::new(FeatureTag::QuickSelect, "MSQUICK", QUICK_SELECTS)
                    .on_demand()
                    .zone_encoded(),
            ),
            Box::new(ChannelLevelState::new(FeatureTag::ChannelLevel, "CV", 99)),
            Box::new(
                LevelState::new(FeatureTag::Bass, "PSBAS", 99)
                    .with_query_format(QueryFormat::SpaceSuffix),
            ),
            Box::new(
                LevelState::new(FeatureTag::Treble, "PSTRE", 99)
                    .with_query_format(QueryFormat::SpaceSuffix),
            ),
            Box::new(sleep),
            Box::new(
                LevelState::new(FeatureTag::TunerFrequency, "TFAN", 999_999)
                    .with_width(6)
                    .on_demand(),
            ),
            Box::new(SelectState::new(FeatureTag::TunerPreset, "TPAN", &[]).on_demand()),
            Box::new(DisplayState::new(FeatureTag::DisplayLine, "NSE")),
        ]
    }

    /// The reduced feature table shared by every secondary zone.
    ///
    /// Receive prefixes here are the canonical ones; the coordinator strips
    /// the `Z2`/`Z3`/`Z4` marker and remaps shorthand replies before the
    /// store sees the line.
    pub fn secondary_zone_features(&self) -> Vec<Box<dyn FeatureState>> {
        let inputs = self.input_refs();
        vec![
            Box::new(SwitchState::new(FeatureTag::MainZone, "ZM", "ON", "OFF").zone_encoded()),
            Box::new(SwitchState::new(FeatureTag::Mute, "MU", "ON", "OFF")),
            Box::new(VolumeState::new(
                FeatureTag::Volume,
                "MV",
                self.volume_adjust_tenths,
            )),
            Box::new(SelectState::new(FeatureTag::InputSource, "SI", &inputs).zone_encoded()),
            Box::new(
                SelectState::new(FeatureTag::QuickSelect, "MSQUICK", QUICK_SELECTS)
                    .on_demand()
                    .zone_encoded(),
            ),
        ]
    }

    fn features_for(&self, zone: Zone) -> Vec<Box<dyn FeatureState>> {
        match zone {
            Zone::Main => self.main_zone_features(),
            _ => self.secondary_zone_features(),
        }
    }

    /// Build one store per active zone, all sharing the command bridge.
    pub fn build_stores(&self, bridge: &Arc<CommandBridge>) -> Vec<ZoneStateStore> {
        self.zones()
            .iter()
            .map(|&zone| ZoneStateStore::new(zone, self.features_for(zone), bridge.clone()))
            .collect()
    }
}

impl Default for ModelProfile {
    fn default() -> Self {
        Self::generic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FeatureValue;
    use avr_protocol::Frame;

    #[test]
    fn generic_profile_has_two_zones() {
        let profile = ModelProfile::generic();
        assert_eq!(profile.zones(), &[Zone::Main, Zone::Zone2]);
    }

    #[test]
    fn zone_count_is_clamped() {
        assert_eq!(ModelProfile::new("x", 0).zones().len(), 1);
        assert_eq!(ModelProfile::new("x", 9).zones().len(), 4);
    }

    #[test]
    fn stores_cover_every_active_zone() {
        let bridge = Arc::new(CommandBridge::new());
        let stores = ModelProfile::new("x", 3).build_stores(&bridge);
        let zones: Vec<Zone> = stores.iter().map(|s| s.zone()).collect();
        assert_eq!(zones, vec![Zone::Main, Zone::Zone2, Zone::Zone3]);
    }

    #[test]
    fn main_zone_table_builds_a_valid_store() {
        // construction panics on any receive prefix collision
        let bridge = Arc::new(CommandBridge::new());
        let mut store = ZoneStateStore::new(
            Zone::Main,
            ModelProfile::generic().main_zone_features(),
            bridge,
        );
        let event = store.update(&mut Frame::from("MSQUICK3")).unwrap();
        assert_eq!(event.tag, FeatureTag::QuickSelect);
        let event = store.update(&mut Frame::from("SLPOFF")).unwrap();
        assert_eq!(event.value, FeatureValue::Level(avr_protocol::OFF));
    }

    #[test]
    fn secondary_zone_table_builds_a_valid_store() {
        let bridge = Arc::new(CommandBridge::new());
        let mut store = ZoneStateStore::new(
            Zone::Zone2,
            ModelProfile::generic().secondary_zone_features(),
            bridge,
        );
        // the coordinator delivers canonical lines, marker already stripped
        let event = store.update(&mut Frame::from("ZMON")).unwrap();
        assert_eq!(event.tag, FeatureTag::MainZone);
        let event = store.update(&mut Frame::from("MV40")).unwrap();
        assert_eq!(event.value, FeatureValue::Volume(40));
    }

    #[test]
    fn volume_adjust_flows_into_the_store() {
        let bridge = Arc::new(CommandBridge::new());
        let profile = ModelProfile::new("x", 1).with_volume_adjust(5);
        let mut store =
            ZoneStateStore::new(Zone::Main, profile.main_zone_features(), bridge);
        store.update(&mut Frame::from("MV500"));
        assert_eq!(
            store.value(FeatureTag::Volume).unwrap(),
            FeatureValue::Volume(505)
        );
    }

    #[test]
    fn sleep_formatting_rule_follows_the_profile() {
        use crate::bridge::SendCommands;
        use parking_lot::Mutex;

        struct Recorder(Mutex<Vec<String>>);
        impl SendCommands for Recorder {
            fn send(&self, command: &str) {
                self.0.lock().push(command.to_string());
            }
        }

        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let bridge = Arc::new(CommandBridge::new());
        bridge.install(recorder.clone());

        let padded = ZoneStateStore::new(
            Zone::Main,
            ModelProfile::new("x", 1).main_zone_features(),
            bridge.clone(),
        );
        padded.set_level(FeatureTag::Sleep, 30).unwrap();
        let plain = ZoneStateStore::new(
            Zone::Main,
            ModelProfile::new("x", 1).with_plain_sleep().main_zone_features(),
            bridge,
        );
        plain.set_level(FeatureTag::Sleep, 30).unwrap();

        assert_eq!(*recorder.0.lock(), ["SLP030", "SLP30"]);
    }

    #[test]
    fn custom_inputs_replace_the_default_vocabulary() {
        let bridge = Arc::new(CommandBridge::new());
        let profile = ModelProfile::new("x", 1).with_inputs(&["CD", "TAPE"]);
        let store = ZoneStateStore::new(Zone::Main, profile.main_zone_features(), bridge);
        let vocab = store.vocabulary(FeatureTag::InputSource).unwrap();
        assert_eq!(vocab, vec!["CD".to_string(), "TAPE".to_string()]);
    }
}
