//! Feature value snapshots and change events
//!
//! Listeners never see the mutable feature states; they receive cloned
//! [`FeatureValue`] snapshots carried by [`ChangeEvent`]s, one event per
//! externally visible change.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::feature::FeatureTag;
use crate::zone::Zone;

/// Snapshot of one feature's externally visible value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureValue {
    /// The feature has never received a value (or was reset).
    Undefined,
    /// Boolean on/off state.
    Switch(bool),
    /// One-of-N selection, stored as the raw wire token.
    Select(String),
    /// Bounded integer level. The sleep timer reports `OFF` as −1.
    Level(i32),
    /// Multiplexed sub-channel levels, keyed by channel token.
    Levels(BTreeMap<String, i32>),
    /// Volume in absolute tenths after model adjustment.
    Volume(i32),
    /// Onscreen display lines, in line order.
    Display(Vec<String>),
}

impl FeatureValue {
    pub fn is_defined(&self) -> bool {
        !matches!(self, FeatureValue::Undefined)
    }

    pub fn as_switch(&self) -> Option<bool> {
        match self {
            FeatureValue::Switch(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_select(&self) -> Option<&str> {
        match self {
            FeatureValue::Select(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_level(&self) -> Option<i32> {
        match self {
            FeatureValue::Level(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_volume_tenths(&self) -> Option<i32> {
        match self {
            FeatureValue::Volume(t) => Some(*t),
            _ => None,
        }
    }
}

/// Emitted to the registered listener whenever a feature's externally
/// visible value changes.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub zone: Zone,
    pub tag: FeatureTag,
    pub value: FeatureValue,
}

impl ChangeEvent {
    pub fn new(zone: Zone, tag: FeatureTag, value: FeatureValue) -> Self {
        Self { zone, tag, value }
    }
}
