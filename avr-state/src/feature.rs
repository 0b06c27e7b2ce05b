//! The FeatureState contract
//!
//! Every controllable or observable aspect of a zone is a feature. A feature
//! knows its outbound command prefix, whether it is queried automatically
//! during reconciliation, and how to mutate itself from an inbound frame
//! whose offset has already been advanced past the matched receive prefix.

use avr_protocol::{Frame, QueryFormat};
use serde::{Deserialize, Serialize};

use crate::value::FeatureValue;

/// Identity tag for a feature within a zone store.
///
/// A store holds at most one feature per tag; the tag doubles as the
/// registry key and the listener key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureTag {
    Power,
    MainZone,
    Mute,
    Volume,
    InputSource,
    SurroundMode,
    QuickSelect,
    ChannelLevel,
    Bass,
    Treble,
    Sleep,
    TunerFrequency,
    TunerPreset,
    DisplayLine,
}

/// One per-feature state holder.
///
/// Implementations must make `update` idempotent-safe: feeding the same
/// encoded value twice in a row returns `false` the second time, so
/// listeners are only notified on real changes.
pub trait FeatureState: Send {
    /// Registry identity of this feature.
    fn tag(&self) -> FeatureTag;

    /// Outbound command prefix.
    fn command_prefix(&self) -> &str;

    /// Inbound receive prefix. Usually equal to the command prefix.
    fn receive_prefix(&self) -> &str {
        self.command_prefix()
    }

    /// How a status query is formed from the command prefix.
    fn query_format(&self) -> QueryFormat {
        QueryFormat::Suffix
    }

    /// Whether this feature is queried automatically during reconciliation.
    fn is_auto_update(&self) -> bool;

    /// Whether commands for secondary zones use the bare zone prefix
    /// instead of `zonePrefix + featurePrefix`.
    fn is_command_secondary_zone_encoded(&self) -> bool {
        false
    }

    /// Mutate from a frame positioned past the receive prefix. Returns
    /// whether the externally visible value changed.
    fn update(&mut self, frame: &mut Frame) -> bool;

    /// Whether a value has ever been received since the last reset.
    fn is_defined(&self) -> bool;

    /// Forget the current value.
    fn reset(&mut self);

    /// Snapshot of the current value.
    fn value(&self) -> FeatureValue;

    /// Encode the wire token that would set this feature to `desired`, or
    /// `None` when the variant does not accept that value shape.
    fn encode_set(&self, desired: &FeatureValue) -> Option<String>;

    /// Known selectable tokens, for selection features. Empty otherwise.
    fn vocabulary(&self) -> &[String] {
        &[]
    }

    /// Merge side-channel tokens into the vocabulary. No-op for
    /// non-selection features.
    fn seed_vocabulary(&mut self, _tokens: Vec<String>) {}
}
