//! Per-zone feature registry
//!
//! A [`ZoneStateStore`] owns the feature states for one logical zone in
//! insertion order, at most one per [`FeatureTag`]. Construction builds the
//! prefix resolver and rejects receive-prefix collisions outright: a
//! collision is a configuration defect that would silently misroute
//! traffic, so it stops initialization instead of being recovered from.
//!
//! Inbound frames are resolved by longest-prefix match, the offset is
//! advanced past the matched receive prefix, and the single registered
//! listener for that feature is notified only when the externally visible
//! value changed.

use std::collections::HashMap;
use std::sync::mpsc::Sender;
use std::sync::Arc;

use avr_protocol::{encode_zone_command, encode_zone_query, Frame, PrefixResolver};

use crate::bridge::CommandBridge;
use crate::error::{Result, StateError};
use crate::feature::{FeatureState, FeatureTag};
use crate::value::{ChangeEvent, FeatureValue};
use crate::zone::Zone;

/// Feature states and listeners for one zone.
pub struct ZoneStateStore {
    zone: Zone,
    features: Vec<Box<dyn FeatureState>>,
    index: HashMap<FeatureTag, usize>,
    resolver: PrefixResolver<FeatureTag>,
    listeners: HashMap<FeatureTag, Sender<ChangeEvent>>,
    bridge: Arc<CommandBridge>,
}

impl ZoneStateStore {
    /// Build the store for a zone from its feature set.
    ///
    /// Panics when two features share a receive prefix or a tag. Both are
    /// programming defects in the model tables, not runtime conditions.
    pub fn new(zone: Zone, features: Vec<Box<dyn FeatureState>>, bridge: Arc<CommandBridge>) -> Self {
        let mut index = HashMap::new();
        let mut resolver = PrefixResolver::new();
        for (i, feature) in features.iter().enumerate() {
            let tag = feature.tag();
            if index.insert(tag, i).is_some() {
                panic!("{:?}: feature {:?} registered twice", zone, tag);
            }
            if let Err(e) = resolver.register(feature.receive_prefix(), tag) {
                panic!("{:?}: {}", zone, e);
            }
        }
        Self {
            zone,
            features,
            index,
            resolver,
            listeners: HashMap::new(),
            bridge,
        }
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    /// Tags in registration order.
    pub fn tags(&self) -> impl Iterator<Item = FeatureTag> + '_ {
        self.features.iter().map(|f| f.tag())
    }

    fn feature(&self, tag: FeatureTag) -> Result<&dyn FeatureState> {
        self.index
            .get(&tag)
            .map(|&i| self.features[i].as_ref())
            .ok_or(StateError::UnknownFeature {
                zone: self.zone,
                tag,
            })
    }

    fn feature_mut(&mut self, tag: FeatureTag) -> Result<&mut Box<dyn FeatureState>> {
        let zone = self.zone;
        match self.index.get(&tag) {
            Some(&i) => Ok(&mut self.features[i]),
            None => Err(StateError::UnknownFeature { zone, tag }),
        }
    }

    // ========================================================================
    // Inbound
    // ========================================================================

    /// Route an inbound frame to the feature owning its longest matching
    /// receive prefix.
    ///
    /// Returns the change event if the value changed; the registered
    /// listener has already been notified. An unmatched frame is logged and
    /// discarded, never an error.
    pub fn update(&mut self, frame: &mut Frame) -> Option<ChangeEvent> {
        let Some((tag, matched)) = self.resolver.find(frame) else {
            tracing::info!("{}: unrecognized frame {:?}", self.zone.id(), frame);
            return None;
        };
        frame.advance(matched);
        let i = self.index[&tag];
        if !self.features[i].update(frame) {
            return None;
        }
        let event = ChangeEvent::new(self.zone, tag, self.features[i].value());
        self.notify(tag, &event);
        Some(event)
    }

    fn notify(&self, tag: FeatureTag, event: &ChangeEvent) {
        if let Some(tx) = self.listeners.get(&tag) {
            if tx.send(event.clone()).is_err() {
                tracing::debug!("{}: listener for {:?} is gone", self.zone.id(), tag);
            }
        }
    }

    // ========================================================================
    // Reconciliation hooks
    // ========================================================================

    /// Reset every feature passing the filter; auto-update features are
    /// re-queried and their listeners see the now-undefined value.
    pub fn init_state(&mut self, filter: impl Fn(FeatureTag) -> bool) {
        let zone = self.zone;
        for i in 0..self.features.len() {
            let tag = self.features[i].tag();
            if !filter(tag) {
                continue;
            }
            self.features[i].reset();
            if self.features[i].is_auto_update() {
                self.query_feature(self.features[i].as_ref());
                self.notify(tag, &ChangeEvent::new(zone, tag, FeatureValue::Undefined));
            }
        }
    }

    /// Re-query every auto-update feature passing the filter that is still
    /// undefined. Logs an error per feature; used to catch dropped initial
    /// responses.
    pub fn check_defined(&self, filter: impl Fn(FeatureTag) -> bool) -> usize {
        let mut missing = 0;
        for feature in &self.features {
            let tag = feature.tag();
            if !filter(tag) || !feature.is_auto_update() || feature.is_defined() {
                continue;
            }
            tracing::error!(
                "{}: {:?} still undefined, querying again",
                self.zone.id(),
                tag
            );
            self.query_feature(feature.as_ref());
            missing += 1;
        }
        missing
    }

    /// Reset matching features without querying or notifying.
    pub fn reset_state(&mut self, filter: impl Fn(FeatureTag) -> bool) {
        for feature in &mut self.features {
            if filter(feature.tag()) {
                feature.reset();
            }
        }
    }

    /// Re-send the current value of every defined feature to its listener.
    pub fn notify_listener(&self) {
        for feature in &self.features {
            if feature.is_defined() {
                let tag = feature.tag();
                self.notify(tag, &ChangeEvent::new(self.zone, tag, feature.value()));
            }
        }
    }

    /// Reset all features and drop all listeners.
    pub fn clear_state_and_listener(&mut self) {
        self.reset_state(|_| true);
        self.listeners.clear();
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    /// Register the listener for a feature, replacing any prior one. An
    /// undefined feature is queried immediately so the listener gets a
    /// value as soon as the receiver answers.
    pub fn register_listener(&mut self, tag: FeatureTag, tx: Sender<ChangeEvent>) -> Result<()> {
        let defined = self.feature(tag)?.is_defined();
        self.listeners.insert(tag, tx);
        if !defined {
            self.query(tag)?;
        }
        Ok(())
    }

    pub fn unregister_listener(&mut self, tag: FeatureTag) {
        self.listeners.remove(&tag);
    }

    // ========================================================================
    // Queries and commands
    // ========================================================================

    fn query_feature(&self, feature: &dyn FeatureState) {
        let line = encode_zone_query(
            self.zone.wire_prefix(),
            feature.command_prefix(),
            feature.query_format(),
            feature.is_command_secondary_zone_encoded(),
        );
        self.bridge.send(&line);
    }

    /// Issue a status query for one feature.
    pub fn query(&self, tag: FeatureTag) -> Result<()> {
        self.query_feature(self.feature(tag)?);
        Ok(())
    }

    fn send_set(&self, feature: &dyn FeatureState, desired: &FeatureValue) -> Result<()> {
        let token = feature
            .encode_set(desired)
            .ok_or_else(|| StateError::UnsupportedValue {
                tag: feature.tag(),
                value: format!("{:?}", desired),
            })?;
        let line = encode_zone_command(
            self.zone.wire_prefix(),
            feature.command_prefix(),
            &token,
            feature.is_command_secondary_zone_encoded(),
        );
        self.bridge.send(&line);
        Ok(())
    }

    /// Set a switch feature, then re-query it. Some receivers echo the new
    /// state late or not at all; the follow-up query closes the gap.
    pub fn set_switch(&self, tag: FeatureTag, on: bool) -> Result<()> {
        let feature = self.feature(tag)?;
        self.send_set(feature, &FeatureValue::Switch(on))?;
        self.query_feature(feature);
        Ok(())
    }

    /// Toggle a switch feature. An undefined switch is treated as off.
    pub fn switch(&self, tag: FeatureTag) -> Result<()> {
        let current = self.feature(tag)?.value().as_switch().unwrap_or(false);
        self.set_switch(tag, !current)
    }

    /// Select a token; sends only when it differs from the current value.
    pub fn select(&self, tag: FeatureTag, token: &str) -> Result<()> {
        let feature = self.feature(tag)?;
        if feature.value().as_select() == Some(token) {
            return Ok(());
        }
        self.send_set(feature, &FeatureValue::Select(token.to_string()))
    }

    /// Set a single-value level feature.
    pub fn set_level(&self, tag: FeatureTag, value: i32) -> Result<()> {
        self.send_set(self.feature(tag)?, &FeatureValue::Level(value))
    }

    /// Set one sub-channel of a multiplexed level feature.
    pub fn set_channel_level(&self, tag: FeatureTag, key: &str, value: i32) -> Result<()> {
        let mut map = std::collections::BTreeMap::new();
        map.insert(key.to_string(), value);
        self.send_set(self.feature(tag)?, &FeatureValue::Levels(map))
    }

    /// Set a volume feature, in tenths.
    pub fn set_volume(&self, tag: FeatureTag, tenths: i32) -> Result<()> {
        self.send_set(self.feature(tag)?, &FeatureValue::Volume(tenths))
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn value(&self, tag: FeatureTag) -> Result<FeatureValue> {
        Ok(self.feature(tag)?.value())
    }

    pub fn is_defined(&self, tag: FeatureTag) -> Result<bool> {
        Ok(self.feature(tag)?.is_defined())
    }

    /// Selectable tokens of a selection feature.
    pub fn vocabulary(&self, tag: FeatureTag) -> Result<Vec<String>> {
        Ok(self.feature(tag)?.vocabulary().to_vec())
    }

    /// Seed a selection feature's vocabulary from the side channel.
    pub fn seed_vocabulary(&mut self, tag: FeatureTag, tokens: Vec<String>) -> Result<()> {
        self.feature_mut(tag)?.seed_vocabulary(tokens);
        Ok(())
    }

    /// Number of auto-update features still undefined.
    pub fn undefined_auto_count(&self) -> usize {
        self.features
            .iter()
            .filter(|f| f.is_auto_update() && !f.is_defined())
            .count()
    }
}
