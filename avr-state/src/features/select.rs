//! One-of-N selection features
//!
//! Input select, surround mode, quick select and the tuner sub-states all
//! store the last raw wire token. The vocabulary is either fixed or
//! model-derived; the HTTP side channel may seed additional entries before
//! the first connect.

use avr_protocol::{Frame, QueryFormat};

use crate::feature::{FeatureState, FeatureTag};
use crate::value::FeatureValue;

/// A feature holding one token out of a vocabulary.
#[derive(Debug)]
pub struct SelectState {
    tag: FeatureTag,
    prefix: &'static str,
    vocabulary: Vec<String>,
    query_format: QueryFormat,
    auto_update: bool,
    zone_encoded: bool,
    current: Option<String>,
}

impl SelectState {
    pub fn new(tag: FeatureTag, prefix: &'static str, vocabulary: &[&str]) -> Self {
        Self {
            tag,
            prefix,
            vocabulary: vocabulary.iter().map(|s| s.to_string()).collect(),
            query_format: QueryFormat::Suffix,
            auto_update: true,
            zone_encoded: false,
            current: None,
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

    pub fn with_query_format(mut self, format: QueryFormat) -> Self {
        self.query_format = format;
        self
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }
}

impl FeatureState for SelectState {
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

    fn is_command_secondary_zone_encoded(&self) -> bool {
        self.zone_encoded
    }

    fn update(&mut self, frame: &mut Frame) -> bool {
        let token = frame.text().trim().to_string();
        if token.is_empty() {
            tracing::warn!("{:?}: empty selection token", self.tag);
            return false;
        }
        if self.current.as_deref() == Some(token.as_str()) {
            return false;
        }
        self.current = Some(token);
        true
    }

    fn is_defined(&self) -> bool {
        self.current.is_some()
    }

    fn reset(&mut self) {
        self.current = None;
    }

    fn value(&self) -> FeatureValue {
        match &self.current {
            Some(token) => FeatureValue::Select(token.clone()),
            None => FeatureValue::Undefined,
        }
    }

    fn encode_set(&self, desired: &FeatureValue) -> Option<String> {
        desired.as_select().map(str::to_string)
    }

    fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    /// Seeding from the HTTP side channel only ever adds entries; the TCP
    /// protocol stays authoritative for the current value.
    fn seed_vocabulary(&mut self, tokens: Vec<String>) {
        for token in tokens {
            if !self.vocabulary.iter().any(|t| *t == token) {
                self.vocabulary.push(token);
            }
        }
    }
}
