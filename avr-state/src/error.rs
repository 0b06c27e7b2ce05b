use thiserror::Error;

use crate::feature::FeatureTag;
use crate::zone::Zone;

/// Result type for state operations
pub type Result<T> = std::result::Result<T, StateError>;

/// Errors that can occur during state management
#[derive(Error, Debug)]
pub enum StateError {
    /// The feature is not registered in this zone's store
    #[error("feature {tag:?} is not registered for {zone:?}")]
    UnknownFeature { zone: Zone, tag: FeatureTag },

    /// The requested operation does not apply to this feature variant
    #[error("feature {tag:?} does not accept value {value}")]
    UnsupportedValue { tag: FeatureTag, value: String },

    /// The zone is not active under the configured model
    #[error("{0:?} is not active for the configured receiver model")]
    ZoneInactive(Zone),
}
