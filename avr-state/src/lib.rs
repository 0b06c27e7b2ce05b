//! Per-zone state for the AVR protocol engine
//!
//! The receiver multiplexes up to four logical zones over one TCP link. This
//! crate holds everything that remembers what the receiver last said:
//!
//! - the [`FeatureState`] family — per-feature state holders (power, mute,
//!   volume, input select, surround mode, tone/level, tuner/display)
//! - [`ZoneStateStore`] — the tag-keyed registry of feature states for one
//!   zone, with longest-prefix dispatch and change-suppressed listener
//!   notification
//! - [`StatusFlags`] — the small propositional connectivity state with its
//!   cascade rules, observed through a watch channel
//! - [`CommandBridge`] — the injected outbound send sink, defaulting to a
//!   no-op so a send before connect never crashes
//! - [`ModelProfile`] — the declarative per-model feature tables
//!
//! State is rebuilt by querying the receiver on every connect; nothing here
//! persists across process restarts.

pub mod bridge;
pub mod error;
pub mod feature;
pub mod features;
pub mod logging;
pub mod model;
pub mod status;
pub mod store;
pub mod value;
pub mod zone;

pub use bridge::{CommandBridge, NoopSink, SendCommands};
pub use error::{Result, StateError};
pub use feature::{FeatureState, FeatureTag};
pub use logging::{init_logging, init_logging_from_env, LoggingError, LoggingMode};
pub use model::ModelProfile;
pub use status::{Flag, StatusFlags, StatusTracker};
pub use store::ZoneStateStore;
pub use value::{ChangeEvent, FeatureValue};
pub use zone::Zone;
