//! Concrete FeatureState variants
//!
//! Five families cover the whole protocol surface: boolean switches,
//! one-of-N selections, bounded integer levels (single or multiplexed),
//! the volume special case, and the onscreen display lines.

mod display;
mod level;
mod select;
mod switch;
mod volume;

pub use display::DisplayState;
pub use level::{ChannelLevelState, LevelState};
pub use select::SelectState;
pub use switch::SwitchState;
pub use volume::{VolumeDisplay, VolumeState, VOLUME_REFERENCE_TENTHS};
