//! Logical receiver zones
//!
//! Zones are a fixed enumeration; they are never created or destroyed at
//! runtime. Only the active count changes, derived from the configured
//! receiver model.

use serde::{Deserialize, Serialize};

use crate::status::Flag;

/// One independently controllable audio output area of the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Zone {
    Main,
    Zone2,
    Zone3,
    Zone4,
}

impl Zone {
    pub const ALL: [Zone; 4] = [Zone::Main, Zone::Zone2, Zone::Zone3, Zone::Zone4];

    /// The first `count` zones, in order. `count` is clamped to 1..=4.
    pub fn active(count: usize) -> &'static [Zone] {
        &Self::ALL[..count.clamp(1, 4)]
    }

    /// Zero-based zone index (Main = 0).
    pub fn index(self) -> usize {
        match self {
            Zone::Main => 0,
            Zone::Zone2 => 1,
            Zone::Zone3 => 2,
            Zone::Zone4 => 3,
        }
    }

    /// Wire command prefix. Empty for the main zone: its commands carry only
    /// the feature prefix.
    pub fn wire_prefix(self) -> &'static str {
        match self {
            Zone::Main => "",
            Zone::Zone2 => "Z2",
            Zone::Zone3 => "Z3",
            Zone::Zone4 => "Z4",
        }
    }

    /// Decode a secondary-zone marker at the start of a line.
    pub fn from_marker(bytes: &[u8]) -> Option<Zone> {
        match bytes {
            [b'Z', b'2', ..] => Some(Zone::Zone2),
            [b'Z', b'3', ..] => Some(Zone::Zone3),
            [b'Z', b'4', ..] => Some(Zone::Zone4),
            _ => None,
        }
    }

    /// The per-zone connected status flag.
    pub fn status_flag(self) -> Flag {
        match self {
            Zone::Main => Flag::Zone1,
            Zone::Zone2 => Flag::Zone2,
            Zone::Zone3 => Flag::Zone3,
            Zone::Zone4 => Flag::Zone4,
        }
    }

    /// Identifier used for GUI tabs and log lines.
    pub fn id(self) -> &'static str {
        match self {
            Zone::Main => "main",
            Zone::Zone2 => "zone2",
            Zone::Zone3 => "zone3",
            Zone::Zone4 => "zone4",
        }
    }

    /// Human-readable name.
    pub fn display_name(self) -> &'static str {
        match self {
            Zone::Main => "Main Zone",
            Zone::Zone2 => "Zone 2",
            Zone::Zone3 => "Zone 3",
            Zone::Zone4 => "Zone 4",
        }
    }
}
