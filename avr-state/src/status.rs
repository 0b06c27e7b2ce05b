//! Connectivity status flags
//!
//! A small propositional state observed by the GUI: is the receiver
//! reachable on the network, is the control session connected, is it
//! powered, which zones are up. The flags cascade — powering on implies a
//! live session, losing reachability takes everything down — and the
//! cascade is an explicit table so it can be tested directly.
//!
//! Observation goes through a `tokio::sync::watch` channel with structural
//! equality suppression: setting a flag to its current value notifies
//! nobody.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// One named status flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flag {
    /// The host answers on the network (best-effort probe).
    Reachable,
    /// The control session is established.
    Connected,
    /// The receiver reports main power on.
    Power,
    /// Per-zone connected flags.
    Zone1,
    Zone2,
    Zone3,
    Zone4,
    /// Protocol logging is enabled (GUI toggle).
    Logging,
}

/// The full flag set. Equality is structural; duplicate states are
/// suppressed before notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusFlags {
    pub reachable: bool,
    pub connected: bool,
    pub power: bool,
    pub zones: [bool; 4],
    pub logging: bool,
}

impl StatusFlags {
    pub fn get(&self, flag: Flag) -> bool {
        match flag {
            Flag::Reachable => self.reachable,
            Flag::Connected => self.connected,
            Flag::Power => self.power,
            Flag::Zone1 => self.zones[0],
            Flag::Zone2 => self.zones[1],
            Flag::Zone3 => self.zones[2],
            Flag::Zone4 => self.zones[3],
            Flag::Logging => self.logging,
        }
    }

    fn set_one(&mut self, flag: Flag, value: bool) {
        match flag {
            Flag::Reachable => self.reachable = value,
            Flag::Connected => self.connected = value,
            Flag::Power => self.power = value,
            Flag::Zone1 => self.zones[0] = value,
            Flag::Zone2 => self.zones[1] = value,
            Flag::Zone3 => self.zones[2] = value,
            Flag::Zone4 => self.zones[3] = value,
            Flag::Logging => self.logging = value,
        }
    }
}

/// The side effects of setting one flag, including the flag itself.
///
/// Power on implies the session is up and the host reachable. Losing the
/// session or reachability takes power and every zone down with it.
pub fn cascade(flag: Flag, value: bool) -> Vec<(Flag, bool)> {
    match (flag, value) {
        (Flag::Power, true) => vec![
            (Flag::Power, true),
            (Flag::Connected, true),
            (Flag::Reachable, true),
        ],
        (Flag::Connected, true) => vec![(Flag::Connected, true), (Flag::Reachable, true)],
        (Flag::Connected, false) => vec![
            (Flag::Connected, false),
            (Flag::Power, false),
            (Flag::Zone1, false),
            (Flag::Zone2, false),
            (Flag::Zone3, false),
            (Flag::Zone4, false),
        ],
        (Flag::Reachable, false) => vec![
            (Flag::Reachable, false),
            (Flag::Connected, false),
            (Flag::Power, false),
            (Flag::Zone1, false),
            (Flag::Zone2, false),
            (Flag::Zone3, false),
            (Flag::Zone4, false),
        ],
        (flag, value) => vec![(flag, value)],
    }
}

/// Owns the current flag state and its watch channel.
pub struct StatusTracker {
    tx: watch::Sender<StatusFlags>,
}

impl StatusTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(StatusFlags::default());
        Self { tx }
    }

    /// Apply a flag change with its cascade. Returns whether anything
    /// actually changed; watchers are only notified on change.
    pub fn set(&self, flag: Flag, value: bool) -> bool {
        self.tx.send_if_modified(|flags| {
            let before = *flags;
            for (f, v) in cascade(flag, value) {
                flags.set_one(f, v);
            }
            *flags != before
        })
    }

    /// Current snapshot.
    pub fn get(&self) -> StatusFlags {
        *self.tx.borrow()
    }

    /// Subscribe to flag transitions.
    pub fn subscribe(&self) -> watch::Receiver<StatusFlags> {
        self.tx.subscribe()
    }

    /// Clear everything except the logging toggle (explicit stop sequence).
    pub fn reset(&self) -> bool {
        self.tx.send_if_modified(|flags| {
            let before = *flags;
            *flags = StatusFlags {
                logging: flags.logging,
                ..StatusFlags::default()
            };
            *flags != before
        })
    }
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}
