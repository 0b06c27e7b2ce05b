//! Top-level engine facade
//!
//! Wires the command bridge, status tracker, coordinator, and supervisor
//! together. The GUI holds one [`ProtocolEngine`] and talks to the
//! coordinator for feature operations, the status subscription for
//! connectivity, and `connect`/`disconnect` for the session lifecycle.

use std::sync::Arc;

use avr_state::{CommandBridge, Flag, ModelProfile, StatusFlags, StatusTracker};
use tokio::sync::watch;

use crate::config::ConnectionConfig;
use crate::coordinator::ReceiverCoordinator;
use crate::error::Result;
use crate::supervisor::ReconnectSupervisor;

/// The assembled protocol engine.
pub struct ProtocolEngine {
    status: Arc<StatusTracker>,
    coordinator: Arc<ReceiverCoordinator>,
    supervisor: ReconnectSupervisor,
}

impl ProtocolEngine {
    pub fn new(profile: ModelProfile) -> Self {
        let status = Arc::new(StatusTracker::new());
        let bridge = Arc::new(CommandBridge::new());
        let coordinator = Arc::new(ReceiverCoordinator::new(
            profile,
            bridge.clone(),
            status.clone(),
        ));
        let supervisor = ReconnectSupervisor::new(
            status.clone(),
            bridge,
            coordinator.clone(),
            coordinator.clone(),
        );
        Self {
            status,
            coordinator,
            supervisor,
        }
    }

    /// Start supervising a target given as `host[:port[:httpPort[:httpHost]]]`.
    pub fn connect(&self, target: &str) -> Result<()> {
        let config = ConnectionConfig::parse(target)?;
        self.supervisor.reconfigure(Some(config));
        Ok(())
    }

    /// Stop the session and clear all connectivity flags.
    pub fn disconnect(&self) {
        self.supervisor.stop();
    }

    pub fn coordinator(&self) -> &Arc<ReceiverCoordinator> {
        &self.coordinator
    }

    pub fn status(&self) -> StatusFlags {
        self.status.get()
    }

    /// Watch connectivity transitions. Duplicate states are suppressed.
    pub fn subscribe_status(&self) -> watch::Receiver<StatusFlags> {
        self.status.subscribe()
    }

    /// GUI toggle for protocol logging.
    pub fn set_logging(&self, enabled: bool) {
        self.status.set(Flag::Logging, enabled);
    }
}

impl Drop for ProtocolEngine {
    fn drop(&mut self) {
        self.supervisor.stop();
    }
}
