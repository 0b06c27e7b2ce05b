//! Outbound send bridge
//!
//! Feature operations compose wire commands long before a connection
//! exists. The bridge is the injected seam between the state layer and the
//! live transport: it defaults to a no-op sink and is swapped to the
//! command queue on connect and back on disconnect. A send issued
//! concurrently with a reconnect reaches the old sink, the new one, or the
//! no-op, but never crashes.

use std::sync::Arc;

use parking_lot::RwLock;

/// Anything that accepts an outbound command line (without terminator).
pub trait SendCommands: Send + Sync {
    fn send(&self, command: &str);
}

/// Default sink installed while disconnected: drops and logs.
pub struct NoopSink;

impl SendCommands for NoopSink {
    fn send(&self, command: &str) {
        tracing::debug!("dropping command {:?}: not connected", command);
    }
}

/// Atomically swappable reference to the current outbound sink.
pub struct CommandBridge {
    sink: RwLock<Arc<dyn SendCommands>>,
}

impl CommandBridge {
    pub fn new() -> Self {
        Self {
            sink: RwLock::new(Arc::new(NoopSink)),
        }
    }

    /// Install the live sink (called on connect).
    pub fn install(&self, sink: Arc<dyn SendCommands>) {
        *self.sink.write() = sink;
    }

    /// Revert to the no-op sink (called on disconnect).
    pub fn uninstall(&self) {
        *self.sink.write() = Arc::new(NoopSink);
    }

    /// Forward a command to whichever sink is current.
    pub fn send(&self, command: &str) {
        let sink = Arc::clone(&self.sink.read());
        sink.send(command);
    }
}

impl Default for CommandBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Recorder(Mutex<Vec<String>>);

    impl SendCommands for Recorder {
        fn send(&self, command: &str) {
            self.0.lock().push(command.to_string());
        }
    }

    #[test]
    fn send_before_install_is_a_noop() {
        let bridge = CommandBridge::new();
        bridge.send("PW?");
    }

    #[test]
    fn installed_sink_receives_commands() {
        let bridge = CommandBridge::new();
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        bridge.install(recorder.clone());
        bridge.send("MV50");
        assert_eq!(*recorder.0.lock(), ["MV50"]);
    }

    #[test]
    fn uninstall_reverts_to_noop() {
        let bridge = CommandBridge::new();
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        bridge.install(recorder.clone());
        bridge.uninstall();
        bridge.send("MV50");
        assert!(recorder.0.lock().is_empty());
    }
}
