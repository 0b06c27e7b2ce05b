//! Connection lifecycle supervision
//!
//! The supervisor owns the connect/disconnect state machine
//! (`Idle -> Connecting -> Connected -> Closing -> Idle`) and runs exactly
//! one background worker per configured target. Connect failures back off
//! exponentially; a successful connection resets the schedule. All network
//! errors are absorbed here and surface only as status-flag transitions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use avr_state::{CommandBridge, Flag, StatusTracker};
use parking_lot::Mutex;

use crate::config::ConnectionConfig;
use crate::queue::CommandQueue;
use crate::transport::{ReceiveFrames, TcpTransport, CONNECT_TIMEOUT};

/// Backoff schedule between failed connection attempts. The last entry is
/// the cap; further failures keep using it.
pub const BACKOFF_SCHEDULE: [Duration; 5] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
    Duration::from_secs(8),
    Duration::from_secs(16),
];

/// Timeout of the best-effort reachability probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Granularity of cancellable sleeps.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Backoff delay after the given number of consecutive failures.
pub fn backoff_delay(failures: u32) -> Duration {
    let index = (failures as usize).min(BACKOFF_SCHEDULE.len() - 1);
    BACKOFF_SCHEDULE[index]
}

/// Upper bound on the time the supervisor needs to learn whether a target
/// is connectable, derived from the backoff schedule. The GUI uses this for
/// its connection-timeout dialog.
pub fn max_connect_time() -> Duration {
    let backoff: Duration = BACKOFF_SCHEDULE.iter().sum();
    let attempts = BACKOFF_SCHEDULE.len() as u32 + 1;
    backoff + CONNECT_TIMEOUT * attempts
}

/// Sleep in cancellable slices. Returns false when cancelled.
pub(crate) fn sleep_cancellable(duration: Duration, cancel: &AtomicBool) -> bool {
    let mut remaining = duration;
    while remaining > Duration::ZERO {
        if cancel.load(Ordering::Relaxed) {
            return false;
        }
        let slice = remaining.min(SLEEP_SLICE);
        thread::sleep(slice);
        remaining -= slice;
    }
    !cancel.load(Ordering::Relaxed)
}

/// Supervisor lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Idle,
    Connecting,
    Connected,
    Closing,
}

/// Lifecycle notifications consumed by the coordinator.
pub trait ConnectionEvents: Send + Sync {
    /// A control session is up; the queue is the session's outbound path.
    fn connection_established(&self, queue: &Arc<CommandQueue>);
    /// The control session is gone.
    fn connection_lost(&self);
}

struct Worker {
    cancel: Arc<AtomicBool>,
    transport: Arc<Mutex<Option<Arc<TcpTransport>>>>,
    handle: JoinHandle<()>,
}

struct Inner {
    config: Option<ConnectionConfig>,
    worker: Option<Worker>,
}

/// Owns the connection worker and its target.
pub struct ReconnectSupervisor {
    status: Arc<StatusTracker>,
    bridge: Arc<CommandBridge>,
    sink: Arc<dyn ReceiveFrames>,
    events: Arc<dyn ConnectionEvents>,
    state: Arc<Mutex<SupervisorState>>,
    inner: Mutex<Inner>,
}

impl ReconnectSupervisor {
    pub fn new(
        status: Arc<StatusTracker>,
        bridge: Arc<CommandBridge>,
        sink: Arc<dyn ReceiveFrames>,
        events: Arc<dyn ConnectionEvents>,
    ) -> Self {
        Self {
            status,
            bridge,
            sink,
            events,
            state: Arc::new(Mutex::new(SupervisorState::Idle)),
            inner: Mutex::new(Inner {
                config: None,
                worker: None,
            }),
        }
    }

    pub fn state(&self) -> SupervisorState {
        *self.state.lock()
    }

    /// Point the supervisor at a new target.
    ///
    /// A no-op when a worker is already running against the same target.
    /// Otherwise the current worker is stopped, status flags are reset, and
    /// a new worker starts if the target is defined.
    pub fn reconfigure(&self, config: Option<ConnectionConfig>) {
        let mut inner = self.inner.lock();
        if inner.worker.is_some() && inner.config == config {
            tracing::debug!("reconfigure: target unchanged, keeping worker");
            return;
        }
        self.status.reset();
        if let Some(worker) = inner.worker.take() {
            Self::stop_worker(worker);
        }
        inner.config = config.clone();
        if let Some(config) = config {
            tracing::info!("supervising {}", config.control_addr());
            inner.worker = Some(self.spawn_worker(config));
        } else {
            *self.state.lock() = SupervisorState::Idle;
        }
    }

    /// Explicit stop: clear flags, notify disconnected, tear down.
    pub fn stop(&self) {
        let mut inner = self.inner.lock();
        self.status.reset();
        self.events.connection_lost();
        if let Some(worker) = inner.worker.take() {
            Self::stop_worker(worker);
        }
        inner.config = None;
        *self.state.lock() = SupervisorState::Idle;
    }

    fn stop_worker(worker: Worker) {
        worker.cancel.store(true, Ordering::Relaxed);
        if let Some(transport) = worker.transport.lock().as_ref().cloned() {
            transport.stop();
        }
        if worker.handle.join().is_err() {
            tracing::warn!("supervisor worker panicked");
        }
    }

    fn spawn_worker(&self, config: ConnectionConfig) -> Worker {
        let cancel = Arc::new(AtomicBool::new(false));
        let transport = Arc::new(Mutex::new(None));
        let handle = {
            let cancel = cancel.clone();
            let transport = transport.clone();
            let status = self.status.clone();
            let bridge = self.bridge.clone();
            let sink = self.sink.clone();
            let events = self.events.clone();
            let state = self.state.clone();
            thread::Builder::new()
                .name("avr-supervisor".into())
                .spawn(move || {
                    run_worker(config, cancel, transport, status, bridge, sink, events, state);
                })
                .expect("spawn supervisor worker")
        };
        Worker {
            cancel,
            transport,
            handle,
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_worker(
    config: ConnectionConfig,
    cancel: Arc<AtomicBool>,
    transport_slot: Arc<Mutex<Option<Arc<TcpTransport>>>>,
    status: Arc<StatusTracker>,
    bridge: Arc<CommandBridge>,
    sink: Arc<dyn ReceiveFrames>,
    events: Arc<dyn ConnectionEvents>,
    state: Arc<Mutex<SupervisorState>>,
) {
    let addr = config.control_addr();
    let mut failures: u32 = 0;
    while !cancel.load(Ordering::Relaxed) {
        *state.lock() = SupervisorState::Connecting;
        status.set(Flag::Reachable, probe(&addr));

        let queue = Arc::new(CommandQueue::new());
        match TcpTransport::connect(&addr, queue.clone(), sink.clone()) {
            Ok(transport) => {
                failures = 0;
                let transport = Arc::new(transport);
                *transport_slot.lock() = Some(transport.clone());
                bridge.install(queue.clone());
                *state.lock() = SupervisorState::Connected;
                status.set(Flag::Connected, true);
                events.connection_established(&queue);

                transport.wait_closed();

                *state.lock() = SupervisorState::Closing;
                bridge.uninstall();
                transport_slot.lock().take();
                transport.stop();
                status.set(Flag::Connected, false);
                events.connection_lost();
                if cancel.load(Ordering::Relaxed) {
                    break;
                }
                // a peer that accepts and immediately drops (control slot
                // held elsewhere) must not turn into a tight reconnect loop
                if !sleep_cancellable(backoff_delay(0), &cancel) {
                    break;
                }
                status.set(Flag::Reachable, probe(&addr));
                continue;
            }
            Err(e) => {
                tracing::debug!("connect to {} failed: {}", addr, e);
                status.set(Flag::Connected, false);
            }
        }

        let delay = backoff_delay(failures);
        failures = failures.saturating_add(1);
        tracing::debug!("retrying {} in {:?}", addr, delay);
        if !sleep_cancellable(delay, &cancel) {
            break;
        }
    }
    *state.lock() = SupervisorState::Idle;
    tracing::debug!("supervisor worker for {} stopped", addr);
}

/// Best-effort liveness check, never authoritative.
fn probe(addr: &str) -> bool {
    use std::net::ToSocketAddrs;
    let Some(socket_addr) = addr.to_socket_addrs().ok().and_then(|mut a| a.next()) else {
        return false;
    };
    std::net::TcpStream::connect_timeout(&socket_addr, PROBE_TIMEOUT).is_ok()
}
