//! Connection engine for the AVR control protocol
//!
//! This crate owns everything between the per-zone state layer
//! (`avr-state`) and the socket:
//!
//! - [`ConnectionConfig`] — parsed `host[:port[:httpPort[:httpHost]]]`
//!   target, with equality driving reconfigure decisions
//! - [`CommandQueue`] — bounded outbound FIFO with full-clear overflow
//! - [`TcpTransport`] — one sender and one receiver worker per connection,
//!   enforcing the inter-command delay
//! - [`ReconnectSupervisor`] — connect/disconnect state machine with
//!   exponential backoff and best-effort reachability probing
//! - [`ReceiverCoordinator`] — zone routing, shorthand remapping, and the
//!   post-connect reconciliation cycle
//! - [`ProtocolEngine`] — the assembled facade the GUI holds
//!
//! All network errors are absorbed inside the supervisor and surface only
//! as status-flag transitions; callers never see raw I/O errors from the
//! protocol engine.

pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod queue;
pub mod supervisor;
pub mod transport;

pub use config::{ConnectionConfig, DEFAULT_CONTROL_PORT, DEFAULT_HTTP_PORT};
pub use coordinator::{ReceiverCoordinator, VocabularySeed};
pub use engine::ProtocolEngine;
pub use error::{ControlError, Result};
pub use queue::{CommandQueue, QUEUE_CAPACITY};
pub use supervisor::{
    backoff_delay, max_connect_time, ConnectionEvents, ReconnectSupervisor, SupervisorState,
    BACKOFF_SCHEDULE,
};
pub use transport::{ReceiveFrames, TcpTransport, CONNECT_TIMEOUT, INTER_COMMAND_DELAY};
