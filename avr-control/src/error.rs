use thiserror::Error;

use avr_state::StateError;

/// Result type for control operations
pub type Result<T> = std::result::Result<T, ControlError>;

/// Errors that can occur in the connection engine
///
/// Network-layer failures never appear here: they are absorbed by the
/// reconnect supervisor and surface only as status-flag transitions.
#[derive(Error, Debug)]
pub enum ControlError {
    /// The connection target string has no host part
    #[error("connection target {0:?} has no host")]
    EmptyHost(String),

    /// A port field in the connection target is not a valid port number
    #[error("invalid port {port:?} in connection target {target:?}")]
    InvalidPort { target: String, port: String },

    /// A state operation failed (unknown feature, inactive zone, ...)
    #[error(transparent)]
    State(#[from] StateError),
}
