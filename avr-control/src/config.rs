//! Connection target configuration
//!
//! The GUI hands the engine a single target string of the form
//! `host[:controlPort[:httpPort[:httpHost]]]`. Equality between parsed
//! configs drives the supervisor's "did the target change" decision on
//! reconfigure.

use serde::{Deserialize, Serialize};

use crate::error::{ControlError, Result};

/// Default control-protocol TCP port.
pub const DEFAULT_CONTROL_PORT: u16 = 23;

/// Default port for the HTTP side channel.
pub const DEFAULT_HTTP_PORT: u16 = 80;

/// Immutable connection target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    pub control_port: u16,
    pub http_port: u16,
    /// Separate host for the HTTP side channel, when it differs.
    pub http_host: Option<String>,
}

impl ConnectionConfig {
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            control_port: DEFAULT_CONTROL_PORT,
            http_port: DEFAULT_HTTP_PORT,
            http_host: None,
        }
    }

    /// Parse a `host[:controlPort[:httpPort[:httpHost]]]` target string.
    pub fn parse(target: &str) -> Result<Self> {
        let mut parts = target.split(':');
        let host = parts.next().unwrap_or_default().trim();
        if host.is_empty() {
            return Err(ControlError::EmptyHost(target.to_string()));
        }
        let mut config = Self::new(host);
        if let Some(port) = parts.next() {
            config.control_port = parse_port(target, port)?;
        }
        if let Some(port) = parts.next() {
            config.http_port = parse_port(target, port)?;
        }
        if let Some(http_host) = parts.next() {
            let http_host = http_host.trim();
            if !http_host.is_empty() {
                config.http_host = Some(http_host.to_string());
            }
        }
        Ok(config)
    }

    /// Socket address string of the control session.
    pub fn control_addr(&self) -> String {
        format!("{}:{}", self.host, self.control_port)
    }

    /// Socket address string of the HTTP side channel.
    pub fn http_addr(&self) -> String {
        let host = self.http_host.as_deref().unwrap_or(&self.host);
        format!("{}:{}", host, self.http_port)
    }
}

fn parse_port(target: &str, port: &str) -> Result<u16> {
    port.trim().parse().map_err(|_| ControlError::InvalidPort {
        target: target.to_string(),
        port: port.to_string(),
    })
}
