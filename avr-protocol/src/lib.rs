//! Wire-format codec for the AVR control protocol
//!
//! The receiver speaks a line-oriented text protocol over a persistent TCP
//! connection: carriage-return-terminated ASCII/extended-ASCII lines, each
//! starting with a fixed command prefix (`PW`, `MV`, `SI`, ...). This crate
//! holds everything that understands the wire format and nothing that holds
//! state:
//!
//! - [`Frame`] — one protocol line with an active offset for prefix stripping
//! - [`PrefixResolver`] — longest-prefix-match dispatch over registered
//!   receive prefixes
//! - [`LineScanner`] — incremental CR-terminated framing of the inbound byte
//!   stream, including the display-line quirk where a CR can be payload
//! - [`command`] — query formatting and secondary-zone command encoding
//!
//! Higher layers (`avr-state`, `avr-control`) own the per-feature state and
//! the connection lifecycle.

pub mod command;
pub mod error;
pub mod frame;
pub mod resolver;
pub mod scanner;

pub use command::{
    encode_zone_command, encode_zone_query, format_query, QueryFormat, LINE_TERMINATOR,
};
pub use error::{ProtocolError, Result};
pub use frame::{Frame, OFF};
pub use resolver::{PrefixResolver, MIN_PREFIX_LEN};
pub use scanner::{LineScanner, MAX_LINE_LEN};
