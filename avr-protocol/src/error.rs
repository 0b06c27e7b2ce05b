use thiserror::Error;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors that can occur while building or decoding protocol structures
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Two features registered the same receive prefix
    #[error("duplicate receive prefix {0:?}")]
    DuplicatePrefix(String),

    /// A registered prefix is below the two-character dispatch floor
    #[error("receive prefix {0:?} is shorter than the two-character dispatch floor")]
    PrefixTooShort(String),
}
