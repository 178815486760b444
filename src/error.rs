//! Error types for the C&C protocol
//!
//! Two taxonomies live here:
//! - [`CodecError`]: wire-level failures raised by the command and response
//!   codecs. Local, synchronous and never retried by the codec itself.
//! - [`CncError`]: crate-wide failures (I/O, configuration, transport) that
//!   wrap codec errors when they cross a network boundary.
//!
//! Failures of an executed command are neither. They travel as data in a
//! [`ResponsePacket`](crate::protocol::ResponsePacket).

use thiserror::Error;

/// Result type alias using CncError
pub type Result<T> = std::result::Result<T, CncError>;

/// Result type alias for codec operations
pub type CodecResult<T> = std::result::Result<T, CodecError>;

/// Wire-level codec failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Buffer too short, truncated mid-field, or otherwise not a packet
    #[error("Malformed packet: {0}")]
    Malformed(String),

    /// Encoded form would not fit the transport MTU
    #[error("Packet too large: {size} bytes (max {max})")]
    Oversize { size: usize, max: usize },

    /// A field exceeds its declared bound
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Action tag outside the known set
    #[error("Unknown action tag: 0x{0:02x}")]
    UnknownAction(u8),
}

/// Unified error type for everything outside the codec
#[derive(Debug, Error)]
pub enum CncError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error(transparent)]
    Codec(#[from] CodecError),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
