//! Transport-level error types.
//!
//! Errors for serial transport operations, separate from the pool-level
//! error taxonomy to keep the layers independently matchable.

use thiserror::Error;

/// Errors that can occur during serial transport operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The specified serial port was not found on the system.
    #[error("serial port not found: {0}")]
    NotFound(String),

    /// An I/O error occurred during a transport operation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection parameters are invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Attempted to open a transport that is already open.
    #[error("port is already open")]
    AlreadyOpen,

    /// Attempted to use a transport that is not open.
    #[error("port is not open")]
    NotOpen,

    /// The transport's background I/O task is gone.
    #[error("port I/O task terminated")]
    IoTaskGone,

    /// A serialport-specific error occurred.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a `NotFound` error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a `Config` error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
