//! Error types for the display bridge.

use std::io;

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, BridgeError>;

/// How the delivery loop reacts to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Talking to the financial API failed. Transient: retried after a
    /// backoff on the same serial connection.
    RemoteFetch,
    /// The serial device could not be opened or has gone away. Fatal.
    SerialUnavailable,
    /// Something else failed mid-cycle. Logged, then the loop pauses
    /// briefly and continues.
    Cycle,
    /// Configuration is missing or invalid. Fatal at startup.
    Configuration,
}

/// All errors that can occur while bridging the API to the display.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API error (status {status}) from {endpoint}: {message}")]
    Api {
        /// Endpoint path that was requested.
        endpoint: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        message: String,
    },

    /// The API answered with a body that is not the expected JSON.
    #[error("malformed response from {endpoint}: {source}")]
    Decode {
        /// Endpoint path that was requested.
        endpoint: &'static str,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// The summary could not be encoded as JSON.
    #[error("failed to encode summary: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The serial device could not be opened.
    #[error("cannot open serial device {path}: {source}")]
    SerialOpen {
        /// Device path.
        path: String,
        /// Driver error.
        source: serialport::Error,
    },

    /// The serial device disappeared while writing.
    #[error("serial device disconnected: {0}")]
    SerialDisconnected(#[source] io::Error),

    /// A write to the serial device failed without losing the device
    /// (timeout, transient I/O error).
    #[error("serial write failed: {0}")]
    SerialWrite(#[source] io::Error),

    /// Configuration value is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// A dotenv file could not be read.
    #[error("cannot load environment file {path}: {source}")]
    EnvFile {
        /// File path.
        path: String,
        /// Parser error.
        source: dotenvy::Error,
    },
}

impl BridgeError {
    /// Classifies the error for the delivery loop.
    #[inline]
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match *self {
            Self::Http(_) | Self::Api { .. } | Self::Decode { .. } => ErrorClass::RemoteFetch,
            Self::SerialOpen { .. } | Self::SerialDisconnected(_) => ErrorClass::SerialUnavailable,
            Self::Serialization(_) | Self::SerialWrite(_) => ErrorClass::Cycle,
            Self::Config(_) | Self::EnvFile { .. } => ErrorClass::Configuration,
        }
    }

    /// Returns `true` if the error ends the process.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self.class(),
            ErrorClass::SerialUnavailable | ErrorClass::Configuration
        )
    }

    /// Wraps an I/O error raised while writing to the serial device,
    /// separating a lost device from a failed write.
    #[inline]
    #[must_use]
    pub fn from_write(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotFound
            | io::ErrorKind::WriteZero => Self::SerialDisconnected(err),
            _ => Self::SerialWrite(err),
        }
    }
}
