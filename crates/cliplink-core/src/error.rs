//! Error types for Cliplink.
//!
//! This module provides a unified error type for all Cliplink operations,
//! with specific error variants for different failure modes.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// A specialized `Result` type for Cliplink operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Cliplink.
#[derive(Error, Debug)]
pub enum Error {
    /// Clipboard access failed
    #[error("clipboard error: {0}")]
    ClipboardError(String),

    /// Clipboard holds no text
    #[error("clipboard is empty")]
    ClipboardEmpty,

    /// No stream could be opened to a peer
    #[error("cannot open stream to peer {peer}: {reason}")]
    StreamOpen {
        /// Peer the stream was requested for
        peer: String,
        /// Why the stream could not be opened
        reason: String,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid protocol message
    #[error("invalid protocol message: {0}")]
    ProtocolError(String),

    /// Connection handshake failed
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// Listener could not be bound
    #[error("cannot listen on {addr}: {source}")]
    BindFailed {
        /// Address we tried to bind
        addr: SocketAddr,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Discovery service failure
    #[error("discovery error: {0}")]
    DiscoveryError(String),

    /// Configuration file error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Invalid configuration value
    #[error("invalid configuration value for '{key}': {reason}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Reason for invalidity
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Operation timeout
    #[error("operation timed out after {0} ms")]
    Timeout(u64),

    /// The component was shut down
    #[error("shut down")]
    Shutdown,

    /// Internal error (should not happen)
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns whether this error is transient (the next cycle may succeed).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::StreamOpen { .. } | Self::Timeout(_) | Self::Io(_) | Self::ClipboardEmpty
        )
    }

    /// Returns a helpful suggestion for resolving the error, if applicable.
    #[must_use]
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::ClipboardError(_) => Some(
                "Cliplink needs access to the system clipboard.\n\
                 On Linux, make sure an X11 or Wayland session is running\n\
                 (DISPLAY or WAYLAND_DISPLAY must be set).",
            ),
            Self::BindFailed { .. } => Some(
                "Another process may be using the port. Try:\n\
                   cliplink --port 0",
            ),
            Self::DiscoveryError(_) => Some(
                "mDNS could not start. Disable it and dial peers directly:\n\
                   cliplink --no-mdns --peer 192.168.1.20:52700",
            ),
            Self::ConfigError(_) | Self::InvalidConfig { .. } => Some(
                "Check the configuration file:\n\
                   cliplink config path",
            ),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
