//! Peer transport.
//!
//! The transport owns connections to peers. Everything above it works in
//! terms of [`PeerId`]s and short-lived byte streams:
//!
//! - [`Transport::open_stream`] gives a writable stream to a connected peer.
//! - Inbound streams arrive as [`InboundStream`] values on a channel.
//! - Every link opening or closing is reported as a [`RawConnectionEvent`]
//!   carrying the link count to that peer at the time of the event.
//!
//! A single peer may be reachable over more than one link (both sides dialed
//! each other, a reconnect overlapped a stale link). [`notifier`] collapses
//! that into one connect and one disconnect per peer.

pub mod notifier;
pub mod tcp;

pub use notifier::{ConnectionNotifier, PeerLifecycle};
pub use tcp::{TcpTransport, TransportChannels, TransportConfig};

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use uuid::Uuid;

use crate::error::Result;

/// Opaque peer identifier.
///
/// Generated once per process as a random UUID v4 rendered as 32 hex
/// characters. Compared by exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Wrap an existing identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A bidirectional byte stream to a peer.
pub trait PeerStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> PeerStream for T {}

/// Boxed outbound stream.
pub type BoxedStream = Box<dyn PeerStream>;

/// Boxed read half of an inbound stream.
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// A stream opened by a remote peer.
pub struct InboundStream {
    /// Peer that opened the stream
    pub peer: PeerId,
    /// Stream contents
    pub reader: BoxedReader,
}

impl fmt::Debug for InboundStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InboundStream")
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}

/// Whether a link opened or closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEventKind {
    /// A link to the peer was established
    Opened,
    /// A link to the peer went away
    Closed,
}

/// Link-level connection event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawConnectionEvent {
    /// Peer the link belongs to
    pub peer: PeerId,
    /// Opened or closed
    pub kind: ConnectionEventKind,
    /// Number of live links to `peer` right after this event
    pub connections: usize,
}

/// Narrow interface to the peer transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// This process' identifier.
    fn local_id(&self) -> &PeerId;

    /// Open a new outbound stream to a connected peer.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StreamOpen`] if there is no route to the peer.
    async fn open_stream(&self, peer: &PeerId) -> Result<BoxedStream>;

    /// Peers with at least one live link.
    fn connected_peers(&self) -> Vec<PeerId>;

    /// Number of live links to `peer`.
    fn connection_count(&self, peer: &PeerId) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_peer_id_format() {
        let id = PeerId::random();
        assert_eq!(id.as_str().len(), 32);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, PeerId::random());
    }

    #[test]
    fn test_peer_id_serializes_as_string() {
        let id = PeerId::new("abc123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc123\"");
        assert_eq!(id.to_string(), "abc123");
    }
}
