//! Peer discovery for Cliplink.
//!
//! Peers advertise themselves via mDNS/DNS-SD (when the `mdns` feature is
//! enabled) using the service type `_cliplink._tcp.local.`. A discovered
//! peer is only dialed; discovery results never reach the UI.
//!
//! Networks that block multicast can list peers explicitly
//! (`network.peers` in the config, `--peer` on the command line).

#[cfg(feature = "mdns")]
pub mod mdns;

use std::net::SocketAddr;

use crate::transport::{PeerId, Transport};

/// A peer whose address became known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPeer {
    /// Transport identifier announced by the peer
    pub peer_id: PeerId,
    /// Announced device name
    pub device_name: String,
    /// Address of the peer's listener
    pub address: SocketAddr,
}

/// Whether a discovered peer should be dialed.
///
/// Skips ourselves and peers we already hold a link to.
#[must_use]
pub fn should_dial(transport: &dyn Transport, peer: &DiscoveredPeer) -> bool {
    &peer.peer_id != transport.local_id() && transport.connection_count(&peer.peer_id) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::transport::BoxedStream;
    use async_trait::async_trait;

    struct OneLink {
        id: PeerId,
        connected: PeerId,
    }

    #[async_trait]
    impl Transport for OneLink {
        fn local_id(&self) -> &PeerId {
            &self.id
        }

        async fn open_stream(&self, peer: &PeerId) -> Result<BoxedStream> {
            Err(crate::Error::StreamOpen {
                peer: peer.to_string(),
                reason: "test".to_string(),
            })
        }

        fn connected_peers(&self) -> Vec<PeerId> {
            vec![self.connected.clone()]
        }

        fn connection_count(&self, peer: &PeerId) -> usize {
            usize::from(peer == &self.connected)
        }
    }

    fn found(id: &str) -> DiscoveredPeer {
        DiscoveredPeer {
            peer_id: PeerId::new(id),
            device_name: "device".to_string(),
            address: "192.168.1.20:52700".parse().unwrap(),
        }
    }

    #[test]
    fn test_should_dial() {
        let transport = OneLink {
            id: PeerId::new("me"),
            connected: PeerId::new("known"),
        };

        assert!(should_dial(&transport, &found("new")));
        assert!(!should_dial(&transport, &found("me")));
        assert!(!should_dial(&transport, &found("known")));
    }
}
