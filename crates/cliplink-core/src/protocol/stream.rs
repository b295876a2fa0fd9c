//! Sending and receiving clip messages over transport streams.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use futures::future::join_all;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use super::{decode_line, display_name, read_line, write_message, ClipMessage};
use crate::error::{Error, Result};
use crate::transport::{InboundStream, PeerId, Transport};

/// Default per-peer send timeout.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// A message received from a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundClip {
    /// Peer the stream came from
    pub from: PeerId,
    /// Decoded message
    pub message: ClipMessage,
}

/// One peer a broadcast could not reach.
#[derive(Debug)]
pub struct BroadcastFailure {
    /// Peer that failed
    pub peer: PeerId,
    /// Why the send failed
    pub error: Error,
}

/// Clip message protocol on top of a [`Transport`].
///
/// Also keeps the table of display names peers have announced.
pub struct MessageProtocol {
    transport: Arc<dyn Transport>,
    peer_names: RwLock<HashMap<PeerId, String>>,
    send_timeout: Duration,
}

impl MessageProtocol {
    /// Create a protocol handler with the default send timeout.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_send_timeout(transport, DEFAULT_SEND_TIMEOUT)
    }

    /// Create a protocol handler with a custom per-peer send timeout.
    #[must_use]
    pub fn with_send_timeout(transport: Arc<dyn Transport>, send_timeout: Duration) -> Self {
        Self {
            transport,
            peer_names: RwLock::new(HashMap::new()),
            send_timeout,
        }
    }

    /// The underlying transport.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Send one message to one peer.
    ///
    /// Opens a stream, writes the encoded line, flushes and closes the
    /// stream.
    ///
    /// # Errors
    ///
    /// - [`Error::StreamOpen`] if no stream can be opened to the peer
    /// - [`Error::Serialization`] if the message cannot be encoded
    /// - [`Error::Io`] if writing fails
    /// - [`Error::Timeout`] if the whole send exceeds the send timeout
    pub async fn send_to(&self, peer: &PeerId, message: &ClipMessage) -> Result<()> {
        let send = async {
            let mut stream = self.transport.open_stream(peer).await?;
            write_message(&mut stream, message).await?;
            stream.shutdown().await?;
            Ok::<_, Error>(())
        };

        timeout(self.send_timeout, send)
            .await
            .map_err(|_| Error::Timeout(millis(self.send_timeout)))?
    }

    /// Send one message to every connected peer.
    ///
    /// Sends run concurrently; a failure or stall on one peer does not affect
    /// the others. Returns one entry per peer that could not be reached.
    pub async fn broadcast(&self, message: &ClipMessage) -> Vec<BroadcastFailure> {
        let peers = self.transport.connected_peers();
        if peers.is_empty() {
            tracing::debug!("Broadcast: no connected peers");
            return Vec::new();
        }

        let sends = peers.into_iter().map(|peer| async move {
            let result = self.send_to(&peer, message).await;
            (peer, result)
        });

        join_all(sends)
            .await
            .into_iter()
            .filter_map(|(peer, result)| match result {
                Ok(()) => {
                    tracing::trace!(peer = %peer, "Broadcast: delivered");
                    None
                }
                Err(error) => Some(BroadcastFailure { peer, error }),
            })
            .collect()
    }

    /// Serve inbound streams until shutdown or until the stream source closes.
    ///
    /// Each stream gets its own reader task. Decoded messages are delivered
    /// on `inbound_tx`.
    pub async fn serve(
        self: Arc<Self>,
        mut streams: mpsc::Receiver<InboundStream>,
        inbound_tx: mpsc::Sender<InboundClip>,
        shutdown: CancellationToken,
    ) {
        loop {
            let stream = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                stream = streams.recv() => match stream {
                    Some(stream) => stream,
                    None => break,
                },
            };

            let protocol = Arc::clone(&self);
            let inbound_tx = inbound_tx.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                protocol.read_stream(stream, inbound_tx, shutdown).await;
            });
        }
        tracing::debug!("Protocol server stopped");
    }

    /// Read messages from one stream until it ends.
    ///
    /// Malformed lines are skipped. Read errors end the loop.
    pub async fn read_stream(
        &self,
        stream: InboundStream,
        inbound_tx: mpsc::Sender<InboundClip>,
        shutdown: CancellationToken,
    ) {
        let InboundStream { peer, reader } = stream;
        let mut reader = BufReader::new(reader);

        loop {
            let line = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                line = read_line(&mut reader) => line,
            };

            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(peer = %peer, "Inbound stream read failed: {e}");
                    break;
                }
            };

            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let message = match decode_line(&line) {
                Ok(message) => message,
                Err(e) => {
                    tracing::debug!(peer = %peer, "Discarding malformed message: {e}");
                    continue;
                }
            };

            if !message.peer_name.is_empty() {
                self.record_name(&peer, &message.peer_name);
            }

            let clip = InboundClip {
                from: peer.clone(),
                message,
            };
            if inbound_tx.send(clip).await.is_err() {
                break;
            }
        }
    }

    /// Display name for a peer: the last announced name or a shortened id.
    #[must_use]
    pub fn name_for(&self, peer: &PeerId) -> String {
        let names = self.peer_names.read().unwrap_or_else(PoisonError::into_inner);
        display_name(peer, names.get(peer).map(String::as_str))
    }

    /// Record a display name announced by a peer.
    pub fn record_name(&self, peer: &PeerId, name: &str) {
        let mut names = self.peer_names.write().unwrap_or_else(PoisonError::into_inner);
        if names.get(peer).map(String::as_str) != Some(name) {
            tracing::debug!(peer = %peer, name, "Peer announced name");
            names.insert(peer.clone(), name.to_string());
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::BoxedStream;
    use async_trait::async_trait;
    use chrono::Utc;

    struct NoPeers {
        id: PeerId,
    }

    #[async_trait]
    impl Transport for NoPeers {
        fn local_id(&self) -> &PeerId {
            &self.id
        }

        async fn open_stream(&self, peer: &PeerId) -> Result<BoxedStream> {
            Err(Error::StreamOpen {
                peer: peer.to_string(),
                reason: "not connected".to_string(),
            })
        }

        fn connected_peers(&self) -> Vec<PeerId> {
            Vec::new()
        }

        fn connection_count(&self, _peer: &PeerId) -> usize {
            0
        }
    }

    fn protocol() -> Arc<MessageProtocol> {
        Arc::new(MessageProtocol::new(Arc::new(NoPeers {
            id: PeerId::new("local"),
        })))
    }

    fn inbound(peer: &str, data: &'static [u8]) -> InboundStream {
        InboundStream {
            peer: PeerId::new(peer),
            reader: Box::new(data),
        }
    }

    #[tokio::test]
    async fn test_send_to_unknown_peer() {
        let protocol = protocol();
        let msg = ClipMessage::new("x", Utc::now(), "me");
        let err = protocol.send_to(&PeerId::new("p"), &msg).await.unwrap_err();
        assert!(matches!(err, Error::StreamOpen { .. }));
    }

    #[tokio::test]
    async fn test_broadcast_without_peers() {
        let protocol = protocol();
        let msg = ClipMessage::new("x", Utc::now(), "me");
        assert!(protocol.broadcast(&msg).await.is_empty());
    }

    #[tokio::test]
    async fn test_reader_skips_malformed_lines() {
        let protocol = protocol();
        let (tx, mut rx) = mpsc::channel(8);
        let data: &'static [u8] = b"{\"content\":\"one\",\"timestamp\":\"2024-05-01T12:30:00Z\",\"peer_name\":\"desk\"}\n\
garbage\n\
\n\
{\"content\":\"two\",\"timestamp\":\"2024-05-01T12:31:00Z\",\"peer_name\":\"\"}\n";

        protocol
            .read_stream(inbound("0123456789abcdef", data), tx, CancellationToken::new())
            .await;

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(rx.recv().await.is_none());

        assert_eq!(first.message.content, "one");
        assert_eq!(second.message.content, "two");
        assert_eq!(second.from, PeerId::new("0123456789abcdef"));
        assert_eq!(protocol.name_for(&PeerId::new("0123456789abcdef")), "desk");
    }

    #[test]
    fn test_name_for_unannounced_peer() {
        let protocol = protocol();
        assert_eq!(
            protocol.name_for(&PeerId::new("0123456789abcdef")),
            "01234567..."
        );
        protocol.record_name(&PeerId::new("0123456789abcdef"), "desk");
        protocol.record_name(&PeerId::new("0123456789abcdef"), "office");
        assert_eq!(protocol.name_for(&PeerId::new("0123456789abcdef")), "office");
    }

    #[tokio::test]
    async fn test_serve_dispatches_streams() {
        let protocol = protocol();
        let (streams_tx, streams_rx) = mpsc::channel(4);
        let (inbound_tx, mut inbound_rx) = mpsc::channel(4);
        let shutdown = CancellationToken::new();

        let server = tokio::spawn(Arc::clone(&protocol).serve(
            streams_rx,
            inbound_tx,
            shutdown.clone(),
        ));

        streams_tx
            .send(inbound(
                "peer-a",
                b"{\"content\":\"hi\",\"timestamp\":\"2024-05-01T12:30:00Z\",\"peer_name\":\"a\"}\n",
            ))
            .await
            .unwrap();

        let clip = inbound_rx.recv().await.unwrap();
        assert_eq!(clip.message.content, "hi");
        assert_eq!(clip.from, PeerId::new("peer-a"));

        shutdown.cancel();
        server.await.unwrap();
    }
}
