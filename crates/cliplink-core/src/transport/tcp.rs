//! TCP transport.
//!
//! Every TCP connection starts with a one-line JSON hello in each direction:
//!
//! ```text
//! {"protocol":"/cliplink/1.0.0","peer_id":"…","listen_port":52700,"kind":"control"}
//! ```
//!
//! The dialer writes its hello first, the acceptor answers with its own.
//!
//! - `control` links are long-lived and represent "we are connected". They
//!   are counted per peer and reported as [`RawConnectionEvent`]s.
//! - `stream` links carry protocol lines. The dialer writes, the acceptor's
//!   side is handed out as an [`InboundStream`].

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use super::{
    BoxedStream, ConnectionEventKind, InboundStream, PeerId, RawConnectionEvent, Transport,
};
use crate::error::{Error, Result};

/// Maximum accepted hello line length.
const MAX_HELLO_LEN: u64 = 1024;

/// Capacity of the inbound stream channel.
const INBOUND_CHANNEL_CAPACITY: usize = 32;

/// Transport settings.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Address to listen on
    pub listen_addr: SocketAddr,
    /// Timeout for dialing and for the hello exchange
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], crate::DEFAULT_PORT)),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Receivers handed out when the transport is bound.
#[derive(Debug)]
pub struct TransportChannels {
    /// Streams opened by remote peers
    pub streams: mpsc::Receiver<InboundStream>,
    /// Link-level connection events, in the order links changed
    pub events: mpsc::UnboundedReceiver<RawConnectionEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LinkKind {
    Control,
    Stream,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Hello {
    protocol: String,
    peer_id: PeerId,
    listen_port: u16,
    kind: LinkKind,
}

#[derive(Debug)]
struct PeerLinks {
    links: usize,
    dial_addr: SocketAddr,
}

/// Transport over plain TCP.
pub struct TcpTransport {
    local_id: PeerId,
    local_addr: SocketAddr,
    connect_timeout: Duration,
    peers: Mutex<HashMap<PeerId, PeerLinks>>,
    events_tx: mpsc::UnboundedSender<RawConnectionEvent>,
    streams_tx: mpsc::Sender<InboundStream>,
    shutdown: CancellationToken,
}

impl TcpTransport {
    /// Bind the listener and start accepting connections.
    ///
    /// All background tasks stop when `shutdown` is cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BindFailed`] if the listen address is unavailable.
    pub async fn bind(
        local_id: PeerId,
        config: TransportConfig,
        shutdown: CancellationToken,
    ) -> Result<(Arc<Self>, TransportChannels)> {
        let listener = TcpListener::bind(config.listen_addr)
            .await
            .map_err(|source| Error::BindFailed {
                addr: config.listen_addr,
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (streams_tx, streams_rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);

        let transport = Arc::new(Self {
            local_id,
            local_addr,
            connect_timeout: config.connect_timeout,
            peers: Mutex::new(HashMap::new()),
            events_tx,
            streams_tx,
            shutdown,
        });

        tracing::info!(addr = %local_addr, peer_id = %transport.local_id, "Transport listening");

        tokio::spawn(Arc::clone(&transport).accept_loop(listener));

        Ok((
            transport,
            TransportChannels {
                streams: streams_rx,
                events: events_rx,
            },
        ))
    }

    /// The bound listen address.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Dial a peer at `addr` and keep a control link open to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the peer cannot be reached or the hello exchange
    /// fails.
    pub async fn connect(self: &Arc<Self>, addr: SocketAddr) -> Result<PeerId> {
        let (hello, reader) = self.dial(addr, LinkKind::Control).await?;
        let peer = hello.peer_id;

        tracing::info!(peer = %peer, %addr, "Connected to peer");
        self.link_opened(&peer, addr);
        tokio::spawn(Arc::clone(self).watch_link(peer.clone(), reader));

        Ok(peer)
    }

    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        loop {
            let accepted = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, remote)) => {
                    let transport = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = transport.handle_incoming(stream, remote).await {
                            tracing::debug!(%remote, "Rejected incoming connection: {e}");
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {e}");
                }
            }
        }
        tracing::debug!("Transport accept loop stopped");
    }

    async fn handle_incoming(self: Arc<Self>, stream: TcpStream, remote: SocketAddr) -> Result<()> {
        let _ = stream.set_nodelay(true);
        let mut reader = BufReader::new(stream);

        let hello = timeout(self.connect_timeout, async {
            let hello = read_hello(&mut reader).await?;
            self.check_hello(&hello)?;
            write_hello(reader.get_mut(), &self.hello(hello.kind)).await?;
            Ok::<_, Error>(hello)
        })
        .await
        .map_err(|_| Error::Timeout(millis(self.connect_timeout)))??;

        let peer = hello.peer_id;
        match hello.kind {
            LinkKind::Control => {
                let dial_addr = SocketAddr::new(remote.ip(), hello.listen_port);
                tracing::info!(peer = %peer, %remote, "Peer connected to us");
                self.link_opened(&peer, dial_addr);
                self.watch_link(peer, reader).await;
            }
            LinkKind::Stream => {
                tracing::trace!(peer = %peer, "Inbound stream");
                let inbound = InboundStream {
                    peer,
                    reader: Box::new(reader),
                };
                if self.streams_tx.send(inbound).await.is_err() {
                    tracing::debug!("Inbound stream receiver dropped");
                }
            }
        }
        Ok(())
    }

    /// Dial `addr`, exchange hellos and return the remote hello.
    async fn dial(&self, addr: SocketAddr, kind: LinkKind) -> Result<(Hello, BufReader<TcpStream>)> {
        timeout(self.connect_timeout, async {
            let stream = TcpStream::connect(addr).await?;
            let _ = stream.set_nodelay(true);
            let mut reader = BufReader::new(stream);

            write_hello(reader.get_mut(), &self.hello(kind)).await?;
            let hello = read_hello(&mut reader).await?;
            self.check_hello(&hello)?;
            if hello.kind != kind {
                return Err(Error::HandshakeFailed(format!(
                    "expected {kind:?} link, peer answered {:?}",
                    hello.kind
                )));
            }
            Ok((hello, reader))
        })
        .await
        .map_err(|_| Error::Timeout(millis(self.connect_timeout)))?
    }

    /// Hold a control link until the peer closes it or we shut down.
    async fn watch_link<R>(self: Arc<Self>, peer: PeerId, mut reader: R)
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut buf = [0u8; 64];
        loop {
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break,
                read = reader.read(&mut buf) => match read {
                    Ok(0) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::debug!(peer = %peer, "Control link error: {e}");
                        break;
                    }
                },
            }
        }
        drop(reader);
        self.link_closed(&peer);
    }

    fn hello(&self, kind: LinkKind) -> Hello {
        Hello {
            protocol: crate::PROTOCOL_ID.to_string(),
            peer_id: self.local_id.clone(),
            listen_port: self.local_addr.port(),
            kind,
        }
    }

    fn check_hello(&self, hello: &Hello) -> Result<()> {
        if hello.protocol != crate::PROTOCOL_ID {
            return Err(Error::HandshakeFailed(format!(
                "unsupported protocol '{}'",
                hello.protocol
            )));
        }
        if hello.peer_id == self.local_id {
            return Err(Error::HandshakeFailed("connected to ourselves".to_string()));
        }
        Ok(())
    }

    fn link_opened(&self, peer: &PeerId, dial_addr: SocketAddr) {
        let mut peers = self.peers.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = peers
            .entry(peer.clone())
            .or_insert(PeerLinks { links: 0, dial_addr });
        entry.links += 1;

        // Sent under the lock so events keep the order of the counter.
        let _ = self.events_tx.send(RawConnectionEvent {
            peer: peer.clone(),
            kind: ConnectionEventKind::Opened,
            connections: entry.links,
        });
    }

    fn link_closed(&self, peer: &PeerId) {
        let mut peers = self.peers.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(entry) = peers.get_mut(peer) else {
            return;
        };
        entry.links = entry.links.saturating_sub(1);
        let remaining = entry.links;
        if remaining == 0 {
            peers.remove(peer);
            tracing::info!(peer = %peer, "Peer disconnected");
        }

        let _ = self.events_tx.send(RawConnectionEvent {
            peer: peer.clone(),
            kind: ConnectionEventKind::Closed,
            connections: remaining,
        });
    }
}

#[async_trait]
impl Transport for TcpTransport {
    fn local_id(&self) -> &PeerId {
        &self.local_id
    }

    async fn open_stream(&self, peer: &PeerId) -> Result<BoxedStream> {
        let dial_addr = {
            let peers = self.peers.lock().unwrap_or_else(PoisonError::into_inner);
            peers.get(peer).map(|links| links.dial_addr)
        };
        let Some(addr) = dial_addr else {
            return Err(Error::StreamOpen {
                peer: peer.to_string(),
                reason: "not connected".to_string(),
            });
        };

        let (hello, reader) =
            self.dial(addr, LinkKind::Stream)
                .await
                .map_err(|e| Error::StreamOpen {
                    peer: peer.to_string(),
                    reason: e.to_string(),
                })?;

        if &hello.peer_id != peer {
            return Err(Error::StreamOpen {
                peer: peer.to_string(),
                reason: format!("{addr} now belongs to peer {}", hello.peer_id),
            });
        }

        Ok(Box::new(reader))
    }

    fn connected_peers(&self) -> Vec<PeerId> {
        let peers = self.peers.lock().unwrap_or_else(PoisonError::into_inner);
        peers
            .iter()
            .filter(|(_, links)| links.links > 0)
            .map(|(peer, _)| peer.clone())
            .collect()
    }

    fn connection_count(&self, peer: &PeerId) -> usize {
        let peers = self.peers.lock().unwrap_or_else(PoisonError::into_inner);
        peers.get(peer).map_or(0, |links| links.links)
    }
}

async fn write_hello<W>(writer: &mut W, hello: &Hello) -> Result<()>
where
    W: tokio::io::AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(hello)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}

async fn read_hello<R>(reader: &mut BufReader<R>) -> Result<Hello>
where
    R: AsyncRead + Unpin,
{
    let mut line = String::new();
    let n = (&mut *reader)
        .take(MAX_HELLO_LEN)
        .read_line(&mut line)
        .await?;
    if n == 0 {
        return Err(Error::HandshakeFailed("connection closed before hello".to_string()));
    }
    if !line.ends_with('\n') {
        return Err(Error::HandshakeFailed("hello line too long".to_string()));
    }
    serde_json::from_str(line.trim_end())
        .map_err(|e| Error::HandshakeFailed(format!("invalid hello: {e}")))
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Parse a peer address given on the command line or in the config.
///
/// Accepts:
/// - `IP` (e.g., `192.168.1.20`), using the default port
/// - `IP:PORT` (e.g., `192.168.1.20:52701`)
/// - `[IPv6]` or `[IPv6]:PORT`
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] if the string is not an address.
pub fn parse_peer_address(host: &str) -> Result<SocketAddr> {
    let host = host.trim();
    let invalid = || Error::InvalidConfig {
        key: "peer".to_string(),
        reason: format!("'{host}' is not IP or IP:PORT (e.g. 192.168.1.20:52700)"),
    };

    if let Ok(addr) = host.parse::<SocketAddr>() {
        return Ok(addr);
    }

    let bare = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    bare.parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, crate::DEFAULT_PORT))
        .map_err(|_| invalid())
}
