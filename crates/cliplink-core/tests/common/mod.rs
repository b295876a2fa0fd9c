//! Common test utilities for Cliplink integration tests.
//!
//! Provides an in-process transport whose streams record what was written,
//! plus a few wiring helpers.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::sync::mpsc;

use cliplink_core::clipboard::{ClipboardAccess, MemoryClipboard};
use cliplink_core::protocol::{decode_line, ClipMessage, MessageProtocol};
use cliplink_core::sync::{SyncCoordinator, SyncEvent, SyncSwitch};
use cliplink_core::transport::{BoxedStream, PeerId, Transport};
use cliplink_core::{Error, Result};

type Sink = Arc<Mutex<HashMap<PeerId, Vec<u8>>>>;

/// Stream that appends everything written to a shared per-peer buffer.
///
/// Reads return end of stream immediately.
struct RecordingStream {
    peer: PeerId,
    sink: Sink,
}

impl AsyncWrite for RecordingStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut sink = self.sink.lock().expect("sink lock");
        sink.entry(self.peer.clone())
            .or_default()
            .extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl AsyncRead for RecordingStream {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// In-process transport with a fixed set of connected peers.
pub struct MockTransport {
    id: PeerId,
    peers: Mutex<Vec<PeerId>>,
    failing: Mutex<HashSet<PeerId>>,
    stall_next: Mutex<Option<Duration>>,
    sink: Sink,
    opens: AtomicUsize,
}

impl MockTransport {
    /// Create a transport connected to `peers`.
    pub fn with_peers(peers: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            id: PeerId::new("local-node"),
            peers: Mutex::new(peers.iter().map(|p| PeerId::new(*p)).collect()),
            failing: Mutex::new(HashSet::new()),
            stall_next: Mutex::new(None),
            sink: Arc::new(Mutex::new(HashMap::new())),
            opens: AtomicUsize::new(0),
        })
    }

    /// Make `open_stream` to `peer` fail.
    pub fn fail_open(&self, peer: &str) {
        self.failing.lock().unwrap().insert(PeerId::new(peer));
    }

    /// Make the next `open_stream` call sleep for `delay` first.
    pub fn stall_next_open(&self, delay: Duration) {
        *self.stall_next.lock().unwrap() = Some(delay);
    }

    /// Contents of the messages written to `peer`, in order.
    pub fn contents_to(&self, peer: &str) -> Vec<String> {
        self.delivered_to(peer)
            .into_iter()
            .map(|message| message.content)
            .collect()
    }

    /// Number of `open_stream` calls so far.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Messages written to `peer`, decoded.
    pub fn delivered_to(&self, peer: &str) -> Vec<ClipMessage> {
        let sink = self.sink.lock().unwrap();
        sink.get(&PeerId::new(peer))
            .map(|bytes| {
                bytes
                    .split(|&b| b == b'\n')
                    .filter(|line| !line.is_empty())
                    .map(|line| decode_line(line).expect("valid line"))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn local_id(&self) -> &PeerId {
        &self.id
    }

    async fn open_stream(&self, peer: &PeerId) -> Result<BoxedStream> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let stall = self.stall_next.lock().unwrap().take();
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().unwrap().contains(peer) {
            return Err(Error::StreamOpen {
                peer: peer.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        Ok(Box::new(RecordingStream {
            peer: peer.clone(),
            sink: Arc::clone(&self.sink),
        }))
    }

    fn connected_peers(&self) -> Vec<PeerId> {
        self.peers.lock().unwrap().clone()
    }

    fn connection_count(&self, peer: &PeerId) -> usize {
        usize::from(self.peers.lock().unwrap().contains(peer))
    }
}

/// A coordinator over a mock transport and a memory clipboard.
pub struct Harness {
    pub transport: Arc<MockTransport>,
    pub clipboard: Arc<MemoryClipboard>,
    pub protocol: Arc<MessageProtocol>,
    pub switch: SyncSwitch,
    pub coordinator: Arc<SyncCoordinator>,
    pub events: mpsc::Receiver<SyncEvent>,
}

impl Harness {
    /// Build a harness connected to `peers`.
    pub fn new(peers: &[&str]) -> Self {
        let transport = MockTransport::with_peers(peers);
        let clipboard = Arc::new(MemoryClipboard::new());
        let protocol = Arc::new(MessageProtocol::new(
            Arc::clone(&transport) as Arc<dyn Transport>
        ));
        let switch = SyncSwitch::new(true);
        let (events_tx, events) = mpsc::channel(64);
        let coordinator = Arc::new(SyncCoordinator::new(
            Arc::clone(&clipboard) as Arc<dyn ClipboardAccess>,
            Arc::clone(&protocol),
            switch.clone(),
            "test-device",
            events_tx,
        ));

        Self {
            transport,
            clipboard,
            protocol,
            switch,
            coordinator,
            events,
        }
    }

    /// Drain every event published so far.
    pub fn drain_events(&mut self) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
