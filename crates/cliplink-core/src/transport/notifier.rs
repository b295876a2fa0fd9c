//! Connection event deduplication.
//!
//! Turns link-level events into exactly one [`PeerLifecycle::Connected`] and
//! one [`PeerLifecycle::Disconnected`] per peer, however many links exist.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{ConnectionEventKind, PeerId, RawConnectionEvent};

/// Logical peer lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerLifecycle {
    /// First link to the peer came up
    Connected(PeerId),
    /// Last link to the peer went away
    Disconnected(PeerId),
}

/// Stateless filter over raw connection events.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionNotifier;

impl ConnectionNotifier {
    /// Classify one raw event using the link count it carries.
    ///
    /// Only the first opened link and the last closed link produce a
    /// notification.
    #[must_use]
    pub fn classify(event: &RawConnectionEvent) -> Option<PeerLifecycle> {
        match (event.kind, event.connections) {
            (ConnectionEventKind::Opened, 1) => Some(PeerLifecycle::Connected(event.peer.clone())),
            (ConnectionEventKind::Closed, 0) => {
                Some(PeerLifecycle::Disconnected(event.peer.clone()))
            }
            _ => None,
        }
    }

    /// Forward classified events until shutdown or until either side closes.
    pub async fn run(
        mut raw_rx: mpsc::UnboundedReceiver<RawConnectionEvent>,
        out: mpsc::Sender<PeerLifecycle>,
        shutdown: CancellationToken,
    ) {
        loop {
            let event = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                event = raw_rx.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            tracing::trace!(peer = %event.peer, kind = ?event.kind, links = event.connections, "Raw connection event");

            if let Some(lifecycle) = Self::classify(&event) {
                if out.send(lifecycle).await.is_err() {
                    break;
                }
            }
        }
        tracing::debug!("Connection notifier stopped");
    }
}
