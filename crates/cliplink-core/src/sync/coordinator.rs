//! Sync coordinator: echo suppression and event fan-out.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{SyncEvent, SyncSwitch};
use crate::clipboard::{ClipChange, ClipboardAccess};
use crate::protocol::{ClipMessage, InboundClip, MessageProtocol};
use crate::transport::{PeerId, PeerLifecycle};

/// State guarded by the coordinator lock.
///
/// Both fields are always read and written together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinatorState {
    /// Last text sent to or accepted from peers
    pub last_synced_content: String,
    /// Swallow the next local change (it is our own remote write)
    pub suppress_next_local_change: bool,
}

/// Central sync state machine.
pub struct SyncCoordinator {
    state: Mutex<CoordinatorState>,
    clipboard: Arc<dyn ClipboardAccess>,
    protocol: Arc<MessageProtocol>,
    switch: SyncSwitch,
    local_name: String,
    events_tx: mpsc::Sender<SyncEvent>,
}

impl SyncCoordinator {
    /// Create a coordinator.
    ///
    /// `local_name` is announced in every outgoing message. Events for the
    /// UI are published on `events_tx`.
    #[must_use]
    pub fn new(
        clipboard: Arc<dyn ClipboardAccess>,
        protocol: Arc<MessageProtocol>,
        switch: SyncSwitch,
        local_name: impl Into<String>,
        events_tx: mpsc::Sender<SyncEvent>,
    ) -> Self {
        Self {
            state: Mutex::new(CoordinatorState::default()),
            clipboard,
            protocol,
            switch,
            local_name: local_name.into(),
            events_tx,
        }
    }

    /// Snapshot of the guarded state.
    #[must_use]
    pub fn state(&self) -> CoordinatorState {
        self.lock_state().clone()
    }

    /// The sync on/off switch this coordinator reads.
    #[must_use]
    pub fn switch(&self) -> &SyncSwitch {
        &self.switch
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle a change detected by the clipboard watcher.
    ///
    /// Equivalent to [`accept_local_change`](Self::accept_local_change)
    /// followed by [`broadcast_change`](Self::broadcast_change).
    pub async fn handle_local_change(&self, change: ClipChange) {
        if let Some(change) = self.accept_local_change(change) {
            self.broadcast_change(change).await;
        }
    }

    /// Decide whether a local change goes out, without any I/O.
    ///
    /// Consumes the suppression flag if set. Otherwise, with sync enabled,
    /// records the content as synchronized and returns the change to send.
    pub fn accept_local_change(&self, change: ClipChange) -> Option<ClipChange> {
        let mut state = self.lock_state();
        if state.suppress_next_local_change {
            state.suppress_next_local_change = false;
            tracing::debug!("Local change is our own remote write, not broadcasting");
            return None;
        }
        if !self.switch.is_enabled() {
            tracing::trace!("Sync disabled, ignoring local change");
            return None;
        }
        state.last_synced_content.clone_from(&change.content);
        Some(change)
    }

    /// Broadcast an accepted local change and publish `ClipSent`.
    pub async fn broadcast_change(&self, change: ClipChange) {
        let message = ClipMessage::new(
            change.content.clone(),
            change.observed_at,
            self.local_name.clone(),
        );

        tracing::info!(bytes = change.content.len(), "Outbound: broadcasting clipboard change");
        let failures = self.protocol.broadcast(&message).await;
        for failure in &failures {
            tracing::debug!(peer = %failure.peer, "Outbound: send failed: {}", failure.error);
        }

        self.publish(SyncEvent::ClipSent {
            content: change.content,
            timestamp: change.observed_at,
        })
        .await;
    }

    /// Handle a message received from a peer.
    ///
    /// When the clipboard already holds the content nothing is written and
    /// the suppression flag stays clear.
    pub async fn handle_remote_message(&self, from: &PeerId, message: ClipMessage) {
        let on_clipboard = self
            .clipboard
            .read()
            .is_ok_and(|current| current == message.content);

        let previous = {
            let mut state = self.lock_state();
            if !self.switch.is_enabled() {
                tracing::trace!(peer = %from, "Sync disabled, ignoring remote message");
                return;
            }
            if state.last_synced_content == message.content {
                tracing::debug!(peer = %from, "Inbound: content already synchronized");
                return;
            }
            if !on_clipboard {
                state.suppress_next_local_change = true;
            }
            std::mem::replace(&mut state.last_synced_content, message.content.clone())
        };

        if on_clipboard {
            tracing::debug!(peer = %from, "Inbound: clipboard already holds this content");
        } else if let Err(e) = self.clipboard.write(&message.content) {
            tracing::warn!(peer = %from, "Failed to write clipboard in sync: {e}");
            let mut state = self.lock_state();
            if state.last_synced_content == message.content {
                state.last_synced_content = previous;
                state.suppress_next_local_change = false;
            }
            return;
        }

        let peer_name = if message.peer_name.is_empty() {
            self.protocol.name_for(from)
        } else {
            message.peer_name.clone()
        };

        tracing::info!(
            peer = %from,
            name = %peer_name,
            bytes = message.content.len(),
            "Inbound: clipboard updated"
        );

        self.publish(SyncEvent::ClipReceived {
            content: message.content,
            timestamp: message.timestamp,
            peer_id: from.clone(),
            peer_name,
        })
        .await;
    }

    /// Handle a deduplicated peer connect or disconnect.
    pub async fn handle_lifecycle(&self, event: PeerLifecycle) {
        let event = match event {
            PeerLifecycle::Connected(peer_id) => {
                let name = self.protocol.name_for(&peer_id);
                tracing::info!(peer = %peer_id, name = %name, "Peer connected");
                SyncEvent::PeerConnected { peer_id, name }
            }
            PeerLifecycle::Disconnected(peer_id) => {
                tracing::info!(peer = %peer_id, "Peer disconnected");
                SyncEvent::PeerDisconnected { peer_id }
            }
        };
        self.publish(event).await;
    }

    async fn publish(&self, event: SyncEvent) {
        let _ = self.events_tx.send(event).await;
    }

    /// Drive the three input paths until shutdown.
    ///
    /// Local changes, inbound messages and lifecycle events are handled by
    /// separate tasks so a slow broadcast never delays a remote write. Local
    /// changes are accepted or suppressed in arrival order as soon as they
    /// are dequeued; accepted ones are broadcast in order by a fourth task.
    /// After `shutdown` is cancelled no new broadcast is started.
    pub async fn run(
        self: Arc<Self>,
        mut changes_rx: mpsc::Receiver<ClipChange>,
        mut inbound_rx: mpsc::Receiver<InboundClip>,
        mut lifecycle_rx: mpsc::Receiver<PeerLifecycle>,
        shutdown: CancellationToken,
    ) {
        // Accepted changes wait here while a broadcast is in flight.
        let (accepted_tx, mut accepted_rx) = mpsc::unbounded_channel::<ClipChange>();

        let outbound_task = {
            let coordinator = Arc::clone(&self);
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                tracing::debug!("Outbound sync task started");
                loop {
                    let change = tokio::select! {
                        biased;
                        () = shutdown.cancelled() => break,
                        change = changes_rx.recv() => match change {
                            Some(change) => change,
                            None => break,
                        },
                    };
                    if let Some(change) = coordinator.accept_local_change(change) {
                        let _ = accepted_tx.send(change);
                    }
                }
                tracing::debug!("Outbound sync task ending");
            })
        };

        let broadcast_task = {
            let coordinator = Arc::clone(&self);
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                loop {
                    let change = tokio::select! {
                        biased;
                        () = shutdown.cancelled() => break,
                        change = accepted_rx.recv() => match change {
                            Some(change) => change,
                            None => break,
                        },
                    };
                    coordinator.broadcast_change(change).await;
                }
            })
        };

        let inbound_task = {
            let coordinator = Arc::clone(&self);
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                tracing::debug!("Inbound sync task started");
                loop {
                    let clip = tokio::select! {
                        biased;
                        () = shutdown.cancelled() => break,
                        clip = inbound_rx.recv() => match clip {
                            Some(clip) => clip,
                            None => break,
                        },
                    };
                    coordinator
                        .handle_remote_message(&clip.from, clip.message)
                        .await;
                }
                tracing::debug!("Inbound sync task ending");
            })
        };

        let lifecycle_task = {
            let coordinator = Arc::clone(&self);
            tokio::spawn(async move {
                loop {
                    let event = tokio::select! {
                        biased;
                        () = shutdown.cancelled() => break,
                        event = lifecycle_rx.recv() => match event {
                            Some(event) => event,
                            None => break,
                        },
                    };
                    coordinator.handle_lifecycle(event).await;
                }
            })
        };

        let (outbound, broadcast, inbound, lifecycle) =
            tokio::join!(outbound_task, broadcast_task, inbound_task, lifecycle_task);
        for (name, result) in [
            ("Outbound", outbound),
            ("Broadcast", broadcast),
            ("Inbound", inbound),
            ("Lifecycle", lifecycle),
        ] {
            if let Err(e) = result {
                tracing::warn!("{name} task panicked: {e}");
            }
        }
    }
}
