//! TUI action types.
//!
//! Actions are the only input to [`AppState::reduce`](super::state::AppState::reduce).
//! Key presses and sync events are both converted into an action first.

use chrono::{DateTime, Utc};
use cliplink_core::sync::SyncEvent;
use cliplink_core::transport::PeerId;

/// Everything that can change the dashboard state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Leave the dashboard
    Quit,
    /// Flip synchronization on or off
    ToggleSync,
    /// Empty the history list
    ClearHistory,
    /// A local copy was broadcast
    ClipSent {
        /// Clipboard text
        content: String,
        /// When the copy was observed
        timestamp: DateTime<Utc>,
    },
    /// A remote copy was applied locally
    ClipReceived {
        /// Clipboard text
        content: String,
        /// Sender's timestamp
        timestamp: DateTime<Utc>,
        /// Sender display name
        peer_name: String,
    },
    /// A peer connected
    PeerConnected {
        /// Peer id
        peer_id: PeerId,
        /// Display name
        name: String,
    },
    /// A peer disconnected
    PeerDisconnected {
        /// Peer id
        peer_id: PeerId,
    },
    /// Terminal resized
    Resize(u16, u16),
    /// No-op
    None,
}

impl From<SyncEvent> for Action {
    fn from(event: SyncEvent) -> Self {
        match event {
            SyncEvent::ClipSent { content, timestamp } => Self::ClipSent { content, timestamp },
            SyncEvent::ClipReceived {
                content,
                timestamp,
                peer_name,
                ..
            } => Self::ClipReceived {
                content,
                timestamp,
                peer_name,
            },
            SyncEvent::PeerConnected { peer_id, name } => Self::PeerConnected { peer_id, name },
            SyncEvent::PeerDisconnected { peer_id } => Self::PeerDisconnected { peer_id },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_received_event_drops_peer_id() {
        let now = Utc::now();
        let action = Action::from(SyncEvent::ClipReceived {
            content: "x".to_string(),
            timestamp: now,
            peer_id: PeerId::new("abc"),
            peer_name: "desk".to_string(),
        });

        assert_eq!(
            action,
            Action::ClipReceived {
                content: "x".to_string(),
                timestamp: now,
                peer_name: "desk".to_string(),
            }
        );
    }
}
