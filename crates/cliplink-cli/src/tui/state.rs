//! Dashboard state and its reducer.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use cliplink_core::transport::PeerId;
use cliplink_core::DEFAULT_HISTORY_CAPACITY;

use super::action::Action;

/// Where a history entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipOrigin {
    /// Copied on this machine and broadcast
    Local,
    /// Received from a peer
    Remote,
}

/// One synchronized clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Clipboard text
    pub content: String,
    /// When it was copied
    pub timestamp: DateTime<Utc>,
    /// Local or remote
    pub origin: ClipOrigin,
    /// Device that copied it; this machine's name for local entries
    pub peer_name: String,
}

/// A connected peer as shown in the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerEntry {
    /// Peer id
    pub id: PeerId,
    /// Display name
    pub name: String,
}

/// Dashboard state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Recent clips, oldest first
    pub history: VecDeque<HistoryEntry>,
    /// Maximum number of history entries
    pub history_capacity: usize,
    /// Connected peers in connection order
    pub peers: Vec<PeerEntry>,
    /// Whether sync is on
    pub sync_enabled: bool,
    /// Set once the user asked to quit
    pub should_quit: bool,
    /// Terminal size (width, height)
    pub size: (u16, u16),
    /// This device's name, recorded on local entries
    pub local_name: String,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY, true, "local")
    }
}

impl AppState {
    /// Create an empty state.
    pub fn new(
        history_capacity: usize,
        sync_enabled: bool,
        local_name: impl Into<String>,
    ) -> Self {
        let history_capacity = history_capacity.max(1);
        Self {
            history: VecDeque::with_capacity(history_capacity),
            history_capacity,
            peers: Vec::new(),
            sync_enabled,
            should_quit: false,
            size: (0, 0),
            local_name: local_name.into(),
        }
    }

    /// Apply one action.
    pub fn reduce(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::ToggleSync => self.sync_enabled = !self.sync_enabled,
            Action::ClearHistory => self.history.clear(),
            Action::ClipSent { content, timestamp } => self.push_history(HistoryEntry {
                content,
                timestamp,
                origin: ClipOrigin::Local,
                peer_name: self.local_name.clone(),
            }),
            Action::ClipReceived {
                content,
                timestamp,
                peer_name,
            } => self.push_history(HistoryEntry {
                content,
                timestamp,
                origin: ClipOrigin::Remote,
                peer_name,
            }),
            Action::PeerConnected { peer_id, name } => {
                if let Some(peer) = self.peers.iter_mut().find(|p| p.id == peer_id) {
                    peer.name = name;
                } else {
                    self.peers.push(PeerEntry { id: peer_id, name });
                }
            }
            Action::PeerDisconnected { peer_id } => self.peers.retain(|p| p.id != peer_id),
            Action::Resize(width, height) => self.size = (width, height),
            Action::None => {}
        }
    }

    fn push_history(&mut self, entry: HistoryEntry) {
        while self.history.len() >= self.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sent(content: &str) -> Action {
        Action::ClipSent {
            content: content.to_string(),
            timestamp: Utc::now(),
        }
    }

    fn connected(id: &str, name: &str) -> Action {
        Action::PeerConnected {
            peer_id: PeerId::new(id),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_history_is_bounded_fifo() {
        let mut state = AppState::default();
        for i in 0..60 {
            state.reduce(sent(&format!("clip {i}")));
        }

        assert_eq!(state.history.len(), 50);
        assert_eq!(state.history.front().unwrap().content, "clip 10");
        assert_eq!(state.history.back().unwrap().content, "clip 59");
    }

    #[test]
    fn test_custom_capacity() {
        let mut state = AppState::new(2, true, "office");
        state.reduce(sent("a"));
        state.reduce(Action::ClipReceived {
            content: "b".to_string(),
            timestamp: Utc::now(),
            peer_name: "desk".to_string(),
        });
        state.reduce(sent("c"));

        let contents: Vec<_> = state.history.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, ["b", "c"]);
        assert_eq!(state.history[0].origin, ClipOrigin::Remote);
        assert_eq!(state.history[0].peer_name, "desk");
        assert_eq!(state.history[1].origin, ClipOrigin::Local);
        assert_eq!(state.history[1].peer_name, "office");
    }

    #[test]
    fn test_local_entries_carry_device_name() {
        let mut state = AppState::new(5, true, "desk-pc");
        state.reduce(sent("copied here"));

        let entry = state.history.back().unwrap();
        assert_eq!(entry.origin, ClipOrigin::Local);
        assert_eq!(entry.peer_name, "desk-pc");
    }

    #[test]
    fn test_peer_upsert_and_remove() {
        let mut state = AppState::default();
        state.reduce(connected("p1", "laptop"));
        state.reduce(connected("p2", "desk"));
        state.reduce(connected("p1", "work laptop"));

        assert_eq!(state.peers.len(), 2);
        assert_eq!(state.peers[0].name, "work laptop");
        assert_eq!(state.peers[1].name, "desk");

        state.reduce(Action::PeerDisconnected {
            peer_id: PeerId::new("p1"),
        });
        assert_eq!(state.peers.len(), 1);
        assert_eq!(state.peers[0].id, PeerId::new("p2"));

        // Unknown peer: nothing changes.
        state.reduce(Action::PeerDisconnected {
            peer_id: PeerId::new("ghost"),
        });
        assert_eq!(state.peers.len(), 1);
    }

    #[test]
    fn test_toggle_and_clear() {
        let mut state = AppState::new(10, true, "office");
        state.reduce(sent("keep peers"));
        state.reduce(connected("p1", "laptop"));

        state.reduce(Action::ToggleSync);
        assert!(!state.sync_enabled);
        state.reduce(Action::ToggleSync);
        assert!(state.sync_enabled);

        state.reduce(Action::ClearHistory);
        assert!(state.history.is_empty());
        assert_eq!(state.peers.len(), 1);
    }

    #[test]
    fn test_quit_and_resize() {
        let mut state = AppState::default();
        state.reduce(Action::None);
        assert!(!state.should_quit);

        state.reduce(Action::Resize(120, 40));
        assert_eq!(state.size, (120, 40));

        state.reduce(Action::Quit);
        assert!(state.should_quit);
    }
}
