//! Clipboard synchronization.
//!
//! The [`SyncCoordinator`] is where local changes, remote messages and peer
//! lifecycle events meet. It keeps two pieces of state behind one lock:
//!
//! - `last_synced_content`: the last text sent or accepted. Remote messages
//!   carrying this text are dropped as already synchronized.
//! - `suppress_next_local_change`: set just before a remote message is
//!   written to the local clipboard, so the watcher's next detection (the
//!   write itself) is not broadcast back.
//!
//! [`SyncRuntime`] wires the coordinator to a real clipboard, the TCP
//! transport and discovery.

pub mod coordinator;
pub mod runtime;

pub use coordinator::{CoordinatorState, SyncCoordinator};
pub use runtime::SyncRuntime;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::transport::PeerId;

/// Capacity of the sync event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Shared on/off switch for synchronization.
///
/// Cloning yields another handle to the same flag; the UI flips it and the
/// coordinator reads it at decision time.
#[derive(Debug, Clone)]
pub struct SyncSwitch(Arc<AtomicBool>);

impl SyncSwitch {
    /// Create a switch with the given initial state.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    /// Whether sync is currently enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Enable or disable sync.
    pub fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::SeqCst);
    }

    /// Flip the switch and return the new state.
    pub fn toggle(&self) -> bool {
        !self.0.fetch_xor(true, Ordering::SeqCst)
    }
}

impl Default for SyncSwitch {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Notification published by the coordinator for the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    /// A local change was broadcast
    ClipSent {
        /// Clipboard text
        content: String,
        /// When the change was observed
        timestamp: DateTime<Utc>,
    },
    /// A remote change was written to the local clipboard
    ClipReceived {
        /// Clipboard text
        content: String,
        /// Sender's timestamp
        timestamp: DateTime<Utc>,
        /// Sender id
        peer_id: PeerId,
        /// Sender display name
        peer_name: String,
    },
    /// First connection to a peer
    PeerConnected {
        /// Peer id
        peer_id: PeerId,
        /// Display name at connect time
        name: String,
    },
    /// Last connection to a peer closed
    PeerDisconnected {
        /// Peer id
        peer_id: PeerId,
    },
}
