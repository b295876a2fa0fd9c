//! Clipboard access and change detection.
//!
//! - [`ClipboardAccess`] is the narrow read/write interface the rest of the
//!   crate depends on.
//! - [`NativeClipboard`] talks to the OS clipboard through `arboard`.
//! - [`MemoryClipboard`] keeps content in memory (tests and headless runs).
//! - [`ClipboardWatcher`] polls an accessor and reports changes.
//!
//! Only plain text is synchronized.

pub mod access;
pub mod memory;
pub mod watcher;

pub use access::{create_clipboard, NativeClipboard};
pub use memory::MemoryClipboard;
pub use watcher::{ClipboardWatcher, WatcherHandle, DEFAULT_POLL_INTERVAL};

use chrono::{DateTime, Utc};

use crate::error::Result;

/// Platform-agnostic clipboard access trait.
///
/// Implementations must tolerate concurrent calls from the polling task and
/// from the remote-write path.
pub trait ClipboardAccess: Send + Sync {
    /// Read the current clipboard text.
    ///
    /// # Errors
    ///
    /// Returns an error if the clipboard cannot be read or holds no text.
    fn read(&self) -> Result<String>;

    /// Replace the clipboard text.
    ///
    /// # Errors
    ///
    /// Returns an error if the clipboard cannot be written.
    fn write(&self, content: &str) -> Result<()>;
}

/// Notification that the local clipboard content changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipChange {
    /// The new clipboard text
    pub content: String,
    /// When the change was detected
    pub observed_at: DateTime<Utc>,
}

impl ClipChange {
    /// Create a change observed now.
    #[must_use]
    pub fn now(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            observed_at: Utc::now(),
        }
    }
}

/// Flatten clipboard text to a single line and truncate it for display.
///
/// Newlines become spaces, carriage returns are dropped, surrounding
/// whitespace is trimmed, and text longer than `max_len` characters is cut to
/// `max_len - 3` characters followed by `...`.
#[must_use]
pub fn preview(content: &str, max_len: usize) -> String {
    let flat = content.replace('\n', " ").replace('\r', "");
    let flat = flat.trim();

    if flat.chars().count() > max_len {
        let keep = max_len.saturating_sub(3);
        format!("{}...", flat.chars().take(keep).collect::<String>())
    } else {
        flat.to_string()
    }
}
