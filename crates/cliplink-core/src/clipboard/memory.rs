//! In-memory clipboard.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use crate::error::{Error, Result};

use super::ClipboardAccess;

/// Clipboard that stores text in memory.
///
/// `set_content` simulates a copy made by another application; it is not
/// counted as a write. Reads can be made to fail to exercise transient error
/// handling.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    content: RwLock<String>,
    fail_reads: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryClipboard {
    /// Create an empty clipboard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clipboard already holding `content`.
    #[must_use]
    pub fn with_content(content: impl Into<String>) -> Self {
        let clipboard = Self::default();
        clipboard.set_content(content);
        clipboard
    }

    /// Replace the content as if another application had copied it.
    pub fn set_content(&self, content: impl Into<String>) {
        if let Ok(mut guard) = self.content.write() {
            *guard = content.into();
        }
    }

    /// Current content.
    #[must_use]
    pub fn content(&self) -> String {
        self.content.read().map(|c| c.clone()).unwrap_or_default()
    }

    /// Make subsequent reads fail (or succeed again).
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Number of successful [`ClipboardAccess::write`] calls.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl ClipboardAccess for MemoryClipboard {
    fn read(&self) -> Result<String> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::ClipboardError("simulated read failure".to_string()));
        }
        self.content
            .read()
            .map(|c| c.clone())
            .map_err(|_| Error::Internal("clipboard lock poisoned".to_string()))
    }

    fn write(&self, content: &str) -> Result<()> {
        let mut guard = self
            .content
            .write()
            .map_err(|_| Error::Internal("clipboard lock poisoned".to_string()))?;
        *guard = content.to_string();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
