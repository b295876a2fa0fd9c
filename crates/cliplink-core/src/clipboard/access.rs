//! Native clipboard access.
//!
//! This module reads and writes the OS clipboard using the `arboard` crate.

use std::sync::Mutex;

use arboard::Clipboard;

use crate::error::{Error, Result};

use super::ClipboardAccess;

/// Native clipboard implementation using arboard.
///
/// `arboard::Clipboard` needs `&mut self`, so calls are serialized through a
/// mutex.
pub struct NativeClipboard {
    clipboard: Mutex<Clipboard>,
}

impl NativeClipboard {
    /// Create a new native clipboard accessor.
    ///
    /// # Errors
    ///
    /// Returns an error if clipboard cannot be accessed.
    pub fn new() -> Result<Self> {
        let clipboard = Clipboard::new()
            .map_err(|e| Error::ClipboardError(format!("failed to access clipboard: {e}")))?;
        Ok(Self {
            clipboard: Mutex::new(clipboard),
        })
    }

    fn with_clipboard<T>(&self, f: impl FnOnce(&mut Clipboard) -> Result<T>) -> Result<T> {
        let mut guard = self
            .clipboard
            .lock()
            .map_err(|_| Error::Internal("clipboard lock poisoned".to_string()))?;
        f(&mut guard)
    }
}

impl ClipboardAccess for NativeClipboard {
    fn read(&self) -> Result<String> {
        self.with_clipboard(|clipboard| match clipboard.get_text() {
            Ok(text) => {
                tracing::trace!("Clipboard: read {} bytes of text", text.len());
                Ok(text)
            }
            Err(arboard::Error::ContentNotAvailable) => Err(Error::ClipboardEmpty),
            Err(e) => Err(Error::ClipboardError(format!("failed to read text: {e}"))),
        })
    }

    fn write(&self, content: &str) -> Result<()> {
        self.with_clipboard(|clipboard| {
            clipboard
                .set_text(content.to_string())
                .map_err(|e| Error::ClipboardError(format!("failed to set text: {e}")))?;
            tracing::trace!("Clipboard: wrote {} bytes of text", content.len());
            Ok(())
        })
    }
}

/// Create the platform clipboard accessor.
///
/// # Errors
///
/// Returns an error if no clipboard backend is available (for example a
/// headless Linux session).
pub fn create_clipboard() -> Result<NativeClipboard> {
    NativeClipboard::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests require a display server on Linux (X11/Wayland).
    // They are skipped in headless CI environments.

    #[test]
    fn test_clipboard_text_roundtrip() {
        let Ok(clipboard) = create_clipboard() else {
            eprintln!("Skipping clipboard test (no display available)");
            return;
        };

        if clipboard.write("Cliplink test content").is_err() {
            eprintln!("Skipping clipboard test (write failed)");
            return;
        }

        match clipboard.read() {
            Ok(text) => assert_eq!(text, "Cliplink test content"),
            Err(e) => eprintln!("Skipping clipboard test (read failed: {e})"),
        }
    }
}
