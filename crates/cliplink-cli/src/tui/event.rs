//! Terminal event handling.
//!
//! Terminal events are read on a background task and handed to the main
//! loop over a channel, so the loop can also drain sync events each tick.

use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::action::Action;

/// Event handler that polls for terminal events.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    cancel_token: CancellationToken,
}

impl EventHandler {
    /// Spawn the polling task.
    pub fn new(poll_timeout: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();

        tokio::task::spawn_blocking(move || {
            while !token.is_cancelled() {
                if event::poll(poll_timeout).unwrap_or(false) {
                    if let Ok(event) = event::read() {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Self { rx, cancel_token }
    }

    /// Stop the polling task.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Get the next event, if available.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

impl Drop for EventHandler {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Map a key press to an action.
pub fn map_key_event(key: KeyEvent) -> Action {
    if key.kind != KeyEventKind::Press {
        return Action::None;
    }

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('s' | 'S') => Action::ToggleSync,
        KeyCode::Char('c' | 'C') => Action::ClearHistory,
        _ => Action::None,
    }
}
