//! TUI application main loop.

use std::io::{self, Stdout};
use std::time::Duration;

use anyhow::Result;
use crossterm::event::Event;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;

use cliplink_core::sync::{SyncEvent, SyncSwitch};

use super::action::Action;
use super::event::{map_key_event, EventHandler};
use super::state::AppState;
use super::theme::Theme;
use super::view;

/// How long the loop waits for a terminal event before redrawing.
const TICK_RATE: Duration = Duration::from_millis(250);

/// How long the input task blocks in one terminal poll.
const INPUT_POLL: Duration = Duration::from_millis(100);

/// Main TUI application.
pub struct App {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    state: AppState,
    events: EventHandler,
    sync_events: mpsc::Receiver<SyncEvent>,
    switch: SyncSwitch,
    theme: Theme,
}

impl App {
    /// Enter the alternate screen and set up the dashboard.
    pub fn new(
        state: AppState,
        switch: SyncSwitch,
        sync_events: mpsc::Receiver<SyncEvent>,
        theme: Theme,
    ) -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = stdout.execute(EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e.into());
        }

        let backend = CrosstermBackend::new(stdout);
        let terminal = match Terminal::new(backend) {
            Ok(terminal) => terminal,
            Err(e) => {
                let _ = disable_raw_mode();
                let _ = io::stdout().execute(LeaveAlternateScreen);
                return Err(e.into());
            }
        };

        Ok(Self {
            terminal,
            state,
            events: EventHandler::new(INPUT_POLL),
            sync_events,
            switch,
            theme,
        })
    }

    /// Run until the user quits.
    pub async fn run(&mut self) -> Result<()> {
        let size = self.terminal.size()?;
        self.state.size = (size.width, size.height);

        loop {
            self.poll_sync_events();

            self.draw()?;

            if let Ok(Some(event)) = tokio::time::timeout(TICK_RATE, self.events.next()).await {
                self.handle_event(&event);
            }

            if self.state.should_quit {
                break;
            }
        }

        self.events.cancel();
        Ok(())
    }

    fn poll_sync_events(&mut self) {
        while let Ok(event) = self.sync_events.try_recv() {
            self.state.reduce(Action::from(event));
        }
    }

    fn draw(&mut self) -> Result<()> {
        let state = &self.state;
        let theme = &self.theme;
        self.terminal
            .draw(|frame| view::draw(frame, state, theme))?;
        Ok(())
    }

    fn handle_event(&mut self, event: &Event) {
        let action = match event {
            Event::Key(key) => map_key_event(*key),
            Event::Resize(width, height) => Action::Resize(*width, *height),
            _ => Action::None,
        };
        self.handle_action(action);
    }

    fn handle_action(&mut self, action: Action) {
        let toggles = action == Action::ToggleSync;
        self.state.reduce(action);

        if toggles {
            self.switch.set(self.state.sync_enabled);
            tracing::info!(enabled = self.state.sync_enabled, "Sync toggled");
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = self.terminal.backend_mut().execute(LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}
