//! Terminal dashboard for Cliplink.
//!
//! Shows connected peers and the recent sync history, and lets the user
//! toggle sync or clear the history.
//!
//! - `app`: terminal setup and the main loop
//! - `state`: dashboard state and its reducer
//! - `action`: the closed set of state changes
//! - `event`: terminal input and key mapping
//! - `view`: rendering
//! - `theme`: color themes

pub mod action;
pub mod app;
pub mod event;
pub mod state;
pub mod theme;
pub mod view;

use tokio::sync::mpsc;

use cliplink_core::sync::{SyncEvent, SyncSwitch};

pub use app::App;
pub use state::AppState;
pub use theme::Theme;

/// Dashboard settings.
#[derive(Debug, Clone)]
pub struct TuiOptions {
    /// This device's name
    pub device_name: String,
    /// Maximum history entries
    pub history_capacity: usize,
    /// Theme name
    pub theme: String,
    /// Logs go to a file, so they cannot reach the screen
    pub logging_to_file: bool,
}

/// Run the dashboard until the user quits.
pub async fn run(
    options: TuiOptions,
    switch: SyncSwitch,
    sync_events: mpsc::Receiver<SyncEvent>,
) -> anyhow::Result<()> {
    let _guard = (!options.logging_to_file).then(suppress_logging);

    let state = AppState::new(
        options.history_capacity,
        switch.is_enabled(),
        options.device_name,
    );
    let mut app = App::new(
        state,
        switch,
        sync_events,
        Theme::from_name(&options.theme),
    )?;
    app.run().await
}

/// Suppress console logging on this thread so it cannot draw over the
/// alternate screen. The previous subscriber is restored when the guard drops.
fn suppress_logging() -> tracing::subscriber::DefaultGuard {
    use tracing_subscriber::layer::SubscriberExt;

    let noop_subscriber =
        tracing_subscriber::registry().with(tracing_subscriber::filter::LevelFilter::OFF);

    tracing::subscriber::set_default(noop_subscriber)
}
