//! Dashboard command implementation.

use anyhow::Result;

use cliplink_core::sync::SyncRuntime;

use super::{RunArgs, TuiArgs};
use crate::tui::TuiOptions;

/// Start syncing and show the dashboard until the user quits.
pub async fn run(run: RunArgs, args: TuiArgs) -> Result<()> {
    let mut config = run.effective_config();
    if let Some(theme) = args.theme {
        config.ui.theme = theme;
    }

    let (runtime, events) = SyncRuntime::start(&config).await?;

    let options = TuiOptions {
        device_name: config.general.device_name.clone(),
        history_capacity: config.ui.history_capacity,
        theme: config.ui.theme.clone(),
        logging_to_file: run.log_file.is_some(),
    };
    let result = crate::tui::run(options, runtime.switch(), events).await;

    runtime.stop().await;
    result
}
