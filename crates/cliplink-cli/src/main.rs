//! Cliplink CLI - local network clipboard sync
//!
//! Every machine running Cliplink on the same network shares one text
//! clipboard. Copy on one, paste on any other.
//!
//! ## Quick Start
//!
//! ```bash
//! # Dashboard (default)
//! cliplink
//!
//! # No UI, dial a peer directly when multicast is blocked
//! cliplink headless --peer 192.168.1.20
//! ```

#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]
#![allow(clippy::struct_excessive_bools)]

use std::fs::OpenOptions;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;

mod commands;
mod tui;

use commands::{Cli, Command, TuiArgs};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or_else(|| Command::Tui(TuiArgs::default()));

    let console = !matches!(command, Command::Tui(_));
    if let Err(e) = init_logging(cli.run.verbose, cli.run.log_file.as_deref(), console) {
        eprintln!("  Error: {e:#}");
        return ExitCode::FAILURE;
    }

    let result = match command {
        Command::Tui(args) => commands::tui::run(cli.run, args).await,
        Command::Headless(args) => commands::headless::run(cli.run, args).await,
        Command::Config(args) => commands::config::run(cli.run, args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn report_error(error: &anyhow::Error) {
    eprintln!();
    eprintln!("  Error: {error:#}");

    if let Some(hint) = error
        .downcast_ref::<cliplink_core::Error>()
        .and_then(cliplink_core::Error::suggestion)
    {
        eprintln!();
        for line in hint.lines() {
            eprintln!("  {line}");
        }
    }
    eprintln!();
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `verbose`. With `log_file` set, logs go only to that
/// file; otherwise they go to stderr when `console` is true and nowhere when
/// it is false.
fn init_logging(verbose: bool, log_file: Option<&Path>, console: bool) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default_directives = if verbose {
        "warn,cliplink=debug,cliplink_core=debug"
    } else {
        "warn,cliplink=info,cliplink_core=info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };
    let console_layer = (console && log_file.is_none()).then(|| {
        fmt::layer()
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(filter)
        .init();
    Ok(())
}
