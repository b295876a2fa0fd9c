//! CLI command definitions and handlers.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use cliplink_core::config::{parse_duration, Config};
use cliplink_core::transport::tcp::parse_peer_address;

pub mod config;
pub mod headless;
pub mod tui;

/// Load configuration with graceful fallback to defaults.
pub fn load_config() -> Config {
    match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Failed to load config, using defaults: {e}");
            Config::default()
        }
    }
}

/// Cliplink - share your clipboard with every machine on the LAN
#[derive(Parser, Debug)]
#[command(name = "cliplink")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Options shared by every command
    #[command(flatten)]
    pub run: RunArgs,

    /// The command to execute (defaults to the dashboard)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the terminal dashboard
    Tui(TuiArgs),

    /// Sync without a UI, printing one line per event
    Headless(HeadlessArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Options that override the config file for one run.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Device name announced to peers
    #[arg(long, global = true)]
    pub name: Option<String>,

    /// TCP listen port (0 picks any free port)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Peer to dial directly, as IP or IP:PORT (repeatable)
    #[arg(long = "peer", value_name = "ADDR", value_parser = parse_peer, global = true)]
    pub peers: Vec<SocketAddr>,

    /// Clipboard polling interval (e.g. 250ms, 1s)
    #[arg(long, value_name = "DURATION", value_parser = parse_duration, global = true)]
    pub poll_interval: Option<Duration>,

    /// Disable mDNS discovery
    #[arg(long, global = true)]
    pub no_mdns: bool,

    /// Start with sync switched off
    #[arg(long, global = true)]
    pub sync_off: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write logs to a file instead of the console
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

impl RunArgs {
    /// Apply these overrides on top of a loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(name) = &self.name {
            config.general.device_name.clone_from(name);
        }
        if let Some(port) = self.port {
            config.network.port = port;
        }
        for peer in &self.peers {
            if !config.network.peers.contains(peer) {
                config.network.peers.push(*peer);
            }
        }
        if let Some(interval) = self.poll_interval {
            config.sync.poll_interval = interval;
        }
        if self.no_mdns {
            config.network.mdns = false;
        }
        if self.sync_off {
            config.sync.start_enabled = false;
        }
    }

    /// Load the config file and apply these overrides.
    pub fn effective_config(&self) -> Config {
        let mut config = load_config();
        self.apply(&mut config);
        config
    }
}

fn parse_peer(s: &str) -> Result<SocketAddr, String> {
    parse_peer_address(s).map_err(|e| e.to_string())
}

/// Arguments for the dashboard.
#[derive(Args, Debug, Clone, Default)]
pub struct TuiArgs {
    /// Color theme (dark, light)
    #[arg(long)]
    pub theme: Option<String>,
}

/// Arguments for headless mode.
#[derive(Args, Debug, Clone, Default)]
pub struct HeadlessArgs {
    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Use an in-memory clipboard instead of the system one
    #[arg(long)]
    pub memory_clipboard: bool,
}

/// Arguments for config management.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Config action
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config actions
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Print the config file path
    Path,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
