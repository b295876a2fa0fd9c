//! # Cliplink Core Library
//!
//! `cliplink-core` provides the core functionality for Cliplink, a local
//! network clipboard synchronization tool.
//!
//! ## Features
//!
//! - **Zero setup**: peers find each other via mDNS, or are dialed directly
//! - **Loop-free replication**: remote writes are never re-broadcast as local changes
//! - **Best-effort broadcast**: one slow or dead peer never blocks the others
//!
//! ## Modules
//!
//! - [`clipboard`] - Clipboard access and change polling
//! - [`config`] - Configuration management
//! - [`discovery`] - Peer discovery via mDNS
//! - [`protocol`] - Line-delimited clip message protocol
//! - [`sync`] - Sync coordinator and runtime wiring
//! - [`transport`] - Peer connections, streams and connection lifecycle
//!
//! ## Example
//!
//! ```rust,ignore
//! use cliplink_core::config::Config;
//! use cliplink_core::sync::SyncRuntime;
//!
//! let (runtime, mut events) = SyncRuntime::start(&Config::load()?).await?;
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! runtime.stop().await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::must_use_candidate)]

pub mod clipboard;
pub mod config;
pub mod discovery;
pub mod error;
pub mod protocol;
pub mod sync;
pub mod transport;

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol identifier exchanged in every connection hello
pub const PROTOCOL_ID: &str = "/cliplink/1.0.0";

/// Default TCP listen port
pub const DEFAULT_PORT: u16 = 52700;

/// Default clipboard polling interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Default number of history entries kept by the dashboard
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;
