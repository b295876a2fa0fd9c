//! Headless command implementation.
//!
//! Runs the same sync node as the dashboard and prints one line per event
//! until Ctrl+C.

use std::sync::Arc;

use anyhow::Result;
use chrono::Local;

use cliplink_core::clipboard::{create_clipboard, preview, ClipboardAccess, MemoryClipboard};
use cliplink_core::protocol::display_name;
use cliplink_core::sync::{SyncEvent, SyncRuntime};

use super::{HeadlessArgs, RunArgs};
use crate::tui::view::format_time;

const PREVIEW_LEN: usize = 60;

/// Sync until interrupted.
pub async fn run(run: RunArgs, args: HeadlessArgs) -> Result<()> {
    let config = run.effective_config();

    let clipboard: Arc<dyn ClipboardAccess> = if args.memory_clipboard {
        Arc::new(MemoryClipboard::new())
    } else {
        Arc::new(create_clipboard()?)
    };
    let (runtime, mut events) = SyncRuntime::start_with_clipboard(&config, clipboard).await?;

    if !args.json {
        println!();
        println!("Cliplink Headless Sync");
        println!("{}", "-".repeat(37));
        println!();
        println!("  Device:    {}", config.general.device_name);
        println!("  Peer ID:   {}", runtime.local_id());
        println!("  Listening: {}", runtime.local_addr());
        println!(
            "  Sync:      {}",
            if runtime.switch().is_enabled() { "ON" } else { "OFF" }
        );
        println!();
        println!("  Press Ctrl+C to stop.");
        println!();
    }

    let outcome = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => break signal.map_err(anyhow::Error::from),
            event = events.recv() => match event {
                Some(event) => {
                    if args.json {
                        println!("{}", serde_json::to_string(&event)?);
                    } else {
                        println!("{}", format_event(&event));
                    }
                }
                None => break Ok(()),
            },
        }
    };

    drop(events);
    runtime.stop().await;

    if !args.json {
        println!();
        println!("  Stopped.");
    }
    outcome
}

/// One human-readable line for a sync event.
fn format_event(event: &SyncEvent) -> String {
    match event {
        SyncEvent::ClipSent { content, timestamp } => format!(
            "  {:>8}  [Local]   {}",
            format_time(&timestamp.with_timezone(&Local)),
            preview(content, PREVIEW_LEN)
        ),
        SyncEvent::ClipReceived {
            content,
            timestamp,
            peer_name,
            ..
        } => format!(
            "  {:>8}  [Remote]  {}  (from {peer_name})",
            format_time(&timestamp.with_timezone(&Local)),
            preview(content, PREVIEW_LEN)
        ),
        SyncEvent::PeerConnected { name, .. } => format!("  + {name} connected"),
        SyncEvent::PeerDisconnected { peer_id } => {
            format!("  - {} disconnected", display_name(peer_id, None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cliplink_core::transport::PeerId;

    #[test]
    fn test_format_peer_events() {
        let connected = SyncEvent::PeerConnected {
            peer_id: PeerId::new("0123456789abcdef"),
            name: "desk".to_string(),
        };
        assert_eq!(format_event(&connected), "  + desk connected");

        let gone = SyncEvent::PeerDisconnected {
            peer_id: PeerId::new("0123456789abcdef"),
        };
        assert_eq!(format_event(&gone), "  - 01234567... disconnected");
    }

    #[test]
    fn test_format_clip_events() {
        let sent = SyncEvent::ClipSent {
            content: "multi\nline".to_string(),
            timestamp: Utc::now(),
        };
        let line = format_event(&sent);
        assert!(line.contains("[Local]"));
        assert!(line.ends_with("multi line"));

        let received = SyncEvent::ClipReceived {
            content: "hi".to_string(),
            timestamp: Utc::now(),
            peer_id: PeerId::new("p"),
            peer_name: "laptop".to_string(),
        };
        assert!(format_event(&received).ends_with("hi  (from laptop)"));
    }
}
