//! Tests for connection event deduplication.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use cliplink_core::transport::{
    ConnectionEventKind, ConnectionNotifier, PeerId, PeerLifecycle, RawConnectionEvent,
};

fn raw(peer: &str, kind: ConnectionEventKind, connections: usize) -> RawConnectionEvent {
    RawConnectionEvent {
        peer: PeerId::new(peer),
        kind,
        connections,
    }
}

/// Two links to one peer produce one connect and one disconnect.
#[tokio::test]
async fn test_redundant_links_collapse() {
    let (raw_tx, raw_rx) = mpsc::unbounded_channel();
    let (out_tx, mut out_rx) = mpsc::channel(8);
    let shutdown = CancellationToken::new();

    let notifier = tokio::spawn(ConnectionNotifier::run(raw_rx, out_tx, shutdown.clone()));

    raw_tx.send(raw("p1", ConnectionEventKind::Opened, 1)).unwrap();
    raw_tx.send(raw("p1", ConnectionEventKind::Opened, 2)).unwrap();

    let first = out_rx.recv().await.unwrap();
    assert_eq!(first, PeerLifecycle::Connected(PeerId::new("p1")));

    // One link remains.
    raw_tx.send(raw("p1", ConnectionEventKind::Closed, 1)).unwrap();
    let nothing = tokio::time::timeout(Duration::from_millis(50), out_rx.recv()).await;
    assert!(nothing.is_err());

    raw_tx.send(raw("p1", ConnectionEventKind::Closed, 0)).unwrap();
    let last = out_rx.recv().await.unwrap();
    assert_eq!(last, PeerLifecycle::Disconnected(PeerId::new("p1")));

    drop(raw_tx);
    notifier.await.unwrap();
    assert!(out_rx.recv().await.is_none());
}

/// Peers are tracked independently and a reconnect is reported again.
#[tokio::test]
async fn test_interleaved_peers_and_reconnect() {
    let (raw_tx, raw_rx) = mpsc::unbounded_channel();
    let (out_tx, mut out_rx) = mpsc::channel(8);

    let notifier = tokio::spawn(ConnectionNotifier::run(
        raw_rx,
        out_tx,
        CancellationToken::new(),
    ));

    for event in [
        raw("a", ConnectionEventKind::Opened, 1),
        raw("b", ConnectionEventKind::Opened, 1),
        raw("a", ConnectionEventKind::Closed, 0),
        raw("a", ConnectionEventKind::Opened, 1),
    ] {
        raw_tx.send(event).unwrap();
    }
    drop(raw_tx);
    notifier.await.unwrap();

    let mut seen = Vec::new();
    while let Some(event) = out_rx.recv().await {
        seen.push(event);
    }
    assert_eq!(
        seen,
        vec![
            PeerLifecycle::Connected(PeerId::new("a")),
            PeerLifecycle::Connected(PeerId::new("b")),
            PeerLifecycle::Disconnected(PeerId::new("a")),
            PeerLifecycle::Connected(PeerId::new("a")),
        ]
    );
}

/// Cancelling shutdown stops the notifier even with the source open.
#[tokio::test]
async fn test_shutdown_stops_notifier() {
    let (_raw_tx, raw_rx) = mpsc::unbounded_channel::<RawConnectionEvent>();
    let (out_tx, _out_rx) = mpsc::channel(1);
    let shutdown = CancellationToken::new();

    let notifier = tokio::spawn(ConnectionNotifier::run(raw_rx, out_tx, shutdown.clone()));
    shutdown.cancel();

    tokio::time::timeout(Duration::from_secs(1), notifier)
        .await
        .expect("notifier exits")
        .unwrap();
}
