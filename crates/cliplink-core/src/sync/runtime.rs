//! Runtime wiring: clipboard, transport, discovery and the coordinator.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{SyncCoordinator, SyncEvent, SyncSwitch, EVENT_CHANNEL_CAPACITY};
use crate::clipboard::{create_clipboard, ClipboardAccess, ClipboardWatcher, WatcherHandle};
use crate::config::Config;
use crate::discovery::{should_dial, DiscoveredPeer};
use crate::error::Result;
use crate::protocol::MessageProtocol;
use crate::transport::{
    ConnectionNotifier, PeerId, TcpTransport, Transport, TransportConfig,
};

#[cfg(feature = "mdns")]
use crate::discovery::mdns::{MdnsDiscovery, MdnsProperties};

/// How often manually configured peers are re-dialed while disconnected.
const MANUAL_REDIAL_INTERVAL: Duration = Duration::from_secs(10);

/// Capacity of the internal pipeline channels.
const PIPELINE_CHANNEL_CAPACITY: usize = 32;

/// A running sync node.
///
/// Owns every background task. [`SyncRuntime::stop`] shuts them down;
/// dropping the runtime cancels them without waiting.
pub struct SyncRuntime {
    local_id: PeerId,
    transport: Arc<TcpTransport>,
    coordinator: Arc<SyncCoordinator>,
    switch: SyncSwitch,
    shutdown: CancellationToken,
    watcher: Option<WatcherHandle>,
    tasks: Vec<JoinHandle<()>>,
    #[cfg(feature = "mdns")]
    discovery: Option<MdnsDiscovery>,
}

impl SyncRuntime {
    /// Start syncing the system clipboard.
    ///
    /// # Errors
    ///
    /// Returns an error if the clipboard is unavailable, the listener cannot
    /// be bound or mDNS cannot start. Nothing keeps running in that case.
    pub async fn start(config: &Config) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        let clipboard: Arc<dyn ClipboardAccess> = Arc::new(create_clipboard()?);
        Self::start_with_clipboard(config, clipboard).await
    }

    /// Start syncing the given clipboard.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the listener cannot
    /// be bound or mDNS cannot start.
    pub async fn start_with_clipboard(
        config: &Config,
        clipboard: Arc<dyn ClipboardAccess>,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;

        let shutdown = CancellationToken::new();
        let local_id = PeerId::random();

        let transport_config = TransportConfig {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], config.network.port)),
            connect_timeout: config.network.connect_timeout,
        };
        let (transport, channels) =
            TcpTransport::bind(local_id.clone(), transport_config, shutdown.clone()).await?;

        let (found_tx, found_rx) = mpsc::channel::<DiscoveredPeer>(PIPELINE_CHANNEL_CAPACITY);

        #[cfg(feature = "mdns")]
        let discovery = if config.network.mdns {
            let properties = MdnsProperties {
                peer_id: local_id.clone(),
                device_name: config.general.device_name.clone(),
                port: transport.local_addr().port(),
            };
            match MdnsDiscovery::start(&properties, found_tx.clone(), shutdown.clone()) {
                Ok(discovery) => Some(discovery),
                Err(e) => {
                    shutdown.cancel();
                    return Err(e);
                }
            }
        } else {
            None
        };
        #[cfg(not(feature = "mdns"))]
        if config.network.mdns {
            tracing::warn!("Built without mDNS support; only configured peers are dialed");
        }
        drop(found_tx);

        let protocol = Arc::new(MessageProtocol::with_send_timeout(
            Arc::clone(&transport) as Arc<dyn Transport>,
            config.network.send_timeout,
        ));
        let switch = SyncSwitch::new(config.sync.start_enabled);
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let coordinator = Arc::new(SyncCoordinator::new(
            Arc::clone(&clipboard),
            Arc::clone(&protocol),
            switch.clone(),
            config.general.device_name.clone(),
            events_tx,
        ));

        let (inbound_tx, inbound_rx) = mpsc::channel(PIPELINE_CHANNEL_CAPACITY);
        let (lifecycle_tx, lifecycle_rx) = mpsc::channel(PIPELINE_CHANNEL_CAPACITY);

        let mut tasks = vec![
            tokio::spawn(Arc::clone(&protocol).serve(
                channels.streams,
                inbound_tx,
                shutdown.clone(),
            )),
            tokio::spawn(ConnectionNotifier::run(
                channels.events,
                lifecycle_tx,
                shutdown.clone(),
            )),
        ];

        let (changes_rx, watcher) =
            ClipboardWatcher::with_interval(config.sync.poll_interval).start(clipboard);

        tasks.push(tokio::spawn(Arc::clone(&coordinator).run(
            changes_rx,
            inbound_rx,
            lifecycle_rx,
            shutdown.clone(),
        )));

        tasks.push(tokio::spawn(dial_discovered(
            Arc::clone(&transport),
            found_rx,
            shutdown.clone(),
        )));

        for &addr in &config.network.peers {
            tasks.push(tokio::spawn(dial_manual(
                Arc::clone(&transport),
                addr,
                shutdown.clone(),
            )));
        }

        tracing::info!(
            peer_id = %local_id,
            addr = %transport.local_addr(),
            name = %config.general.device_name,
            sync = switch.is_enabled(),
            "Sync runtime started"
        );

        Ok((
            Self {
                local_id,
                transport,
                coordinator,
                switch,
                shutdown,
                watcher: Some(watcher),
                tasks,
                #[cfg(feature = "mdns")]
                discovery,
            },
            events_rx,
        ))
    }

    /// This node's peer id.
    #[must_use]
    pub fn local_id(&self) -> &PeerId {
        &self.local_id
    }

    /// Address the transport listens on.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    /// Handle to the sync on/off switch.
    #[must_use]
    pub fn switch(&self) -> SyncSwitch {
        self.switch.clone()
    }

    /// The coordinator driving this runtime.
    #[must_use]
    pub fn coordinator(&self) -> &Arc<SyncCoordinator> {
        &self.coordinator
    }

    /// Currently connected peers.
    #[must_use]
    pub fn connected_peers(&self) -> Vec<PeerId> {
        self.transport.connected_peers()
    }

    /// Dial a peer directly.
    ///
    /// # Errors
    ///
    /// Returns an error if the peer cannot be reached.
    pub async fn connect(&self, addr: SocketAddr) -> Result<PeerId> {
        self.transport.connect(addr).await
    }

    /// Stop every task and wait for them to finish.
    pub async fn stop(mut self) {
        tracing::debug!("Stopping sync runtime");
        if let Some(watcher) = self.watcher.take() {
            watcher.stop().await;
        }
        self.shutdown.cancel();

        #[cfg(feature = "mdns")]
        if let Some(discovery) = self.discovery.take() {
            discovery.shutdown().await;
        }

        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                tracing::warn!("Sync task failed: {e}");
            }
        }
        tracing::info!("Sync runtime stopped");
    }
}

impl Drop for SyncRuntime {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn dial_discovered(
    transport: Arc<TcpTransport>,
    mut found_rx: mpsc::Receiver<DiscoveredPeer>,
    shutdown: CancellationToken,
) {
    loop {
        let peer = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            peer = found_rx.recv() => match peer {
                Some(peer) => peer,
                None => break,
            },
        };

        if !should_dial(transport.as_ref(), &peer) {
            continue;
        }

        let transport = Arc::clone(&transport);
        tokio::spawn(async move {
            if let Err(e) = transport.connect(peer.address).await {
                tracing::debug!(
                    peer = %peer.peer_id,
                    addr = %peer.address,
                    "Failed to dial discovered peer: {e}"
                );
            }
        });
    }
}

async fn dial_manual(transport: Arc<TcpTransport>, addr: SocketAddr, shutdown: CancellationToken) {
    let mut known: Option<PeerId> = None;
    loop {
        let connected = known
            .as_ref()
            .is_some_and(|peer| transport.connection_count(peer) > 0);

        if !connected {
            match transport.connect(addr).await {
                Ok(peer) => known = Some(peer),
                Err(e) => tracing::debug!(%addr, "Failed to dial configured peer: {e}"),
            }
        }

        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            () = tokio::time::sleep(MANUAL_REDIAL_INTERVAL) => {}
        }
    }
}
