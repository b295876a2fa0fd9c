//! mDNS/DNS-SD advertisement and browsing.
//!
//! ## Service Type
//!
//! Cliplink registers as `_cliplink._tcp.local.` on the transport port, with
//! TXT records carrying the peer id and device name.

use std::net::SocketAddr;
use std::time::Duration;

use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::DiscoveredPeer;
use crate::error::{Error, Result};
use crate::transport::PeerId;

/// mDNS service type for Cliplink.
pub const SERVICE_TYPE: &str = "_cliplink._tcp.local.";

/// TXT record keys for service properties.
pub mod txt_keys {
    /// Peer id key
    pub const PEER_ID: &str = "peer_id";
    /// Device name key
    pub const DEVICE_NAME: &str = "device_name";
    /// Protocol version key
    pub const VERSION: &str = "version";
}

/// How long to wait for the daemon to confirm unregister/shutdown.
const DAEMON_REPLY_TIMEOUT: Duration = Duration::from_millis(500);

/// Properties advertised for this process.
#[derive(Debug, Clone)]
pub struct MdnsProperties {
    /// Transport peer id
    pub peer_id: PeerId,
    /// Device display name
    pub device_name: String,
    /// Transport listen port
    pub port: u16,
}

impl MdnsProperties {
    /// Convert to TXT record properties.
    #[must_use]
    pub fn to_txt_properties(&self) -> Vec<(&str, String)> {
        vec![
            (txt_keys::PEER_ID, self.peer_id.to_string()),
            (txt_keys::DEVICE_NAME, self.device_name.clone()),
            (txt_keys::VERSION, crate::PROTOCOL_ID.to_string()),
        ]
    }

    fn instance_name(&self) -> String {
        let short: String = self.peer_id.as_str().chars().take(12).collect();
        format!("cliplink-{short}")
    }
}

impl DiscoveredPeer {
    /// Parse from a resolved ServiceInfo.
    fn from_service_info(info: &ServiceInfo) -> Option<Self> {
        let properties = info.get_properties();
        let get_str =
            |key: &str| -> Option<String> { properties.get(key).map(|p| p.val_str().to_string()) };

        let peer_id = get_str(txt_keys::PEER_ID).filter(|id| !id.is_empty())?;
        let device_name = get_str(txt_keys::DEVICE_NAME).unwrap_or_default();

        let ip = info.get_addresses().iter().find(|addr| addr.is_ipv4()).copied()?;

        Some(Self {
            peer_id: PeerId::new(peer_id),
            device_name,
            address: SocketAddr::new(ip, info.get_port()),
        })
    }
}

/// Advertises this process and reports other Cliplink peers.
pub struct MdnsDiscovery {
    /// The mDNS daemon (wrapped in Option to support Drop)
    daemon: Option<ServiceDaemon>,
    fullname: String,
    browse_task: Option<JoinHandle<()>>,
}

impl MdnsDiscovery {
    /// Register our service and start browsing.
    ///
    /// Discovered peers other than ourselves are sent on `found_tx` until
    /// `shutdown` is cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DiscoveryError`] if the daemon cannot start or the
    /// service cannot be registered.
    pub fn start(
        properties: &MdnsProperties,
        found_tx: mpsc::Sender<DiscoveredPeer>,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let daemon = ServiceDaemon::new()
            .map_err(|e| Error::DiscoveryError(format!("mDNS daemon error: {e}")))?;

        let instance_name = properties.instance_name();
        let txt_props = properties.to_txt_properties();
        let host = mdns_hostname();

        let service_info = ServiceInfo::new(
            SERVICE_TYPE,
            &instance_name,
            &host,
            (),
            properties.port,
            txt_props.as_slice(),
        )
        .map_err(|e| Error::DiscoveryError(format!("invalid mDNS service info: {e}")))?
        .enable_addr_auto();
        let fullname = service_info.get_fullname().to_string();

        daemon
            .register(service_info)
            .map_err(|e| Error::DiscoveryError(format!("failed to register service: {e}")))?;

        let receiver = daemon
            .browse(SERVICE_TYPE)
            .map_err(|e| Error::DiscoveryError(format!("failed to browse services: {e}")))?;

        tracing::info!(instance = %instance_name, port = properties.port, "Registered mDNS service");

        let local_id = properties.peer_id.clone();
        let browse_task = tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    () = shutdown.cancelled() => break,
                    event = receiver.recv_async() => match event {
                        Ok(event) => event,
                        Err(_) => break,
                    },
                };

                let ServiceEvent::ServiceResolved(info) = event else {
                    continue;
                };
                let Some(peer) = DiscoveredPeer::from_service_info(&info) else {
                    tracing::debug!(name = info.get_fullname(), "Ignoring incomplete mDNS record");
                    continue;
                };
                if peer.peer_id == local_id {
                    continue;
                }

                tracing::debug!(
                    peer = %peer.peer_id,
                    device = %peer.device_name,
                    addr = %peer.address,
                    "Found peer via mDNS"
                );
                if found_tx.send(peer).await.is_err() {
                    break;
                }
            }
            tracing::debug!("mDNS browse task stopped");
        });

        Ok(Self {
            daemon: Some(daemon),
            fullname,
            browse_task: Some(browse_task),
        })
    }

    /// Unregister, stop browsing and shut the daemon down.
    pub async fn shutdown(mut self) {
        if let Some(task) = self.browse_task.take() {
            task.abort();
        }

        let Some(daemon) = self.daemon.take() else {
            return;
        };

        if let Ok(receiver) = daemon.unregister(&self.fullname) {
            match tokio::time::timeout(DAEMON_REPLY_TIMEOUT, receiver.recv_async()).await {
                Ok(Ok(status)) => tracing::debug!(?status, "mDNS unregister completed"),
                Ok(Err(_)) | Err(_) => tracing::debug!("mDNS unregister did not confirm"),
            }
        }
        if let Err(e) = daemon.stop_browse(SERVICE_TYPE) {
            tracing::debug!("Failed to stop mDNS browse: {e}");
        }
        shutdown_daemon(&daemon);
    }
}

impl Drop for MdnsDiscovery {
    fn drop(&mut self) {
        if let Some(task) = self.browse_task.take() {
            task.abort();
        }
        if let Some(daemon) = self.daemon.take() {
            shutdown_daemon(&daemon);
        }
    }
}

fn shutdown_daemon(daemon: &ServiceDaemon) {
    match daemon.shutdown() {
        Ok(receiver) => match receiver.recv_timeout(DAEMON_REPLY_TIMEOUT) {
            Ok(status) => tracing::debug!(?status, "mDNS daemon shutdown completed"),
            Err(flume::RecvTimeoutError::Timeout) => {
                tracing::debug!("mDNS daemon shutdown timed out");
            }
            Err(flume::RecvTimeoutError::Disconnected) => {
                tracing::debug!("mDNS daemon shutdown channel disconnected");
            }
        },
        Err(e) => tracing::debug!("mDNS daemon shutdown failed: {e}"),
    }
}

/// Host name in the `.local.` form mDNS expects.
fn mdns_hostname() -> String {
    let raw = hostname::get().map_or_else(
        |_| "localhost".to_string(),
        |h| h.to_string_lossy().to_string(),
    );

    if raw.ends_with(".local.") {
        raw
    } else if raw.to_lowercase().ends_with(".local") {
        format!("{raw}.")
    } else {
        format!("{raw}.local.")
    }
}
