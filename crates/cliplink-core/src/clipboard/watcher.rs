//! Clipboard change detection.
//!
//! There is no universal cross-platform clipboard change notification API, so
//! changes are detected by polling and comparing against the last observed
//! text.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::{ClipChange, ClipboardAccess};

/// Default polling interval for clipboard changes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(crate::DEFAULT_POLL_INTERVAL_MS);

/// Capacity of the change channel.
const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Watches for clipboard changes via polling.
#[derive(Debug, Clone)]
pub struct ClipboardWatcher {
    poll_interval: Duration,
}

impl ClipboardWatcher {
    /// Create a new clipboard watcher with the default poll interval.
    #[must_use]
    pub fn new() -> Self {
        Self::with_interval(DEFAULT_POLL_INTERVAL)
    }

    /// Create a new clipboard watcher with a custom poll interval.
    #[must_use]
    pub fn with_interval(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    /// The configured poll interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Start watching for clipboard changes.
    ///
    /// The baseline is read once before this returns, so the content present
    /// at start never produces an event. If that read fails the baseline is
    /// empty.
    ///
    /// Returns the receiving end of the change channel and a handle that
    /// stops the polling task.
    pub fn start(
        &self,
        clipboard: Arc<dyn ClipboardAccess>,
    ) -> (mpsc::Receiver<ClipChange>, WatcherHandle) {
        let (tx, rx) = mpsc::channel(CHANGE_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let poll_interval = self.poll_interval;

        let baseline = clipboard.read().unwrap_or_else(|e| {
            tracing::debug!("Clipboard watcher: initial read failed: {e}");
            String::new()
        });

        let task = tokio::spawn(async move {
            let mut last_content = baseline;
            let mut ticker = tokio::time::interval_at(Instant::now() + poll_interval, poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => {
                        tracing::debug!("Clipboard watcher stopping");
                        break;
                    }
                    _ = ticker.tick() => {}
                }

                let content = match clipboard.read() {
                    Ok(content) => content,
                    Err(e) => {
                        tracing::trace!("Clipboard watcher: skipping tick: {e}");
                        continue;
                    }
                };

                if content == last_content {
                    continue;
                }

                last_content.clone_from(&content);
                let change = ClipChange::now(content);

                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    sent = tx.send(change) => {
                        if sent.is_err() {
                            tracing::debug!("Clipboard change receiver dropped");
                            break;
                        }
                    }
                }
            }
        });

        (
            rx,
            WatcherHandle {
                cancel,
                task: Some(task),
            },
        )
    }
}

impl Default for ClipboardWatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to stop the clipboard watcher.
///
/// Dropping the handle cancels the polling task without waiting for it.
pub struct WatcherHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl WatcherHandle {
    /// Stop the watcher and wait for the polling task to finish.
    ///
    /// Once this returns no poll is in flight and no further change will be
    /// sent.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Clipboard watcher task failed: {e}");
            }
        }
    }

    /// Whether the polling task is still alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::MemoryClipboard;

    const POLL: Duration = Duration::from_millis(10);

    fn start_watcher(
        clipboard: &Arc<MemoryClipboard>,
    ) -> (mpsc::Receiver<ClipChange>, WatcherHandle) {
        let accessor: Arc<dyn ClipboardAccess> = Arc::clone(clipboard) as Arc<dyn ClipboardAccess>;
        ClipboardWatcher::with_interval(POLL).start(accessor)
    }

    #[test]
    fn test_watcher_default_interval() {
        assert_eq!(ClipboardWatcher::new().poll_interval(), DEFAULT_POLL_INTERVAL);
    }

    #[tokio::test]
    async fn test_watcher_detects_change() {
        let clipboard = Arc::new(MemoryClipboard::with_content("A"));
        let (mut rx, handle) = start_watcher(&clipboard);

        clipboard.set_content("B");

        let change = tokio::time::timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("change within timeout")
            .expect("channel open");
        assert_eq!(change.content, "B");

        let more = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(more.is_err(), "no further events while content stays the same");

        handle.stop().await;
    }

    #[tokio::test]
    async fn test_initial_snapshot_not_reported() {
        let clipboard = Arc::new(MemoryClipboard::with_content("same content"));
        let (mut rx, handle) = start_watcher(&clipboard);

        let result = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(result.is_err());

        handle.stop().await;
    }

    #[tokio::test]
    async fn test_multiple_changes_in_order() {
        let clipboard = Arc::new(MemoryClipboard::with_content("start"));
        let (mut rx, handle) = start_watcher(&clipboard);

        clipboard.set_content("first");
        let first = tokio::time::timeout(Duration::from_millis(500), rx.recv())
            .await
            .unwrap()
            .unwrap();

        clipboard.set_content("second");
        let second = tokio::time::timeout(Duration::from_millis(500), rx.recv())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first.content, "first");
        assert_eq!(second.content, "second");

        handle.stop().await;
    }

    #[tokio::test]
    async fn test_read_failures_are_skipped() {
        let clipboard = Arc::new(MemoryClipboard::with_content("A"));
        let (mut rx, handle) = start_watcher(&clipboard);

        clipboard.set_fail_reads(true);
        clipboard.set_content("B");
        let during_failure = tokio::time::timeout(Duration::from_millis(60), rx.recv()).await;
        assert!(during_failure.is_err());

        clipboard.set_fail_reads(false);
        let change = tokio::time::timeout(Duration::from_millis(500), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(change.content, "B");

        handle.stop().await;
    }

    #[tokio::test]
    async fn test_stop_is_synchronous() {
        let clipboard = Arc::new(MemoryClipboard::new());
        let (mut rx, handle) = start_watcher(&clipboard);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(handle.is_running());

        handle.stop().await;

        clipboard.set_content("after stop");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.recv().await.is_none(), "channel closes once the task is joined");
    }
}
