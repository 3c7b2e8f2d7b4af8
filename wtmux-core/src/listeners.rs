//! Per-session viewer subscriptions
//!
//! Each session owns one listener table mapping a caller-supplied
//! viewer id to a forwarding channel. The viewer id doubles as the
//! subscription handle: it is what callers pass back to detach, and
//! attaching again under the same id atomically replaces the previous
//! channel so a reconnecting viewer never sees duplicate delivery.

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use wtmux_protocol::SessionEvent;

/// Viewer id → forwarding channel for one session
#[derive(Debug, Default)]
pub struct ListenerTable {
    listeners: DashMap<String, mpsc::Sender<SessionEvent>>,
}

impl ListenerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a viewer's forwarding channel
    ///
    /// An existing channel under the same viewer id is removed in the
    /// same map operation, so there is no delivery window where both
    /// the old and new channel are live. Bytes already queued on the
    /// old channel are simply dropped with it. Returns `true` if a
    /// previous channel was replaced.
    pub fn attach(&self, viewer_id: impl Into<String>, sender: mpsc::Sender<SessionEvent>) -> bool {
        let viewer_id = viewer_id.into();
        let replaced = self.listeners.insert(viewer_id.clone(), sender).is_some();
        if replaced {
            debug!(viewer_id = %viewer_id, "Replaced listener on reattach");
        } else {
            debug!(viewer_id = %viewer_id, "Attached listener");
        }
        replaced
    }

    /// Remove one viewer's entry, leaving the others undisturbed
    ///
    /// Returns `true` if the viewer was subscribed.
    pub fn detach(&self, viewer_id: &str) -> bool {
        let removed = self.listeners.remove(viewer_id).is_some();
        if removed {
            debug!(viewer_id = %viewer_id, "Detached listener");
        }
        removed
    }

    /// Number of attached viewers
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Drop every subscription
    pub fn clear(&self) {
        self.listeners.clear();
    }

    /// Deliver an event to every attached viewer
    ///
    /// Non-blocking. A closed channel (viewer mid-detach or gone) is
    /// dropped silently and its entry removed; a full channel drops
    /// this event with a warning. Neither is an error to the caller.
    /// Returns the number of viewers that received the event.
    pub fn broadcast(&self, event: &SessionEvent) -> usize {
        let viewer_ids: Vec<String> = self.listeners.iter().map(|e| e.key().clone()).collect();

        let mut delivered = 0;
        for viewer_id in viewer_ids {
            let Some(sender) = self.listeners.get(&viewer_id).map(|e| e.value().clone()) else {
                continue;
            };
            match sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(viewer_id = %viewer_id, "Listener channel closed, removing");
                    self.listeners.remove(&viewer_id);
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(viewer_id = %viewer_id, "Listener channel full, event dropped");
                }
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn output(data: &[u8]) -> SessionEvent {
        SessionEvent::Output {
            process_id: Uuid::nil(),
            data: data.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_attach_and_broadcast() {
        let table = ListenerTable::new();
        let (tx1, mut rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel(8);

        assert!(!table.attach("v1", tx1));
        assert!(!table.attach("v2", tx2));
        assert_eq!(table.len(), 2);

        let delivered = table.broadcast(&output(b"hi\n"));
        assert_eq!(delivered, 2);
        assert_eq!(rx1.recv().await.unwrap(), output(b"hi\n"));
        assert_eq!(rx2.recv().await.unwrap(), output(b"hi\n"));
    }

    #[tokio::test]
    async fn test_reattach_replaces_old_channel() {
        let table = ListenerTable::new();
        let (old_tx, mut old_rx) = mpsc::channel(8);
        table.attach("v1", old_tx);

        table.broadcast(&output(b"before\n"));

        let (new_tx, mut new_rx) = mpsc::channel(8);
        assert!(table.attach("v1", new_tx));
        assert_eq!(table.len(), 1);

        table.broadcast(&output(b"after\n"));

        // New channel sees only post-swap events
        assert_eq!(new_rx.recv().await.unwrap(), output(b"after\n"));

        // Old channel got the pre-swap event, then closed; never the new one
        assert_eq!(old_rx.recv().await.unwrap(), output(b"before\n"));
        assert!(old_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_detach_leaves_others() {
        let table = ListenerTable::new();
        let (tx1, _rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel(8);
        table.attach("v1", tx1);
        table.attach("v2", tx2);

        assert!(table.detach("v1"));
        assert!(!table.detach("v1"));
        assert_eq!(table.len(), 1);

        assert_eq!(table.broadcast(&output(b"x")), 1);
        assert_eq!(rx2.recv().await.unwrap(), output(b"x"));
    }

    #[tokio::test]
    async fn test_closed_channel_dropped_silently() {
        let table = ListenerTable::new();
        let (tx, rx) = mpsc::channel(8);
        table.attach("v1", tx);
        drop(rx);

        assert_eq!(table.broadcast(&output(b"x")), 0);
        assert_eq!(table.len(), 0);
    }

    #[tokio::test]
    async fn test_full_channel_drops_event() {
        let table = ListenerTable::new();
        let (tx, mut rx) = mpsc::channel(1);
        table.attach("v1", tx);

        assert_eq!(table.broadcast(&output(b"first")), 1);
        assert_eq!(table.broadcast(&output(b"second")), 0);

        // Viewer stays subscribed; only the event was dropped
        assert_eq!(table.len(), 1);
        assert_eq!(rx.recv().await.unwrap(), output(b"first"));
    }
}
