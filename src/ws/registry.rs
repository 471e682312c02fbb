use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use super::events::BroadcastEvent;

/// Capacity of each peer's outbound mailbox. When a peer stops draining,
/// further events for it are dropped (drop-newest) rather than delaying the
/// broadcast to everyone else.
pub const MAILBOX_CAPACITY: usize = 32;

pub type Mailbox = mpsc::Sender<Arc<BroadcastEvent>>;

/// Thread-safe set of active peer connections.
///
/// The registry holds only each peer's mailbox sender; the connection
/// itself is owned by its read/write loops, which register on upgrade and
/// unregister on teardown. Broadcast never removes a peer — a closed or
/// full mailbox is the owning loops' problem.
pub struct PeerRegistry {
    peers: RwLock<HashMap<Uuid, Mailbox>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
        }
    }

    pub async fn register(&self, id: Uuid, mailbox: Mailbox) {
        debug!(peer = %id, "registering peer");
        self.peers.write().await.insert(id, mailbox);
    }

    /// Safe to call for an already-removed peer.
    pub async fn unregister(&self, id: &Uuid) {
        debug!(peer = %id, "unregistering peer");
        self.peers.write().await.remove(id);
    }

    /// Fan an event out to every registered peer's mailbox.
    ///
    /// Enqueueing is non-blocking per peer, so one stalled or dead peer
    /// never delays delivery to the rest. Returns the number of mailboxes
    /// the event reached.
    pub async fn broadcast(&self, event: BroadcastEvent) -> usize {
        let event = Arc::new(event);
        let peers = self.peers.read().await;
        let mut delivered = 0;
        for (id, mailbox) in peers.iter() {
            match mailbox.try_send(Arc::clone(&event)) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(peer = %id, "peer mailbox full, dropping event");
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(peer = %id, "peer mailbox closed, skipping");
                }
            }
        }
        debug!(recipients = delivered, "broadcast event");
        delivered
    }

    pub async fn peer_count(&self) -> usize {
        self.peers.read().await.len()
    }
}

impl Default for PeerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn mailbox(capacity: usize) -> (Mailbox, mpsc::Receiver<Arc<BroadcastEvent>>) {
        mpsc::channel(capacity)
    }

    #[tokio::test]
    async fn broadcast_reaches_every_registered_peer() {
        let registry = PeerRegistry::new();
        let (tx_a, mut rx_a) = mailbox(MAILBOX_CAPACITY);
        let (tx_b, mut rx_b) = mailbox(MAILBOX_CAPACITY);
        registry.register(Uuid::new_v4(), tx_a).await;
        registry.register(Uuid::new_v4(), tx_b).await;

        let delivered = registry.broadcast(BroadcastEvent::level_update(3)).await;
        assert_eq!(delivered, 2);
        assert_eq!(*rx_a.recv().await.unwrap(), BroadcastEvent::level_update(3));
        assert_eq!(*rx_b.recv().await.unwrap(), BroadcastEvent::level_update(3));
        assert!(rx_a.try_recv().is_err()); // exactly one enqueue per peer
    }

    #[tokio::test]
    async fn unregistered_peer_is_excluded() {
        let registry = PeerRegistry::new();
        let gone = Uuid::new_v4();
        let (tx_gone, mut rx_gone) = mailbox(MAILBOX_CAPACITY);
        let (tx_live, mut rx_live) = mailbox(MAILBOX_CAPACITY);
        registry.register(gone, tx_gone).await;
        registry.register(Uuid::new_v4(), tx_live).await;

        registry.unregister(&gone).await;
        let delivered = registry.broadcast(BroadcastEvent::level_update(1)).await;

        assert_eq!(delivered, 1);
        assert!(rx_live.recv().await.is_some());
        assert!(rx_gone.try_recv().is_err());
        assert_eq!(registry.peer_count().await, 1);
    }

    #[tokio::test]
    async fn unregistering_twice_is_a_noop() {
        let registry = PeerRegistry::new();
        let id = Uuid::new_v4();
        let (tx, _rx) = mailbox(MAILBOX_CAPACITY);
        registry.register(id, tx).await;
        registry.unregister(&id).await;
        registry.unregister(&id).await;
        assert_eq!(registry.peer_count().await, 0);
    }

    #[tokio::test]
    async fn stalled_peer_does_not_block_the_broadcast() {
        let registry = PeerRegistry::new();
        // A stalled peer: mailbox of one, never drained.
        let (tx_stalled, _rx_stalled) = mailbox(1);
        let (tx_live, mut rx_live) = mailbox(MAILBOX_CAPACITY);
        registry.register(Uuid::new_v4(), tx_stalled).await;
        registry.register(Uuid::new_v4(), tx_live).await;

        // First broadcast fills the stalled mailbox.
        registry.broadcast(BroadcastEvent::level_update(1)).await;

        // Second broadcast must complete in bounded time and still reach
        // the live peer, dropping the event for the stalled one.
        let delivered = tokio::time::timeout(
            Duration::from_millis(100),
            registry.broadcast(BroadcastEvent::level_update(2)),
        )
        .await
        .expect("broadcast must not block on a full mailbox");

        assert_eq!(delivered, 1);
        assert_eq!(*rx_live.recv().await.unwrap(), BroadcastEvent::level_update(1));
        assert_eq!(*rx_live.recv().await.unwrap(), BroadcastEvent::level_update(2));
    }

    #[tokio::test]
    async fn closed_mailbox_is_skipped() {
        let registry = PeerRegistry::new();
        let (tx_dead, rx_dead) = mailbox(MAILBOX_CAPACITY);
        let (tx_live, mut rx_live) = mailbox(MAILBOX_CAPACITY);
        registry.register(Uuid::new_v4(), tx_dead).await;
        registry.register(Uuid::new_v4(), tx_live).await;
        drop(rx_dead);

        let delivered = registry.broadcast(BroadcastEvent::level_update(4)).await;
        assert_eq!(delivered, 1);
        assert!(rx_live.recv().await.is_some());
    }
}
