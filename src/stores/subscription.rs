//! A cancellable handle to a live query.

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::{Error, stores::Document};

/// One delivery from a live query: either the full result set or an error.
pub type Snapshot = Result<Vec<Document>, Error>;

/// The sending half of a subscription, held by the store.
pub type SnapshotSender = UnboundedSender<Snapshot>;

type CloseHook = Box<dyn FnOnce() + Send + Sync>;

/// Receives the snapshots of a live query until it is closed.
///
/// Closing (or dropping) the subscription deregisters it from the store
/// before returning, so no snapshot can arrive for it afterwards.
pub struct Subscription {
    receiver: UnboundedReceiver<Snapshot>,
    on_close: Option<CloseHook>,
}

impl Subscription {
    /// Create a subscription from a receiver and a hook that deregisters the
    /// matching sender from the store.
    pub fn new(
        receiver: UnboundedReceiver<Snapshot>,
        on_close: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        Self {
            receiver,
            on_close: Some(Box::new(on_close)),
        }
    }

    /// Create a connected sender/subscription pair.
    pub fn channel(on_close: impl FnOnce() + Send + Sync + 'static) -> (SnapshotSender, Self) {
        let (sender, receiver) = unbounded_channel();
        (sender, Self::new(receiver, on_close))
    }

    /// Wait for the next snapshot.
    ///
    /// Returns `None` once the store has dropped its end of the subscription.
    /// This method is cancel safe.
    pub async fn next(&mut self) -> Option<Snapshot> {
        self.receiver.recv().await
    }

    /// Get the next snapshot if one has already been delivered.
    pub fn try_next(&mut self) -> Option<Snapshot> {
        self.receiver.try_recv().ok()
    }

    /// Close the subscription, discarding any undelivered snapshots.
    pub fn close(mut self) {
        self.shut_down();
    }

    fn shut_down(&mut self) {
        self.receiver.close();
        if let Some(on_close) = self.on_close.take() {
            on_close();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.shut_down();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.on_close.is_none())
            .finish()
    }
}
