//! Read-only live view of a delivery for the customer.

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::session::TrackingSession;
use crate::sync::{RemoteError, RemoteSyncBridge};

struct Subscription {
    order_id: String,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Follows `delivery_tracking/{orderId}` and hands every parsable snapshot
/// to a callback. At most one subscription is live; subscribing again
/// replaces it.
pub struct CustomerTrackingSubscriber {
    bridge: RemoteSyncBridge,
    current: Mutex<Option<Subscription>>,
}

impl CustomerTrackingSubscriber {
    pub fn new(bridge: RemoteSyncBridge) -> Self {
        Self {
            bridge,
            current: Mutex::new(None),
        }
    }

    /// Start following `order_id`.
    ///
    /// The callback runs on the subscription task, once per change. Outside
    /// a tokio runtime this fails with [`RemoteError::Unavailable`].
    pub fn subscribe<F>(&self, order_id: &str, mut on_update: F) -> Result<(), RemoteError>
    where
        F: FnMut(TrackingSession) + Send + 'static,
    {
        let runtime = Handle::try_current()
            .map_err(|e| RemoteError::Unavailable(format!("no tokio runtime: {}", e)))?;
        let mut subscription = self.bridge.subscribe_session(order_id)?;
        self.unsubscribe();

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = runtime.spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    session = subscription.next() => match session {
                        Some(session) => on_update(session),
                        None => break,
                    },
                }
            }
        });

        tracing::debug!(order_id, "Customer tracking subscribed");
        *self.current.lock() = Some(Subscription {
            order_id: order_id.to_string(),
            cancel,
            task,
        });
        Ok(())
    }

    /// Stop following. Idempotent.
    pub fn unsubscribe(&self) {
        if let Some(subscription) = self.current.lock().take() {
            subscription.cancel.cancel();
            tracing::debug!(order_id = %subscription.order_id, "Customer tracking unsubscribed");
        }
    }

    pub fn is_active(&self) -> bool {
        self.current
            .lock()
            .as_ref()
            .is_some_and(|s| !s.task.is_finished())
    }

    /// The order being followed.
    pub fn order_id(&self) -> Option<String> {
        self.current.lock().as_ref().map(|s| s.order_id.clone())
    }
}

impl Drop for CustomerTrackingSubscriber {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
