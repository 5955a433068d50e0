//! Typed bridge between tracking state and the remote document store.
//!
//! Outbound, sessions are merge-written to `delivery_tracking/{orderId}`:
//! the full session on the periodic sync and a reduced position write after
//! every sample. Inbound, the bridge listens to `orders/{orderId}` and
//! yields status changes.
//!
//! Every operation returns `Result<_, RemoteError>`; deciding to swallow a
//! failure is left to [`super::policy`].

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::store::{Document, DocumentListener, DocumentPath, RemoteError, RemoteStore};
use crate::tracking::{Order, OrderStatus, PositionUpdate, TrackingSession};

/// Remote sync operations for tracking.
#[derive(Clone)]
pub struct RemoteSyncBridge {
    store: Arc<dyn RemoteStore>,
}

impl RemoteSyncBridge {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// Merge the full session into its mirror document.
    pub async fn push_session(&self, session: &TrackingSession) -> Result<(), RemoteError> {
        let path = DocumentPath::tracking(&session.order_id);
        let fields = to_document(&path, session)?;
        self.store.merge(&path, fields).await?;
        tracing::debug!(order_id = %session.order_id, "Pushed tracking session");
        Ok(())
    }

    /// Merge the per-sample position fields into the mirror document.
    pub async fn push_position(&self, update: &PositionUpdate) -> Result<(), RemoteError> {
        let path = DocumentPath::tracking(&update.order_id);
        let fields = to_document(&path, update)?;
        self.store.merge(&path, fields).await
    }

    /// Read the mirrored session.
    pub async fn fetch_session(&self, order_id: &str) -> Result<Option<TrackingSession>, RemoteError> {
        let path = DocumentPath::tracking(order_id);
        match self.store.get(&path).await? {
            Some(doc) => from_document(&path, doc).map(Some),
            None => Ok(None),
        }
    }

    /// Read the order document.
    pub async fn fetch_order(&self, order_id: &str) -> Result<Option<Order>, RemoteError> {
        let path = DocumentPath::order(order_id);
        match self.store.get(&path).await? {
            Some(doc) => from_document(&path, doc).map(Some),
            None => Ok(None),
        }
    }

    /// Listen for status changes on the order document.
    pub fn subscribe_status(&self, order_id: &str) -> Result<StatusSubscription, RemoteError> {
        let path = DocumentPath::order(order_id);
        let listener = self.store.listen(&path)?;
        Ok(StatusSubscription {
            path,
            listener,
            last: None,
        })
    }

    /// Listen for changes to the mirrored session.
    pub fn subscribe_session(&self, order_id: &str) -> Result<SessionSubscription, RemoteError> {
        let path = DocumentPath::tracking(order_id);
        let listener = self.store.listen(&path)?;
        Ok(SessionSubscription { path, listener })
    }
}

/// Live order status, deduplicated.
pub struct StatusSubscription {
    path: DocumentPath,
    listener: DocumentListener,
    last: Option<OrderStatus>,
}

impl StatusSubscription {
    /// Wait for the next status that differs from the previous one.
    ///
    /// Documents without a readable `status` are skipped. Returns `None`
    /// when the listener closes.
    pub async fn next(&mut self) -> Option<OrderStatus> {
        loop {
            let doc = self.listener.next().await?;
            let status = match read_status(&doc) {
                Ok(status) => status,
                Err(reason) => {
                    tracing::warn!(path = %self.path, reason = %reason, "Skipping unreadable order status");
                    continue;
                }
            };
            if self.last == Some(status) {
                continue;
            }
            self.last = Some(status);
            return Some(status);
        }
    }
}

/// Live mirrored session.
pub struct SessionSubscription {
    path: DocumentPath,
    listener: DocumentListener,
}

impl SessionSubscription {
    /// Wait for the next snapshot that parses as a full session.
    pub async fn next(&mut self) -> Option<TrackingSession> {
        loop {
            let doc = self.listener.next().await?;
            match from_document(&self.path, doc) {
                Ok(session) => return Some(session),
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping incomplete tracking document");
                }
            }
        }
    }
}

fn read_status(doc: &Document) -> Result<OrderStatus, String> {
    let value = doc.get("status").ok_or_else(|| "missing status".to_string())?;
    serde_json::from_value(value.clone()).map_err(|e| e.to_string())
}

fn to_document<T: Serialize>(path: &DocumentPath, value: &T) -> Result<Document, RemoteError> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(RemoteError::Malformed {
            path: path.to_string(),
            reason: "value is not a JSON object".to_string(),
        }),
    }
}

fn from_document<T: DeserializeOwned>(path: &DocumentPath, doc: Document) -> Result<T, RemoteError> {
    serde_json::from_value(serde_json::Value::Object(doc)).map_err(|e| RemoteError::Malformed {
        path: path.to_string(),
        reason: e.to_string(),
    })
}
