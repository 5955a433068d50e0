//! Remote document store interface.
//!
//! Documents are JSON objects addressed by `collection/id`. Writes are
//! field-level merges: every top-level key in the write replaces the stored
//! key, other keys are left alone (last writer wins per field).
//!
//! The trait is dyn-compatible: async operations return boxed futures so the
//! store can live behind `Arc<dyn RemoteStore>`.

use std::fmt;

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::watch;

/// A remote document: a JSON object.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Collection holding the live tracking mirror.
pub const TRACKING_COLLECTION: &str = "delivery_tracking";

/// Collection holding orders (read-only here).
pub const ORDERS_COLLECTION: &str = "orders";

/// Errors from remote operations.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The store could not be reached.
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    /// A value could not be converted to or from JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A document exists but does not have the expected shape.
    #[error("Malformed document {path}: {reason}")]
    Malformed { path: String, reason: String },
}

/// Address of a remote document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    pub collection: String,
    pub id: String,
}

impl DocumentPath {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// `delivery_tracking/{order_id}`
    pub fn tracking(order_id: &str) -> Self {
        Self::new(TRACKING_COLLECTION, order_id)
    }

    /// `orders/{order_id}`
    pub fn order(order_id: &str) -> Self {
        Self::new(ORDERS_COLLECTION, order_id)
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Remote document store.
pub trait RemoteStore: Send + Sync {
    /// Merge `fields` into the document, creating it if absent.
    fn merge(&self, path: &DocumentPath, fields: Document) -> BoxFuture<'_, Result<(), RemoteError>>;

    /// Read a document.
    fn get(&self, path: &DocumentPath) -> BoxFuture<'_, Result<Option<Document>, RemoteError>>;

    /// Attach a live listener to a document.
    fn listen(&self, path: &DocumentPath) -> Result<DocumentListener, RemoteError>;
}

/// Live view of one document.
///
/// The first call to [`next`](Self::next) yields the current contents if the
/// document exists; later calls wait for the next change. Deletions are not
/// reported.
#[derive(Debug)]
pub struct DocumentListener {
    rx: watch::Receiver<Option<Document>>,
}

impl DocumentListener {
    pub fn new(mut rx: watch::Receiver<Option<Document>>) -> Self {
        rx.mark_changed();
        Self { rx }
    }

    /// Wait for the next document snapshot. `None` once the store side has
    /// gone away.
    pub async fn next(&mut self) -> Option<Document> {
        loop {
            if self.rx.changed().await.is_err() {
                return None;
            }
            let snapshot = self.rx.borrow_and_update().clone();
            if let Some(doc) = snapshot {
                return Some(doc);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_paths() {
        assert_eq!(DocumentPath::tracking("order-1").to_string(), "delivery_tracking/order-1");
        assert_eq!(DocumentPath::order("order-1").to_string(), "orders/order-1");
    }

    #[tokio::test]
    async fn test_listener_skips_empty_and_yields_current() {
        let (tx, rx) = watch::channel::<Option<Document>>(None);
        let mut listener = DocumentListener::new(rx);

        let mut doc = Document::new();
        doc.insert("status".into(), "accepted".into());
        tx.send(Some(doc.clone())).unwrap();

        assert_eq!(listener.next().await, Some(doc));

        drop(tx);
        assert_eq!(listener.next().await, None);
    }
}
