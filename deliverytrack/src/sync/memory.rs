//! In-memory remote document store.
//!
//! Backed by a `DashMap` of `watch` channels, one per document, so listeners
//! see every merge without polling. An availability switch lets tests and
//! the simulator cut the "network" and watch the tracking session carry on.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio::sync::watch;

use super::store::{Document, DocumentListener, DocumentPath, RemoteError, RemoteStore};

/// Process-local document store.
#[derive(Debug)]
pub struct InMemoryRemoteStore {
    documents: DashMap<String, watch::Sender<Option<Document>>>,
    available: AtomicBool,
    writes: AtomicU64,
}

impl Default for InMemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
            available: AtomicBool::new(true),
            writes: AtomicU64::new(0),
        }
    }

    /// Simulate losing (or regaining) the connection.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Successful merges since creation.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Merge fields synchronously, ignoring availability.
    ///
    /// This is the "other side" of the store: order services writing order
    /// status, or test setup seeding documents.
    pub fn apply_merge(&self, path: &DocumentPath, fields: Document) {
        let entry = self
            .documents
            .entry(path.to_string())
            .or_insert_with(|| watch::channel(None).0);
        entry.send_modify(|doc| {
            let doc = doc.get_or_insert_with(Document::new);
            for (key, value) in fields {
                doc.insert(key, value);
            }
        });
    }

    /// Current contents of a document, ignoring availability.
    pub fn document(&self, path: &DocumentPath) -> Option<Document> {
        let sender = self.documents.get(&path.to_string())?;
        let snapshot = sender.borrow().clone();
        snapshot
    }

    fn check_available(&self) -> Result<(), RemoteError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(RemoteError::Unavailable("remote store offline".to_string()))
        }
    }
}

impl RemoteStore for InMemoryRemoteStore {
    fn merge(&self, path: &DocumentPath, fields: Document) -> BoxFuture<'_, Result<(), RemoteError>> {
        let path = path.clone();
        Box::pin(async move {
            self.check_available()?;
            self.apply_merge(&path, fields);
            self.writes.fetch_add(1, Ordering::Relaxed);
            Ok(())
        })
    }

    fn get(&self, path: &DocumentPath) -> BoxFuture<'_, Result<Option<Document>, RemoteError>> {
        let path = path.clone();
        Box::pin(async move {
            self.check_available()?;
            Ok(self.document(&path))
        })
    }

    fn listen(&self, path: &DocumentPath) -> Result<DocumentListener, RemoteError> {
        self.check_available()?;
        let entry = self
            .documents
            .entry(path.to_string())
            .or_insert_with(|| watch::channel(None).0);
        Ok(DocumentListener::new(entry.subscribe()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_merge_is_field_level() {
        let store = InMemoryRemoteStore::new();
        let path = DocumentPath::tracking("order-1");

        store
            .merge(&path, fields(json!({"status": "accepted", "distanceRemaining": 1.0})))
            .await
            .unwrap();
        store
            .merge(&path, fields(json!({"distanceRemaining": 0.5})))
            .await
            .unwrap();

        let doc = store.get(&path).await.unwrap().unwrap();
        assert_eq!(doc["status"], "accepted");
        assert_eq!(doc["distanceRemaining"], 0.5);
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails() {
        let store = InMemoryRemoteStore::new();
        let path = DocumentPath::order("order-1");
        store.set_available(false);

        assert!(matches!(
            store.merge(&path, Document::new()).await,
            Err(RemoteError::Unavailable(_))
        ));
        assert!(store.get(&path).await.is_err());
        assert!(store.listen(&path).is_err());

        store.set_available(true);
        assert!(store.get(&path).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_listener_sees_later_writes() {
        let store = InMemoryRemoteStore::new();
        let path = DocumentPath::order("order-1");
        let mut listener = store.listen(&path).unwrap();

        store.apply_merge(&path, fields(json!({"status": "accepted"})));
        assert_eq!(listener.next().await.unwrap()["status"], "accepted");

        store.apply_merge(&path, fields(json!({"status": "picked_up"})));
        assert_eq!(listener.next().await.unwrap()["status"], "picked_up");
    }

    #[tokio::test]
    async fn test_listener_yields_existing_document_first() {
        let store = InMemoryRemoteStore::new();
        let path = DocumentPath::order("order-1");
        store.apply_merge(&path, fields(json!({"status": "accepted"})));

        let mut listener = store.listen(&path).unwrap();
        assert_eq!(listener.next().await.unwrap()["status"], "accepted");
    }
}
